//! # Expression Tree
//!
//! This module defines the typed expression tree edited by a visual query
//! builder and consumed by the compilers in [`crate::code`] and
//! [`crate::query`].
//!
//! ## Architecture Overview
//!
//! - **[types]** - `TypeName` bitmask used for type inference and matching
//! - **[operators]** - Criterion operators and group connectors
//! - **[expressions]** - The `Expr` sum type and its node structs
//!
//! ## Node Variants
//!
//! | Variant | Meaning |
//! |---|---|
//! | `Empty` | no expression set |
//! | `CriteriaGroup` | `and`/`or` over child conditions, optionally negated |
//! | `Criterion` | `left <op> right` |
//! | `NestedField` | dotted schema path |
//! | `Parameter` | literal scalar or array |
//! | `Operation` | named call over positional operands |
//! | `If` / `Choose` | branching operations sharing the `Operation` tag |
//!
//! ## Example
//!
//! ```
//! use codebuilder::{Connector, CriteriaGroup, Criterion, NestedField, OpId, Parameter, TypeName};
//!
//! let status = NestedField::new(["status"], TypeName::STRING);
//! let group = CriteriaGroup::new(Connector::And)
//!     .with(Criterion::new(status, OpId::Eq, Parameter::literal("open")));
//!
//! assert_eq!(group.criteria.len(), 1);
//! ```
pub mod expressions;
pub mod operators;
pub mod types;

pub use expressions::{
    ChooseOperation, CriteriaGroup, Criterion, Expr, ExprKind, IfOperation, NestedField,
    Operation, Parameter,
};
pub use operators::{Connector, OpId};
pub use types::TypeName;
