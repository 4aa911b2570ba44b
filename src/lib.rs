pub mod ast;
pub mod builder;
pub mod code;
pub mod fields;
pub mod query;
pub mod registry;
pub mod serializer;
pub mod sorted_list;
pub mod tree;
pub mod value;
pub mod visitor;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{
    ChooseOperation, Connector, CriteriaGroup, Criterion, Expr, ExprKind, IfOperation,
    NestedField, OpId, Operation, Parameter, TypeName,
};
pub use builder::{BuilderConfig, CodeBuilder, DefaultExpr, OperationConfig};
pub use code::{CodeOptions, CodeVisitor};
pub use query::QueryVisitor;
pub use registry::Registry;
pub use serializer::{SerializeError, Serializer, copy_expr, from_json, to_json};
pub use value::Value;
pub use visitor::{Visitor, dispatch};
