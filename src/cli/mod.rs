//! CLI support for codebuilder
//!
//! Each subcommand is an options struct plus an `execute_*` function, so
//! the commands can also be driven from other tools without going through
//! argument parsing.

mod check;
mod compile;
mod fields;

pub use check::{CheckOptions, CheckReport, execute_check};
pub use compile::{CompileOptions, CompileOutput, Target, execute_compile};
pub use fields::{FieldsOptions, execute_fields};

use std::io;

use thiserror::Error;

use crate::serializer::SerializeError;

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid expression: {0}")]
    Serialize(#[from] SerializeError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid filter pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("No input provided. Use --input or pipe JSON to stdin.")]
    NoInput,
}
