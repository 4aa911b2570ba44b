//! Compile a wire-format expression to a target representation

use super::CliError;
use crate::builder::OperationConfig;
use crate::code::{CodeOptions, CodeVisitor};
use crate::query::QueryVisitor;
use crate::serializer::Serializer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Target {
    /// C# statement block
    Code,
    /// Search query document
    Query,
}

/// Options for the compile command
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub target: Target,
    /// Wire-format expression
    pub input: Option<String>,
    /// Operation catalog (JSON array) naming extra callable operations
    pub operations: Option<String>,
    /// Namespace for qualified calls in generated code
    pub namespace: Option<String>,
}

#[derive(Debug)]
pub enum CompileOutput {
    Code(String),
    Query(serde_json::Value),
}

pub fn execute_compile(options: &CompileOptions) -> Result<CompileOutput, CliError> {
    let text = options.input.as_ref().ok_or(CliError::NoInput)?;
    let expr = Serializer::default().parse_str(text)?;

    match options.target {
        Target::Code => {
            let mut code_options = CodeOptions::default();
            if let Some(namespace) = &options.namespace {
                code_options.utils_namespace = namespace.clone();
            }
            if let Some(catalog) = &options.operations {
                let operations: Vec<OperationConfig> = serde_json::from_str(catalog)?;
                code_options = code_options.with_operations(&operations);
            }
            let code = CodeVisitor::new(code_options).compile(expr.as_ref());
            Ok(CompileOutput::Code(code))
        }
        Target::Query => Ok(CompileOutput::Query(
            QueryVisitor::new().compile(expr.as_ref()),
        )),
    }
}
