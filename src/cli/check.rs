//! Validate a wire-format expression

use super::CliError;
use crate::ast::{ExprKind, TypeName};
use crate::serializer::Serializer;

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Wire-format expression
    pub input: Option<String>,
}

/// What a successfully decoded expression looks like
#[derive(Debug)]
pub struct CheckReport {
    /// `None` when the input was `null`
    pub kind: Option<ExprKind>,
    pub value_type: Option<TypeName>,
    /// The expression re-encoded after a deep copy
    pub canonical: serde_json::Value,
    /// The deep copy equals the decoded expression
    pub stable: bool,
}

pub fn execute_check(options: &CheckOptions) -> Result<CheckReport, CliError> {
    let text = options.input.as_ref().ok_or(CliError::NoInput)?;
    let serializer = Serializer::default();
    let expr = serializer.parse_str(text)?;

    let Some(expr) = expr else {
        return Ok(CheckReport {
            kind: None,
            value_type: None,
            canonical: serde_json::Value::Null,
            stable: true,
        });
    };

    let copy = serializer.copy_expr(&expr)?;
    Ok(CheckReport {
        kind: Some(expr.kind()),
        value_type: expr.value_type(),
        canonical: serializer.to_json(&copy),
        stable: copy == expr,
    })
}
