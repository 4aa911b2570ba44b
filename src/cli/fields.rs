//! Infer a field schema from sample documents

use regex::Regex;

use super::CliError;
use crate::builder::{BuilderConfig, CodeBuilder};
use crate::fields::{FieldTreeNode, infer_fields};
use crate::tree::Tree;

/// Options for the fields command
#[derive(Debug, Clone, Default)]
pub struct FieldsOptions {
    /// Sample JSON: one document or an array of them
    pub input: Option<String>,
    /// Dotted path to re-root the listing under
    pub scope: Option<String>,
    /// Keep fields whose full name matches, plus their parents
    pub filter: Option<String>,
}

/// Returns the field tree as indented `name: type` lines.
pub fn execute_fields(options: &FieldsOptions) -> Result<Vec<String>, CliError> {
    let text = options.input.as_ref().ok_or(CliError::NoInput)?;
    let sample: serde_json::Value = serde_json::from_str(text)?;
    let filter = options.filter.as_deref().map(Regex::new).transpose()?;

    let builder = CodeBuilder::new(BuilderConfig::new(infer_fields(&sample)));
    let roots: Vec<FieldTreeNode> = match &options.scope {
        Some(scope) => builder.scoped_fields(&scope.split('.').collect::<Vec<_>>()),
        None => builder.fields().to_vec(),
    };

    let tree = Tree::build(roots, |node: &FieldTreeNode| Some(node.children.clone()));
    let mut query = tree.query();
    if let Some(pattern) = filter {
        query = query.has_descendant(move |node: &FieldTreeNode| pattern.is_match(&node.full_name), false);
    }

    Ok(query
        .iter()
        .filter_map(|node| {
            let field = node.item()?;
            Some(format!("{}{}: {}", "  ".repeat(node.depth), field.name, field.type_name))
        })
        .collect())
}
