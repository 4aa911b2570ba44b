//! Field schema helpers.
//!
//! Fields arrive as a flat list of dotted paths. [`create_sorted_field_tree`]
//! threads them into a forest where each field sits under the nearest
//! preceding field whose name is a dotted prefix of its own, and
//! [`infer_fields`] derives such a list from sample JSON documents.

use std::slice;

use serde_json::Value as Json;

use crate::ast::{NestedField, TypeName};
use crate::sorted_list::SortedList;

/// Node of the sorted field forest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldTreeNode {
    pub field: NestedField,
    pub full_name: String,
    pub name: String,
    pub type_name: TypeName,
    pub children: Vec<FieldTreeNode>,
}

impl FieldTreeNode {
    pub fn new(field: NestedField) -> Self {
        FieldTreeNode {
            full_name: field.full_name(),
            name: field.name().to_string(),
            type_name: field.type_name,
            field,
            children: Vec::new(),
        }
    }

    /// True when `other` lies strictly below this node.
    pub fn is_parent_of(&self, other: &FieldTreeNode) -> bool {
        other
            .full_name
            .strip_prefix(&self.full_name)
            .is_some_and(|rest| rest.starts_with('.'))
    }

    /// This node and its descendants, depth-first.
    pub fn flatten(&self) -> Vec<&FieldTreeNode> {
        let mut result = vec![self];
        for child in &self.children {
            result.extend(child.flatten());
        }
        result
    }
}

/// Sorts `fields` by full name and nests each one under its dotted prefix.
///
/// Names compare segment by segment, so a field always sorts directly
/// after its dotted prefix even when a sibling such as `a-c` would fall
/// between `a` and `a.b` in plain text order.
///
/// # Examples
///
/// ```
/// use codebuilder::fields::create_sorted_field_tree;
/// use codebuilder::{NestedField, TypeName};
///
/// let fields = vec![
///     NestedField::new(["orders", "amount"], TypeName::NUMBER),
///     NestedField::new(["name"], TypeName::STRING),
///     NestedField::new(["orders"], TypeName::ARRAY),
/// ];
/// let tree = create_sorted_field_tree(&fields);
///
/// assert_eq!(tree.len(), 2);
/// assert_eq!(tree[1].full_name, "orders");
/// assert_eq!(tree[1].children[0].name, "amount");
/// ```
pub fn create_sorted_field_tree(fields: &[NestedField]) -> Vec<FieldTreeNode> {
    let mut sorted: Vec<FieldTreeNode> = fields.iter().cloned().map(FieldTreeNode::new).collect();
    sorted.sort_by(|a, b| {
        a.field
            .path
            .cmp(&b.field.path)
            .then(a.type_name.bits().cmp(&b.type_name.bits()))
            .then(a.field.scoped.cmp(&b.field.scoped))
    });

    let mut roots = Vec::new();
    // open ancestor chain of the most recent node, outermost first
    let mut chain: Vec<FieldTreeNode> = Vec::new();

    for node in sorted {
        while chain.last().is_some_and(|open| !open.is_parent_of(&node)) {
            close_last(&mut chain, &mut roots);
        }
        chain.push(node);
    }
    while !chain.is_empty() {
        close_last(&mut chain, &mut roots);
    }

    roots
}

fn close_last(chain: &mut Vec<FieldTreeNode>, roots: &mut Vec<FieldTreeNode>) {
    if let Some(done) = chain.pop() {
        match chain.last_mut() {
            Some(parent) => parent.children.push(done),
            None => roots.push(done),
        }
    }
}

/// Type a sample value suggests for its field.
///
/// Arrays take the type of their first non-null element, except that an
/// array of objects is an `ARRAY` field; empty arrays say nothing (`NULL`).
pub fn type_of_value(value: &Json) -> TypeName {
    match value {
        Json::Number(_) => TypeName::NUMBER,
        Json::Bool(_) => TypeName::BOOLEAN,
        Json::String(_) => TypeName::STRING,
        Json::Object(_) => TypeName::OBJECT,
        Json::Null => TypeName::NULL,
        Json::Array(items) => match items.iter().find(|item| !item.is_null()) {
            Some(first) => match type_of_value(first) {
                TypeName::OBJECT => TypeName::ARRAY,
                item_type => item_type,
            },
            None => TypeName::NULL,
        },
    }
}

/// Infers the field list of `sample`: one document, or an array of them.
///
/// Every key path found becomes a field; a path seen more than once merges
/// its observed types.
///
/// # Examples
///
/// ```
/// use codebuilder::fields::infer_fields;
/// use codebuilder::TypeName;
/// use serde_json::json;
///
/// let fields = infer_fields(&json!([
///     { "name": "a", "tags": ["x"], "orders": [{ "amount": 1 }] },
///     { "name": null }
/// ]));
/// let names: Vec<_> = fields.iter().map(|f| f.full_name()).collect();
///
/// assert_eq!(names, vec!["name", "orders", "orders.amount", "tags"]);
/// assert_eq!(fields[1].type_name, TypeName::ARRAY);
/// assert_eq!(fields[3].type_name, TypeName::STRING);
/// ```
pub fn infer_fields(sample: &Json) -> Vec<NestedField> {
    let mut fields = SortedList::new(|a: &NestedField, b: &NestedField| a.full_name().cmp(&b.full_name()));
    let documents = match sample {
        Json::Array(items) => items.as_slice(),
        other => slice::from_ref(other),
    };
    collect_fields(documents, &[], &mut fields);
    tracing::debug!(count = fields.len(), "inferred fields from sample");
    fields.into_vec()
}

fn collect_fields(items: &[Json], path: &[String], fields: &mut SortedList<NestedField>) {
    for item in items {
        match item {
            Json::Array(nested) => collect_fields(nested, path, fields),
            Json::Object(map) => {
                for (key, value) in map {
                    let mut current = path.to_vec();
                    current.push(key.clone());
                    let observed = type_of_value(value);
                    record_field(NestedField::new(current.clone(), observed), fields);

                    if observed == TypeName::OBJECT || observed == TypeName::ARRAY {
                        let children = match value {
                            Json::Array(values) => values.as_slice(),
                            other => slice::from_ref(other),
                        };
                        collect_fields(children, &current, fields);
                    }
                }
            }
            _ => {}
        }
    }
}

fn record_field(field: NestedField, fields: &mut SortedList<NestedField>) {
    let position = fields.find(&field);
    if !position.found {
        fields.add(field);
        return;
    }
    if let Some(existing) = fields.get_mut(position.index) {
        let merged = field.type_name.merge(existing.type_name);
        if merged != existing.type_name {
            tracing::debug!(
                field = %field.full_name(),
                from = %existing.type_name,
                to = %merged,
                "merged field type"
            );
        }
        existing.type_name = merged;
    }
}
