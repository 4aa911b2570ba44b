//! Search-engine query document generation.
//!
//! Groups become `bool` clauses, comparisons become `range`, equality and
//! membership become `terms`, null checks become `exists` and `Like`
//! becomes `wildcard`. Anything that cannot be mapped is replaced by the
//! `"[Invalid]"` string so a half-built rule still produces a document.

use serde_json::{Value as Json, json};

use crate::ast::{Connector, CriteriaGroup, Criterion, Expr, NestedField, OpId, Operation, Parameter};
use crate::code::INVALID;
use crate::visitor::Visitor;

#[derive(Debug, Default, Clone, Copy)]
pub struct QueryVisitor;

impl QueryVisitor {
    pub fn new() -> Self {
        QueryVisitor
    }

    /// Wraps the compiled tree as `{ "query": ... }`.
    #[tracing::instrument(skip_all)]
    pub fn compile(&mut self, root: Option<&Expr>) -> Json {
        json!({ "query": self.visit(root) })
    }

    fn invalid() -> Json {
        Json::String(INVALID.to_string())
    }

    fn field_or_invalid(&mut self, expr: Option<&Expr>) -> Json {
        match expr {
            Some(Expr::NestedField(field)) => self.visit_nested_field(field),
            _ => Self::invalid(),
        }
    }

    fn parameter_or_invalid(&mut self, expr: Option<&Expr>) -> Json {
        match expr {
            Some(Expr::Parameter(param)) => self.visit_parameter(param),
            _ => Self::invalid(),
        }
    }

    fn parameter_as_array(&mut self, expr: Option<&Expr>) -> Json {
        match self.parameter_or_invalid(expr) {
            array @ Json::Array(_) => array,
            scalar => Json::Array(vec![scalar]),
        }
    }

    fn string_or_invalid(&mut self, expr: Option<&Expr>) -> Json {
        match self.parameter_or_invalid(expr) {
            text @ Json::String(_) => text,
            _ => Self::invalid(),
        }
    }

    /// `{ name: value }` where the key came from compiling a field.
    fn keyed(key: Json, value: Json) -> Json {
        let key = match key {
            Json::String(key) => key,
            other => other.to_string(),
        };
        let mut object = serde_json::Map::new();
        object.insert(key, value);
        Json::Object(object)
    }

    fn must_not(clause: Json) -> Json {
        json!({ "bool": { "must_not": clause } })
    }
}

impl<'a> Visitor<'a> for QueryVisitor {
    type Output = Json;

    fn visit_empty(&mut self) -> Json {
        json!({})
    }

    fn visit_criteria_group(&mut self, group: &'a CriteriaGroup) -> Json {
        let criteria: Vec<Json> = group.criteria.iter().map(|c| self.visit(Some(c))).collect();
        match (group.connector, group.negate) {
            (Connector::And, true) => Self::must_not(json!({ "bool": { "must": criteria } })),
            (Connector::Or, true) => json!({ "bool": { "must_not": criteria } }),
            (Connector::And, false) => json!({ "bool": { "must": criteria } }),
            (Connector::Or, false) => json!({ "bool": { "should": criteria } }),
        }
    }

    fn visit_criterion(&mut self, criterion: &'a Criterion) -> Json {
        let Some(operator) = criterion.operator else {
            return Self::invalid();
        };
        match operator {
            OpId::Gt | OpId::Gte | OpId::Lt | OpId::Lte => {
                let field = self.field_or_invalid(criterion.left());
                let bound = self.parameter_or_invalid(criterion.right());
                let comparator = operator.as_str().to_lowercase();
                json!({ "range": Self::keyed(field, Self::keyed(Json::String(comparator), bound)) })
            }
            OpId::Eq | OpId::In | OpId::Ne => {
                let field = self.field_or_invalid(criterion.left());
                let values = self.parameter_as_array(criterion.right());
                let terms = json!({ "terms": Self::keyed(field, values) });
                if operator == OpId::Ne {
                    Self::must_not(terms)
                } else {
                    terms
                }
            }
            OpId::Null | OpId::NotNull => {
                let exists = json!({ "exists": { "field": self.visit(criterion.left()) } });
                if operator == OpId::Null {
                    Self::must_not(exists)
                } else {
                    exists
                }
            }
            OpId::Like => {
                let field = self.field_or_invalid(criterion.left());
                let pattern = self.string_or_invalid(criterion.right());
                json!({ "wildcard": Self::keyed(field, pattern) })
            }
            OpId::HasAny | OpId::HasAll | OpId::HasNone => Self::invalid(),
        }
    }

    fn visit_nested_field(&mut self, field: &'a NestedField) -> Json {
        Json::String(field.full_name())
    }

    fn visit_parameter(&mut self, param: &'a Parameter) -> Json {
        param.value.to_json()
    }

    fn visit_operation(&mut self, op: &'a Operation) -> Json {
        match op.name.as_str() {
            "filter" => json!({ "query": self.visit(op.operand(0)) }),
            _ => json!({}),
        }
    }

    fn visit_null(&mut self) -> Json {
        Json::Null
    }
}

/// Compiles `root` into `{ "query": ... }`.
///
/// # Examples
///
/// ```
/// use codebuilder::{Criterion, Expr, NestedField, OpId, Parameter, TypeName};
/// use serde_json::json;
///
/// let rule: Expr = Criterion::new(
///     NestedField::new(["status"], TypeName::STRING),
///     OpId::Eq,
///     Parameter::literal("open"),
/// )
/// .into();
///
/// assert_eq!(
///     codebuilder::query::compile(Some(&rule)),
///     json!({ "query": { "terms": { "status": ["open"] } } })
/// );
/// ```
pub fn compile(root: Option<&Expr>) -> Json {
    QueryVisitor::new().compile(root)
}
