//! Wire form of expression trees.
//!
//! Every node becomes a JSON object carrying a `$type` tag plus its
//! properties, recursively:
//!
//! ```text
//! {"$type": "Criterion",
//!  "leftOperand": {"$type": "NestedField", "path": ["status"], "scoped": false, "type": 32},
//!  "operator": "Eq",
//!  "rightOperand": {"$type": "Parameter", "value": "open", "type": 32}}
//! ```
//!
//! Decoding resolves the tag through the [`Registry`] and rebuilds each
//! variant field by field. Missing properties take the variant's default;
//! present properties must have the right shape. There is no envelope or
//! version field.

use std::collections::HashMap;

use serde_json::{Map, Value as Json, json};
use thiserror::Error;

use crate::ast::{
    ChooseOperation, Connector, CriteriaGroup, Criterion, Expr, ExprKind, IfOperation,
    NestedField, OpId, Operation, Parameter, TypeName,
};
use crate::registry::Registry;
use crate::value::Value;

/// Errors raised while decoding the wire form.
#[derive(Debug, Error)]
pub enum SerializeError {
    /// Node position held something other than an object or null
    #[error("expected an expression object, got {0}")]
    NotAnObject(&'static str),

    /// Object without a `$type` tag
    #[error("expression object has no `$type` tag")]
    MissingTag,

    /// Tag not present in the registry
    #[error("unknown expression tag `{0}`")]
    UnknownTag(String),

    /// Property present but malformed
    #[error("invalid `{field}` on {tag}: expected {expected}")]
    InvalidField {
        tag: &'static str,
        field: &'static str,
        expected: &'static str,
    },

    /// Input text was not JSON
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SerializeError>;

/// Custom encoder whose output replaces the default object verbatim.
pub type SerializeHook = fn(&Expr) -> Json;

pub struct Serializer<'r> {
    registry: &'r Registry,
    hooks: HashMap<ExprKind, SerializeHook>,
}

impl Default for Serializer<'static> {
    fn default() -> Self {
        Serializer::new(Registry::global())
    }
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

impl<'r> Serializer<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Serializer {
            registry,
            hooks: HashMap::new(),
        }
    }

    /// Routes encoding of `kind` through `hook`.
    pub fn with_hook(mut self, kind: ExprKind, hook: SerializeHook) -> Self {
        self.hooks.insert(kind, hook);
        self
    }

    /// # Panics
    ///
    /// Panics if the registry has no entry for the node's kind; a node
    /// written under a borrowed tag would decode as something else.
    pub fn to_json(&self, expr: &Expr) -> Json {
        if let Some(hook) = self.hooks.get(&expr.kind()) {
            return hook(expr);
        }

        let tag = self.registered_tag(expr.kind());
        let mut object = Map::new();
        object.insert("$type".to_string(), Json::String(tag.to_string()));

        match expr {
            Expr::Empty => {}
            Expr::CriteriaGroup(group) => {
                object.insert("criteria".into(), self.list_to_json(&group.criteria));
                object.insert("connector".into(), json!(group.connector));
                object.insert("negate".into(), Json::Bool(group.negate));
            }
            Expr::Criterion(criterion) => {
                object.insert("leftOperand".into(), self.to_json_opt(criterion.left()));
                object.insert("operator".into(), json!(criterion.operator));
                object.insert("rightOperand".into(), self.to_json_opt(criterion.right()));
            }
            Expr::NestedField(field) => {
                object.insert("path".into(), json!(field.path));
                object.insert("scoped".into(), Json::Bool(field.scoped));
                object.insert("type".into(), json!(field.type_name));
            }
            Expr::Parameter(param) => {
                object.insert("value".into(), param.value.to_json());
                object.insert("type".into(), json!(param.type_name));
            }
            Expr::Operation(_) | Expr::If(_) | Expr::Choose(_) => {
                if let Some(op) = expr.as_operation() {
                    object.insert("name".into(), Json::String(op.name.clone()));
                    let operands = op.operands.iter().map(|o| self.to_json_opt(o.as_ref()));
                    object.insert("operands".into(), Json::Array(operands.collect()));
                }
            }
        }

        Json::Object(object)
    }

    fn registered_tag(&self, kind: ExprKind) -> &'static str {
        self.registry.tag_of(kind).unwrap_or_else(|| {
            panic!("expression kind {:?} is not registered; register it before serializing", kind)
        })
    }

    /// Encodes an optional node, `None` becoming JSON null.
    pub fn to_json_opt(&self, expr: Option<&Expr>) -> Json {
        expr.map_or(Json::Null, |e| self.to_json(e))
    }

    pub fn list_to_json(&self, exprs: &[Expr]) -> Json {
        Json::Array(exprs.iter().map(|e| self.to_json(e)).collect())
    }

    /// Decodes a node; JSON null decodes to `None`.
    pub fn from_json(&self, json: &Json) -> Result<Option<Expr>> {
        let object = match json {
            Json::Null => return Ok(None),
            Json::Object(object) => object,
            other => return Err(SerializeError::NotAnObject(json_kind(other))),
        };

        let tag = object
            .get("$type")
            .and_then(Json::as_str)
            .ok_or(SerializeError::MissingTag)?;
        let kind = self
            .registry
            .resolve(tag, json)
            .ok_or_else(|| SerializeError::UnknownTag(tag.to_string()))?;

        for key in object.keys() {
            if !is_known_key(kind, key) {
                tracing::debug!(tag, key = key.as_str(), "ignoring unknown property");
            }
        }

        let decoder = Decoder {
            serializer: self,
            object,
            tag: self.registered_tag(kind),
        };
        decoder.decode(kind).map(Some)
    }

    /// Decodes a JSON array of nodes; null elements are rejected.
    pub fn list_from_json(&self, json: &Json) -> Result<Vec<Expr>> {
        let items = json
            .as_array()
            .ok_or(SerializeError::NotAnObject(json_kind(json)))?;
        items
            .iter()
            .map(|item| {
                self.from_json(item)?
                    .ok_or(SerializeError::NotAnObject("null"))
            })
            .collect()
    }

    pub fn parse_str(&self, text: &str) -> Result<Option<Expr>> {
        let json: Json = serde_json::from_str(text)?;
        self.from_json(&json)
    }

    /// Deep copy through the wire form.
    pub fn copy_expr(&self, expr: &Expr) -> Result<Expr> {
        self.from_json(&self.to_json(expr))?
            .ok_or(SerializeError::NotAnObject("null"))
    }
}

fn is_known_key(kind: ExprKind, key: &str) -> bool {
    let keys: &[&str] = match kind {
        ExprKind::Empty => &[],
        ExprKind::CriteriaGroup => &["criteria", "connector", "negate"],
        ExprKind::Criterion => &["leftOperand", "operator", "rightOperand"],
        ExprKind::NestedField => &["path", "scoped", "type"],
        ExprKind::Parameter => &["value", "type"],
        ExprKind::Operation | ExprKind::If | ExprKind::Choose => &["name", "operands"],
    };
    key == "$type" || keys.contains(&key)
}

struct Decoder<'a, 'r> {
    serializer: &'a Serializer<'r>,
    object: &'a Map<String, Json>,
    tag: &'static str,
}

impl Decoder<'_, '_> {
    fn decode(&self, kind: ExprKind) -> Result<Expr> {
        Ok(match kind {
            ExprKind::Empty => Expr::Empty,
            ExprKind::CriteriaGroup => Expr::CriteriaGroup(self.criteria_group()?),
            ExprKind::Criterion => Expr::Criterion(self.criterion()?),
            ExprKind::NestedField => Expr::NestedField(self.nested_field()?),
            ExprKind::Parameter => Expr::Parameter(self.parameter()?),
            ExprKind::Operation => Expr::Operation(self.operation()?),
            ExprKind::If => Expr::If(IfOperation::from_operation(self.operation()?)),
            ExprKind::Choose => Expr::Choose(ChooseOperation::from_operation(self.operation()?)),
        })
    }

    /// Present, non-null property.
    fn field(&self, name: &str) -> Option<&Json> {
        self.object.get(name).filter(|v| !v.is_null())
    }

    fn invalid(&self, field: &'static str, expected: &'static str) -> SerializeError {
        SerializeError::InvalidField {
            tag: self.tag,
            field,
            expected,
        }
    }

    fn bool_field(&self, name: &'static str) -> Result<Option<bool>> {
        self.field(name)
            .map(|v| v.as_bool().ok_or_else(|| self.invalid(name, "a boolean")))
            .transpose()
    }

    fn type_field(&self) -> Result<Option<TypeName>> {
        self.field("type")
            .map(|v| {
                v.as_u64()
                    .and_then(|bits| u8::try_from(bits).ok())
                    .and_then(TypeName::from_bits)
                    .ok_or_else(|| self.invalid("type", "a type bitmask"))
            })
            .transpose()
    }

    fn expr_field(&self, name: &'static str) -> Result<Option<Box<Expr>>> {
        match self.field(name) {
            None => Ok(None),
            Some(json) => Ok(self.serializer.from_json(json)?.map(Box::new)),
        }
    }

    fn criteria_group(&self) -> Result<CriteriaGroup> {
        let mut group = CriteriaGroup::default();
        if let Some(criteria) = self.field("criteria") {
            if !criteria.is_array() {
                return Err(self.invalid("criteria", "an array of expressions"));
            }
            group.criteria = self.serializer.list_from_json(criteria)?;
        }
        if let Some(connector) = self.field("connector") {
            group.connector = serde_json::from_value::<Connector>(connector.clone())
                .map_err(|_| self.invalid("connector", "\"and\" or \"or\""))?;
        }
        if let Some(negate) = self.bool_field("negate")? {
            group.negate = negate;
        }
        Ok(group)
    }

    fn criterion(&self) -> Result<Criterion> {
        let operator = self
            .field("operator")
            .map(|op| {
                serde_json::from_value::<OpId>(op.clone())
                    .map_err(|_| self.invalid("operator", "an operator id"))
            })
            .transpose()?;
        Ok(Criterion {
            left_operand: self.expr_field("leftOperand")?,
            operator,
            right_operand: self.expr_field("rightOperand")?,
        })
    }

    fn nested_field(&self) -> Result<NestedField> {
        let mut field = NestedField::default();
        if let Some(path) = self.field("path") {
            field.path = path
                .as_array()
                .and_then(|segments| {
                    segments
                        .iter()
                        .map(|s| s.as_str().map(str::to_string))
                        .collect::<Option<Vec<_>>>()
                })
                .ok_or_else(|| self.invalid("path", "an array of strings"))?;
        }
        if let Some(scoped) = self.bool_field("scoped")? {
            field.scoped = scoped;
        }
        if let Some(type_name) = self.type_field()? {
            field.type_name = type_name;
        }
        Ok(field)
    }

    fn parameter(&self) -> Result<Parameter> {
        let mut param = Parameter::default();
        if let Some(value) = self.object.get("value") {
            param.value = Value::from_json(value)
                .ok_or_else(|| self.invalid("value", "a scalar or an array of scalars"))?;
        }
        if let Some(type_name) = self.type_field()? {
            param.type_name = type_name;
        }
        Ok(param)
    }

    fn operation(&self) -> Result<Operation> {
        let mut op = Operation::default();
        if let Some(name) = self.field("name") {
            op.name = name
                .as_str()
                .ok_or_else(|| self.invalid("name", "a string"))?
                .to_string();
        }
        if let Some(operands) = self.field("operands") {
            op.operands = operands
                .as_array()
                .ok_or_else(|| self.invalid("operands", "an array"))?
                .iter()
                .map(|operand| self.serializer.from_json(operand))
                .collect::<Result<Vec<_>>>()?;
        }
        Ok(op)
    }
}

/// Encodes with the global registry.
pub fn to_json(expr: &Expr) -> Json {
    Serializer::default().to_json(expr)
}

/// Decodes with the global registry.
pub fn from_json(json: &Json) -> Result<Option<Expr>> {
    Serializer::default().from_json(json)
}

/// Deep copy through the wire form, used when duplicating a subtree.
pub fn copy_expr(expr: &Expr) -> Result<Expr> {
    Serializer::default().copy_expr(expr)
}
