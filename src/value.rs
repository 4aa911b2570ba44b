use crate::ast::TypeName;

/// A literal carried by a [`Parameter`](crate::Parameter).
///
/// Parameters hold a scalar or an array of scalars, so unlike JSON there is
/// no object case and arrays never nest.
///
/// # Type Preservation
///
/// Integers and floats stay distinct so a literal typed `1` renders as `1`
/// and not `1.0`.
///
/// # Examples
///
/// ```
/// use codebuilder::Value;
///
/// let single = Value::String("open".to_string());
/// let many = Value::Array(vec![Value::Integer(1), Value::Integer(2)]);
///
/// assert_eq!(single.as_string(), "open");
/// assert!(many.is_array());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// JSON null
    Null,

    /// JSON boolean (true/false)
    Boolean(bool),

    /// Floating-point number
    Float(f64),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    /// UTF-8 string
    String(String),

    /// Array of scalar values
    Array(Vec<Value>),
}

impl Default for Value {
    fn default() -> Self {
        Value::String(String::new())
    }
}

impl Value {
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Get as string (used for literal rendering)
    pub fn as_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Float(n) => n.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Null => "null".to_string(),
            Value::Array(items) => items
                .iter()
                .map(Value::as_string)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// The declared type a literal of this shape satisfies.
    pub fn type_name(&self) -> TypeName {
        match self {
            Value::Null => TypeName::NULL,
            Value::Boolean(_) => TypeName::BOOLEAN,
            Value::Float(_) | Value::Integer(_) => TypeName::NUMBER,
            Value::String(_) => TypeName::STRING,
            Value::Array(_) => TypeName::ARRAY,
        }
    }

    /// Converts from JSON, rejecting objects and nested arrays.
    pub fn from_json(json: &serde_json::Value) -> Option<Value> {
        match json {
            serde_json::Value::Array(items) => items
                .iter()
                .map(Value::scalar_from_json)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            other => Value::scalar_from_json(other),
        }
    }

    fn scalar_from_json(json: &serde_json::Value) -> Option<Value> {
        match json {
            serde_json::Value::Null => Some(Value::Null),
            serde_json::Value::Bool(b) => Some(Value::Boolean(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Value::Integer(i)),
                None => n.as_f64().map(Value::Float),
            },
            serde_json::Value::String(s) => Some(Value::String(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}
