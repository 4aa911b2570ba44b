use serde::{Deserialize, Serialize};

/// Criterion operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpId {
    // Comparison
    /// Equal
    Eq,
    /// Not equal
    Ne,
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,
    /// Less than
    Lt,
    /// Less than or equal
    Lte,

    // Membership and text
    /// Left value is one of the right values
    In,
    /// Left text contains the right text
    Like,

    // Array scopes
    /// Some element matches the nested group
    HasAny,
    /// Every element matches the nested group
    HasAll,
    /// No element matches the nested group
    HasNone,

    // Presence
    /// Value is not set (no right operand)
    Null,
    /// Value is set (no right operand)
    NotNull,
}

impl OpId {
    pub fn as_str(self) -> &'static str {
        match self {
            OpId::Eq => "Eq",
            OpId::Ne => "Ne",
            OpId::Gt => "Gt",
            OpId::Gte => "Gte",
            OpId::Lt => "Lt",
            OpId::Lte => "Lte",
            OpId::In => "In",
            OpId::Like => "Like",
            OpId::HasAny => "HasAny",
            OpId::HasAll => "HasAll",
            OpId::HasNone => "HasNone",
            OpId::Null => "Null",
            OpId::NotNull => "NotNull",
        }
    }

    /// Has* operators expect a nested group scoped to the array element.
    pub fn is_scope(self) -> bool {
        matches!(self, OpId::HasAny | OpId::HasAll | OpId::HasNone)
    }

    /// Null/NotNull never evaluate a right operand.
    pub fn is_unary(self) -> bool {
        matches!(self, OpId::Null | OpId::NotNull)
    }
}

/// Boolean connector of a criteria group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connector {
    #[default]
    And,
    Or,
}
