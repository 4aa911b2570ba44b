use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Declared value type of an expression, as a bitmask.
///
/// A value may satisfy several declared types at once (a parameter declared
/// `STRING | NUMBER`). [`TypeName::ANY`] is the zero value and acts as a
/// wildcard when matching.
///
/// # Examples
///
/// ```
/// use codebuilder::TypeName;
///
/// let declared = TypeName::STRING | TypeName::NUMBER;
/// assert!(declared.matches(TypeName::NUMBER));
/// assert!(!declared.matches(TypeName::BOOLEAN));
/// assert!(TypeName::ANY.matches(TypeName::DATE));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(u8);

impl TypeName {
    pub const ANY: TypeName = TypeName(0);
    pub const NULL: TypeName = TypeName(1);
    pub const BOOLEAN: TypeName = TypeName(1 << 1);
    pub const ARRAY: TypeName = TypeName(1 << 2);
    pub const OBJECT: TypeName = TypeName(1 << 3);
    pub const DATE: TypeName = TypeName(1 << 4);
    pub const STRING: TypeName = TypeName(1 << 5);
    pub const NUMBER: TypeName = TypeName(1 << 6);

    /// Every concrete type bit, in declaration order.
    pub const ALL: [TypeName; 7] = [
        TypeName::NULL,
        TypeName::BOOLEAN,
        TypeName::ARRAY,
        TypeName::OBJECT,
        TypeName::DATE,
        TypeName::STRING,
        TypeName::NUMBER,
    ];

    const MASK: u8 = 0b0111_1111;

    /// Builds a type from raw bits, rejecting bits outside the known set.
    pub fn from_bits(bits: u8) -> Option<TypeName> {
        (bits & !Self::MASK == 0).then_some(TypeName(bits))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_any(self) -> bool {
        self.0 == 0
    }

    /// True when every bit of `other` is also set in `self`.
    pub fn contains(self, other: TypeName) -> bool {
        self.0 & other.0 == other.0
    }

    /// Type compatibility: any shared bit, with `ANY` matching everything.
    pub fn matches(self, other: TypeName) -> bool {
        self.is_any() || other.is_any() || self.0 & other.0 != 0
    }

    /// Merges two observed types; `NULL` yields to the other side.
    pub fn merge(self, other: TypeName) -> TypeName {
        if self == other || other == TypeName::NULL {
            self
        } else if self == TypeName::NULL {
            other
        } else {
            self | other
        }
    }

    fn label(self) -> Option<&'static str> {
        Some(match self {
            TypeName::ANY => "any",
            TypeName::NULL => "null",
            TypeName::BOOLEAN => "boolean",
            TypeName::ARRAY => "array",
            TypeName::OBJECT => "object",
            TypeName::DATE => "date",
            TypeName::STRING => "string",
            TypeName::NUMBER => "number",
            _ => return None,
        })
    }
}

impl BitOr for TypeName {
    type Output = TypeName;

    fn bitor(self, rhs: TypeName) -> TypeName {
        TypeName(self.0 | rhs.0)
    }
}

impl BitOrAssign for TypeName {
    fn bitor_assign(&mut self, rhs: TypeName) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for TypeName {
    type Output = TypeName;

    fn bitand(self, rhs: TypeName) -> TypeName {
        TypeName(self.0 & rhs.0)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = self.label() {
            return f.write_str(label);
        }
        let parts: Vec<&str> = TypeName::ALL
            .iter()
            .filter(|t| self.contains(**t))
            .filter_map(|t| t.label())
            .collect();
        f.write_str(&parts.join(" | "))
    }
}
