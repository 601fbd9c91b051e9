use std::fmt;

use serde::Serialize;

use crate::schema::TypeInfo;
use crate::token::Location;

/// Expression tree node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(rename = "loc")]
    pub location: Location,
    /// Type annotation attached by the checker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nature: Option<Nature>,
}

/// Node variants.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeKind {
    /// `not x`, `!x`, `-x`, `+x`.
    Unary { operator: String, operand: Box<Node> },
    /// `left op right`.
    Binary {
        operator: String,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// `object.property`.
    Member {
        object: Box<Node>,
        property: Box<Node>,
        method: bool,
    },
    /// Reserved for call syntax.
    Call { callee: Box<Node> },
    /// `#name`.
    Pointer { name: String },
    String { value: String },
    Integer { value: i64 },
    Bool { value: bool },
    Nil,
    Identifier { value: String },
}

impl Node {
    #[must_use]
    pub const fn new(kind: NodeKind, location: Location) -> Self {
        Self {
            kind,
            location,
            nature: None,
        }
    }

    #[must_use]
    pub fn unary(operator: impl Into<String>, operand: Self, location: Location) -> Self {
        Self::new(
            NodeKind::Unary {
                operator: operator.into(),
                operand: Box::new(operand),
            },
            location,
        )
    }

    #[must_use]
    pub fn binary(operator: impl Into<String>, left: Self, right: Self, location: Location) -> Self {
        Self::new(
            NodeKind::Binary {
                operator: operator.into(),
                left: Box::new(left),
                right: Box::new(right),
            },
            location,
        )
    }

    #[must_use]
    pub fn member(object: Self, property: Self, location: Location) -> Self {
        Self::new(
            NodeKind::Member {
                object: Box::new(object),
                property: Box::new(property),
                method: false,
            },
            location,
        )
    }

    #[must_use]
    pub fn identifier(value: impl Into<String>, location: Location) -> Self {
        Self::new(
            NodeKind::Identifier {
                value: value.into(),
            },
            location,
        )
    }

    #[must_use]
    pub fn string(value: impl Into<String>, location: Location) -> Self {
        Self::new(
            NodeKind::String {
                value: value.into(),
            },
            location,
        )
    }

    #[must_use]
    pub const fn integer(value: i64, location: Location) -> Self {
        Self::new(NodeKind::Integer { value }, location)
    }

    #[must_use]
    pub const fn bool(value: bool, location: Location) -> Self {
        Self::new(NodeKind::Bool { value }, location)
    }

    #[must_use]
    pub const fn nil(location: Location) -> Self {
        Self::new(NodeKind::Nil, location)
    }

    /// Return the identifier name if this node is an identifier.
    #[must_use]
    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Identifier { value } => Some(value),
            _ => None,
        }
    }

    /// Return the operator for unary and binary nodes.
    #[must_use]
    pub fn operator(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Unary { operator, .. } | NodeKind::Binary { operator, .. } => Some(operator),
            _ => None,
        }
    }
}

/// Inferred type of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Struct,
    Func,
    String,
    Bool,
    Int,
    Array,
    Any,
    Map,
    Nil,
}

impl Kind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Struct => "struct",
            Self::Func => "func",
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Array => "array",
            Self::Any => "any",
            Self::Map => "map",
            Self::Nil => "nil",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Kind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "struct" => Ok(Self::Struct),
            "func" => Ok(Self::Func),
            "string" => Ok(Self::String),
            "bool" => Ok(Self::Bool),
            "int" => Ok(Self::Int),
            "array" => Ok(Self::Array),
            "any" => Ok(Self::Any),
            "map" => Ok(Self::Map),
            "nil" => Ok(Self::Nil),
            other => Err(format!("unknown type: {other}")),
        }
    }
}

/// Checker annotation for a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Nature {
    #[serde(rename = "type")]
    pub kind: Kind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Schema entry the nature was derived from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<TypeInfo>,
}

impl Nature {
    #[must_use]
    pub const fn of(kind: Kind) -> Self {
        Self {
            kind,
            format: None,
            info: None,
        }
    }

    /// Nature derived from a schema entry, keeping its metadata.
    #[must_use]
    pub fn from_info(info: &TypeInfo) -> Self {
        Self {
            kind: info.kind,
            format: info.format.clone(),
            info: Some(info.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [Kind::Struct, Kind::Bool, Kind::Int, Kind::Nil] {
            assert_eq!(kind.as_str().parse::<Kind>(), Ok(kind));
        }
        assert!("float".parse::<Kind>().is_err());
    }

    #[test]
    fn operator_accessor() {
        let at = Location::new(1, 0);
        let node = Node::binary("==", Node::identifier("a", at), Node::integer(1, at), at);
        assert_eq!(node.operator(), Some("=="));
        assert_eq!(Node::identifier("a", at).operator(), None);
    }
}
