//! Caller-supplied catalog of variables and operators.
//!
//! A schema is plain data and is usually loaded from JSON:
//!
//! ```
//! use exprkit::{Kind, Schema};
//!
//! let schema = Schema::from_json(r#"{
//!     "variables": {
//!         "status": { "kind": "string", "values": ["active", "offline"] },
//!         "meta": { "kind": "struct", "fields": { "region": { "kind": "string" } } }
//!     }
//! }"#).unwrap();
//!
//! assert_eq!(schema.variable("status").map(|v| v.kind), Some(Kind::String));
//! assert!(schema.variable("meta").and_then(|m| m.field("region")).is_some());
//! assert!(schema.operators.contains_key("=="));
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ast::Kind;

/// Format marker for values edited with a date picker.
pub const DATE_FORMAT: &str = "date";

/// Error produced while loading a schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to read schema {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid schema: {0}")]
    Json(#[from] serde_json::Error),
}

/// Variables and operators known to the checker and the suggestion
/// engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub variables: BTreeMap<String, TypeInfo>,
    #[serde(default = "default_operators")]
    pub operators: BTreeMap<String, OperatorInfo>,
}

/// Type description of a variable or struct field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub kind: Kind,
    /// Nested fields of a struct or map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, TypeInfo>>,
    /// Closed set of allowed string values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
    /// Presentation hint, e.g. `date`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Operand class an operator is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Allow {
    String,
    Number,
    Boolean,
}

/// Operator entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorInfo {
    /// Operator arity, `binary` for every built-in operator.
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow: Option<Allow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Schema {
    /// Parse a schema from JSON. A missing `operators` key selects the
    /// default operator catalog.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON schema file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&TypeInfo> {
        self.variables.get(name)
    }

    #[must_use]
    pub fn operator(&self, symbol: &str) -> Option<&OperatorInfo> {
        self.operators.get(symbol)
    }
}

impl TypeInfo {
    /// Look up a nested field. `None` when the type has no fields or
    /// the field does not exist.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Self> {
        self.fields.as_ref()?.get(name)
    }

    #[must_use]
    pub fn is_date(&self) -> bool {
        self.format.as_deref() == Some(DATE_FORMAT)
    }
}

/// The operator catalog used when a schema does not list its own.
#[must_use]
pub fn default_operators() -> BTreeMap<String, OperatorInfo> {
    let mut ops = BTreeMap::new();
    ops.insert(
        "==".to_string(),
        OperatorInfo::binary().description("Equals"),
    );
    for op in ["!=", "<", ">", "<=", ">="] {
        ops.insert(op.to_string(), OperatorInfo::binary());
    }
    for op in ["&&", "and", "||", "or"] {
        ops.insert(op.to_string(), OperatorInfo::binary().allow(Allow::Boolean));
    }
    for op in ["contains", "startsWith", "endsWith", "matches"] {
        ops.insert(op.to_string(), OperatorInfo::binary().allow(Allow::String));
    }
    for op in ["+", "-", "*", "/", "%", "**", "^"] {
        ops.insert(op.to_string(), OperatorInfo::binary().allow(Allow::Number));
    }
    ops
}
