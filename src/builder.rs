use std::collections::BTreeMap;

use crate::ast::Kind;
use crate::schema::{Allow, DATE_FORMAT, OperatorInfo, Schema, TypeInfo, default_operators};

impl Schema {
    /// Create a schema with no variables and the default operators.
    #[must_use]
    pub fn new() -> Self {
        Self {
            variables: BTreeMap::new(),
            operators: default_operators(),
        }
    }

    /// Add or replace a variable.
    #[must_use]
    pub fn variable_info(mut self, name: &str, info: TypeInfo) -> Self {
        self.variables.insert(name.to_string(), info);
        self
    }

    /// Add or replace an operator.
    #[must_use]
    pub fn operator_info(mut self, symbol: &str, info: OperatorInfo) -> Self {
        self.operators.insert(symbol.to_string(), info);
        self
    }

    /// Drop every operator, including the defaults.
    #[must_use]
    pub fn without_operators(mut self) -> Self {
        self.operators.clear();
        self
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeInfo {
    #[must_use]
    pub const fn new(kind: Kind) -> Self {
        Self {
            kind,
            fields: None,
            values: None,
            format: None,
            description: None,
        }
    }

    #[must_use]
    pub const fn int() -> Self {
        Self::new(Kind::Int)
    }

    #[must_use]
    pub const fn string() -> Self {
        Self::new(Kind::String)
    }

    #[must_use]
    pub const fn bool() -> Self {
        Self::new(Kind::Bool)
    }

    /// An empty struct; add members with [`TypeInfo::field_info`].
    #[must_use]
    pub const fn structure() -> Self {
        Self::new(Kind::Struct)
    }

    /// A string edited with a date picker.
    #[must_use]
    pub fn date() -> Self {
        Self::string().format(DATE_FORMAT)
    }

    /// Add a nested field.
    #[must_use]
    pub fn field_info(mut self, name: &str, info: Self) -> Self {
        self.fields
            .get_or_insert_with(BTreeMap::new)
            .insert(name.to_string(), info);
        self
    }

    /// Restrict the type to a closed set of values.
    #[must_use]
    pub fn values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    #[must_use]
    pub fn description(mut self, text: &str) -> Self {
        self.description = Some(text.to_string());
        self
    }
}

impl OperatorInfo {
    /// A binary operator accepted for any operand type.
    #[must_use]
    pub fn binary() -> Self {
        Self {
            kind: "binary".to_string(),
            allow: None,
            description: None,
        }
    }

    #[must_use]
    pub const fn allow(mut self, allow: Allow) -> Self {
        self.allow = Some(allow);
        self
    }

    #[must_use]
    pub fn description(mut self, text: &str) -> Self {
        self.description = Some(text.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_nested_struct() {
        let schema = Schema::new().variable_info(
            "user",
            TypeInfo::structure()
                .field_info("name", TypeInfo::string())
                .field_info("address", TypeInfo::structure().field_info("zip", TypeInfo::int())),
        );

        let zip = schema
            .variable("user")
            .and_then(|u| u.field("address"))
            .and_then(|a| a.field("zip"));
        assert_eq!(zip.map(|z| z.kind), Some(Kind::Int));
    }

    #[test]
    fn build_enum_and_date() {
        let status = TypeInfo::string().values(["b", "a"]);
        assert_eq!(status.values.as_deref(), Some(&["b".to_string(), "a".to_string()][..]));
        assert!(TypeInfo::date().is_date());
        assert!(!TypeInfo::string().is_date());
    }

    #[test]
    fn build_operators() {
        let schema = Schema::new()
            .without_operators()
            .operator_info("~", OperatorInfo::binary().allow(Allow::String));
        assert_eq!(schema.operators.len(), 1);
        assert_eq!(schema.operator("~").and_then(|o| o.allow), Some(Allow::String));
    }

    #[test]
    fn build_default() {
        let schema = Schema::default();
        assert!(schema.variables.is_empty());
        assert_eq!(
            schema.operator("==").and_then(|o| o.description.as_deref()),
            Some("Equals")
        );
    }

    #[test]
    fn builder_matches_json() {
        let built = Schema::new().variable_info("n", TypeInfo::int().description("count"));
        let parsed = Schema::from_json(r#"{"variables": {"n": {"kind": "int", "description": "count"}}}"#)
            .expect("valid schema");
        assert_eq!(built, parsed);
    }
}
