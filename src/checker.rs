use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::ast::{Kind, Nature, Node, NodeKind};
use crate::schema::{Schema, TypeInfo};
use crate::token::Location;

/// Classifies a type error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CheckErrorKind {
    VariableNotFound,
    FieldNotFound,
    /// Member access on a value without field metadata, or with a
    /// property that is not a name.
    NoFields,
    /// Member access on a value that is not a struct or map.
    NotStruct,
    /// Unary operand of the wrong type.
    InvalidType,
    UnsupportedOperator(String),
    /// Call and pointer expressions.
    NotSupported,
    /// Root expression does not have the requested type.
    ExpectedType(Kind),
}

impl fmt::Display for CheckErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VariableNotFound => write!(f, "Variable not found"),
            Self::FieldNotFound => write!(f, "Field not found"),
            Self::NoFields => write!(f, "Target has no fields"),
            Self::NotStruct => write!(f, "Type of node must be struct"),
            Self::InvalidType => write!(f, "Invalid type"),
            Self::UnsupportedOperator(op) => write!(f, "Unsupported operator {op}"),
            Self::NotSupported => write!(f, "Not supported by checker"),
            Self::ExpectedType(kind) => write!(f, "Expected type {kind}"),
        }
    }
}

/// Error produced during type checking.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[error("{kind} at line {}, column {}", location.line, location.column)]
pub struct CheckError {
    pub kind: CheckErrorKind,
    pub location: Location,
}

/// Outcome of checking one tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Checked {
    /// Nature of the root node, if one could be inferred.
    pub nature: Option<Nature>,
    pub error: Option<CheckError>,
}

impl Checked {
    pub fn into_result(self) -> Result<Option<Nature>, CheckError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.nature),
        }
    }
}

/// Operators whose result is a boolean.
const BOOL_OPERATORS: &[&str] = &[
    "|",
    "or",
    "||",
    "and",
    "&&",
    "==",
    "!=",
    "<",
    ">",
    ">=",
    "<=",
    "in",
    "matches",
    "contains",
    "startsWith",
    "endsWith",
];

/// Operators whose result is an integer.
const INT_OPERATORS: &[&str] = &["+", "-", "*", "/"];

/// Type-checks an expression tree against a schema.
///
/// ```
/// use exprkit::{Checker, Kind, Schema, TypeInfo, parse, tokenize};
///
/// let schema = Schema::new().variable_info("n", TypeInfo::int());
/// let mut ast = parse(&tokenize("n > 1").tokens).ast.unwrap();
/// let checked = Checker::new(&schema).expect(Kind::Bool).check(&mut ast);
/// assert!(checked.error.is_none());
/// assert_eq!(ast.nature.map(|n| n.kind), Some(Kind::Bool));
/// ```
pub struct Checker<'s> {
    schema: &'s Schema,
    expected: Option<Kind>,
    error: Option<CheckError>,
}

impl<'s> Checker<'s> {
    #[must_use]
    pub const fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            expected: None,
            error: None,
        }
    }

    /// Require the root expression to have `kind`.
    #[must_use]
    pub const fn expect(mut self, kind: Kind) -> Self {
        self.expected = Some(kind);
        self
    }

    /// Annotate `node` and its descendants with natures.
    pub fn check(mut self, node: &mut Node) -> Checked {
        let nature = self.check_node(node);
        match (self.expected, &nature) {
            (Some(expected), Some(nt)) if nt.kind != expected => {
                self.error(CheckErrorKind::ExpectedType(expected), node.location);
            }
            _ => {}
        }
        if let Some(err) = &self.error {
            debug!(%err, "check failed");
        }
        Checked {
            nature,
            error: self.error,
        }
    }

    fn error(&mut self, kind: CheckErrorKind, location: Location) {
        if self.error.is_none() {
            self.error = Some(CheckError { kind, location });
        }
    }

    fn check_node(&mut self, node: &mut Node) -> Option<Nature> {
        let location = node.location;
        let nature = match &mut node.kind {
            NodeKind::Unary { operator, operand } => {
                let operand = self.check_node(operand).map(|n| n.kind);
                match (operator.as_str(), operand) {
                    ("!" | "not", Some(Kind::Bool)) => Some(Nature::of(Kind::Bool)),
                    ("+" | "-", Some(Kind::Int)) => Some(Nature::of(Kind::Int)),
                    _ => {
                        self.error(CheckErrorKind::InvalidType, location);
                        None
                    }
                }
            }
            NodeKind::Binary {
                operator,
                left,
                right,
            } => {
                let lhs = self.check_node(left);
                self.check_node(right);
                match (&lhs, right.nature.as_mut()) {
                    (Some(l), Some(r)) if l.kind == Kind::String && r.kind == Kind::String => {
                        r.info.clone_from(&l.info);
                    }
                    _ => {}
                }

                if BOOL_OPERATORS.contains(&operator.as_str()) {
                    Some(Nature::of(Kind::Bool))
                } else if INT_OPERATORS.contains(&operator.as_str()) {
                    Some(Nature::of(Kind::Int))
                } else {
                    let op = operator.clone();
                    self.error(CheckErrorKind::UnsupportedOperator(op), location);
                    None
                }
            }
            NodeKind::Member {
                object, property, ..
            } => {
                let object = self.check_node(object);
                object.and_then(|nt| self.check_member(&nt, property, location))
            }
            NodeKind::Identifier { value } => {
                let info = self.schema.variable(value).map(Nature::from_info);
                if info.is_none() {
                    self.error(CheckErrorKind::VariableNotFound, location);
                }
                info
            }
            NodeKind::String { .. } => Some(Nature::of(Kind::String)),
            NodeKind::Integer { .. } => Some(Nature::of(Kind::Int)),
            NodeKind::Bool { .. } => Some(Nature::of(Kind::Bool)),
            NodeKind::Nil => Some(Nature::of(Kind::Nil)),
            NodeKind::Call { .. } | NodeKind::Pointer { .. } => {
                self.error(CheckErrorKind::NotSupported, location);
                None
            }
        };
        node.nature.clone_from(&nature);
        nature
    }

    fn check_member(
        &mut self,
        object: &Nature,
        property: &Node,
        location: Location,
    ) -> Option<Nature> {
        if !matches!(object.kind, Kind::Struct | Kind::Map) {
            self.error(CheckErrorKind::NotStruct, location);
            return None;
        }
        let name = match &property.kind {
            NodeKind::Identifier { value } | NodeKind::String { value } => Some(value.as_str()),
            _ => None,
        };
        let fields = object.info.as_ref().and_then(|info| info.fields.as_ref());
        let (Some(fields), Some(name)) = (fields, name) else {
            self.error(CheckErrorKind::NoFields, property.location);
            return None;
        };
        fields.get(name).map(Nature::from_info).or_else(|| {
            self.error(CheckErrorKind::FieldNotFound, property.location);
            None
        })
    }
}

/// Check `node` against `schema`, optionally requiring a root type.
pub fn check(node: &mut Node, schema: &Schema, expected: Option<Kind>) -> Checked {
    let checker = Checker::new(schema);
    match expected {
        Some(kind) => checker.expect(kind).check(node),
        None => checker.check(node),
    }
}

/// Schema entry behind a checked expression, if any.
#[must_use]
pub fn info_of(node: &Node) -> Option<&TypeInfo> {
    node.nature.as_ref()?.info.as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn schema() -> Schema {
        Schema::new()
            .variable_info("n", TypeInfo::int())
            .variable_info("s", TypeInfo::string().values(["a", "b"]))
            .variable_info("t", TypeInfo::string())
            .variable_info("flag", TypeInfo::bool())
            .variable_info(
                "obj",
                TypeInfo::structure()
                    .field_info("name", TypeInfo::string())
                    .field_info("inner", TypeInfo::structure().field_info("x", TypeInfo::int())),
            )
    }

    fn run(src: &str, expected: Option<Kind>) -> (Node, Checked) {
        let mut ast = parse(&tokenize(src).tokens).ast.expect("parsable input");
        let checked = check(&mut ast, &schema(), expected);
        (ast, checked)
    }

    fn error_of(src: &str) -> CheckErrorKind {
        run(src, None).1.error.expect("check error").kind
    }

    #[test]
    fn comparison_is_bool() {
        let (ast, checked) = run("n == 5", Some(Kind::Bool));
        assert!(checked.error.is_none());
        assert_eq!(checked.nature.map(|n| n.kind), Some(Kind::Bool));
        assert_eq!(ast.nature.map(|n| n.kind), Some(Kind::Bool));
    }

    #[test]
    fn expected_type_mismatch() {
        let (_, checked) = run("n", Some(Kind::Bool));
        let err = checked.error.expect("type mismatch");
        assert_eq!(err.kind, CheckErrorKind::ExpectedType(Kind::Bool));
        assert_eq!(err.kind.to_string(), "Expected type bool");
    }

    #[test]
    fn unknown_variable() {
        let (_, checked) = run("missing == 1", None);
        let err = checked.error.expect("unknown variable");
        assert_eq!(err.kind, CheckErrorKind::VariableNotFound);
        assert_eq!(err.location, Location::new(1, 0));
    }

    #[test]
    fn unary_operand_types() {
        assert!(run("!flag", Some(Kind::Bool)).1.error.is_none());
        assert!(run("-n", Some(Kind::Int)).1.error.is_none());
        assert_eq!(error_of("!n"), CheckErrorKind::InvalidType);
        assert_eq!(error_of("-flag"), CheckErrorKind::InvalidType);
    }

    #[test]
    fn unsupported_operator() {
        assert_eq!(
            error_of("n % 2"),
            CheckErrorKind::UnsupportedOperator("%".to_string())
        );
    }

    #[test]
    fn member_access() {
        let (_, checked) = run("obj.name == 'x'", Some(Kind::Bool));
        assert!(checked.error.is_none());
        let (_, checked) = run("obj.inner.x > 1", Some(Kind::Bool));
        assert!(checked.error.is_none());
    }

    #[test]
    fn member_errors() {
        assert_eq!(error_of("obj.nope"), CheckErrorKind::FieldNotFound);
        assert_eq!(error_of("n.x"), CheckErrorKind::NotStruct);
        assert_eq!(error_of("obj.inner.x.y"), CheckErrorKind::NotStruct);
    }

    #[test]
    fn string_comparison_carries_left_info() {
        let (ast, _) = run("s == 'a'", None);
        let NodeKind::Binary { right, .. } = &ast.kind else {
            panic!("expected binary");
        };
        let values = info_of(right).and_then(|i| i.values.clone());
        assert_eq!(values, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn both_sides_checked() {
        let (ast, checked) = run("missing == n", None);
        assert!(checked.error.is_some());
        let NodeKind::Binary { right, .. } = &ast.kind else {
            panic!("expected binary");
        };
        assert_eq!(right.nature.as_ref().map(|n| n.kind), Some(Kind::Int));
    }

    #[test]
    fn literals() {
        assert_eq!(run("nil", None).1.nature.map(|n| n.kind), Some(Kind::Nil));
        assert_eq!(run("true", None).1.nature.map(|n| n.kind), Some(Kind::Bool));
        assert_eq!(run("'x'", None).1.nature.map(|n| n.kind), Some(Kind::String));
    }

    #[test]
    fn pointer_and_call_are_rejected() {
        let at = Location::new(1, 0);
        let mut pointer = Node::new(NodeKind::Pointer { name: "x".to_string() }, at);
        let checked = check(&mut pointer, &schema(), None);
        assert_eq!(checked.error.map(|e| e.kind), Some(CheckErrorKind::NotSupported));

        let callee = Box::new(Node::identifier("n", at));
        let mut call = Node::new(NodeKind::Call { callee }, at);
        assert!(check(&mut call, &schema(), None).error.is_some());
    }
}
