//! Property-based tests with proptest.
//!
//! Generate random expression trees, format them, parse them back, and
//! verify the round-trip produces stable (idempotent) output.
//!
//! We check `format(parse(format(ast))) == format(ast)` rather than
//! comparing trees because parsed nodes carry source locations that
//! generated nodes do not.

use exprkit::{Location, Node, analyze, format, parse, parse_speculative, tokenize};
use proptest::prelude::*;

const AT: Location = Location { line: 1, column: 0 };

const BINARY_OPERATORS: &[&str] = &[
    "|", "or", "||", "and", "&&", "==", "!=", "<", ">", "<=", ">=", "in", "matches", "contains",
    "startsWith", "endsWith", "..", "+", "-", "*", "/", "%", "**", "^", "??",
];

const UNARY_OPERATORS: &[&str] = &["not", "!", "-", "+"];

const NEGATABLE: &[&str] = &["in", "matches", "contains", "startsWith", "endsWith"];

// -- Leaf strategies --

/// Names start with `v`, so they never collide with a keyword.
fn name() -> impl Strategy<Value = String> {
    "v[a-zA-Z0-9_]{0,6}"
}

/// String contents, including characters that need escaping.
fn text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 '\"\\\\]{0,10}"
}

fn leaf() -> impl Strategy<Value = Node> {
    prop_oneof![
        4 => name().prop_map(|n| Node::identifier(n, AT)),
        2 => (0i64..100_000).prop_map(|v| Node::integer(v, AT)),
        2 => text().prop_map(|s| Node::string(s, AT)),
        1 => any::<bool>().prop_map(|b| Node::bool(b, AT)),
        1 => Just(Node::nil(AT)),
    ]
}

/// Member objects must be postfix-capable: `true.x` is not member
/// access.
fn member_object(node: &Node) -> bool {
    use exprkit::NodeKind;
    !matches!(node.kind, NodeKind::Bool { .. } | NodeKind::Nil)
}

fn expression() -> impl Strategy<Value = Node> {
    leaf().prop_recursive(4, 32, 2, |inner| {
        prop_oneof![
            (prop::sample::select(BINARY_OPERATORS), inner.clone(), inner.clone())
                .prop_map(|(op, l, r)| Node::binary(op, l, r, AT)),
            (prop::sample::select(UNARY_OPERATORS), inner.clone())
                .prop_map(|(op, operand)| Node::unary(op, operand, AT)),
            (prop::sample::select(NEGATABLE), inner.clone(), inner.clone()).prop_map(
                |(op, l, r)| Node::unary("not", Node::binary(op, l, r, AT), AT)
            ),
            (inner, name())
                .prop_filter("member object", |(object, _)| member_object(object))
                .prop_map(|(object, field)| Node::member(
                    object,
                    Node::identifier(field, AT),
                    AT
                )),
        ]
    })
}

fn reparse(source: &str) -> Result<Node, String> {
    let lexed = tokenize(source);
    if let Some(err) = lexed.error {
        return Err(err.to_string());
    }
    parse(&lexed.tokens).into_result().map_err(|e| e.to_string())
}

// -- Properties --

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn formatted_output_parses(ast in expression()) {
        let source = format(&ast);
        prop_assert!(reparse(&source).is_ok(), "{source}: {:?}", reparse(&source));
    }

    #[test]
    fn format_is_idempotent(ast in expression()) {
        let once = format(&ast);
        let reparsed = reparse(&once).map_err(TestCaseError::fail)?;
        prop_assert_eq!(format(&reparsed), once);
    }

    #[test]
    fn analysis_never_panics(source in "\\PC{0,40}") {
        let schema = exprkit::Schema::new();
        let analysis = analyze(&source, &schema, None);
        prop_assert!(!analysis.tokens.is_empty());
    }

    #[test]
    fn speculative_parse_agrees_on_valid_input(ast in expression()) {
        let source = format(&ast);
        let tokens = tokenize(&source).tokens;
        prop_assert!(parse_speculative(&tokens).is_ok(), "{source}");
    }
}
