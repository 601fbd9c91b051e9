//! Pretty-printer that turns an expression tree back into source text.
//!
//! Output uses single spaces around binary operators and only the
//! parentheses needed to parse back into the same tree.

use crate::ast::{Node, NodeKind};
use crate::lexer::NEGATABLE_OPERATORS;
use crate::parser::{binary_precedence, is_comparison, unary_precedence};

/// Format an expression tree as canonical expression text.
#[must_use]
pub fn format(node: &Node) -> String {
    let mut out = String::new();
    format_node(&mut out, node);
    out
}

/// How a node binds when it appears as an operand.
#[derive(Debug, Clone, Copy)]
enum Shape {
    Binary { precedence: u16, comparison: bool },
    Unary(u16),
    Atom,
}

/// The `Binary` inside `x not in y`, if `node` is such a negation.
fn negated_relation(node: &Node) -> Option<(&str, &Node, &Node)> {
    let NodeKind::Unary { operator, operand } = &node.kind else {
        return None;
    };
    if operator != "not" {
        return None;
    }
    match &operand.kind {
        NodeKind::Binary {
            operator,
            left,
            right,
        } if NEGATABLE_OPERATORS.contains(&operator.as_str()) => Some((operator, left, right)),
        _ => None,
    }
}

fn shape(node: &Node) -> Shape {
    if let Some((operator, ..)) = negated_relation(node) {
        return binary_shape(operator);
    }
    match &node.kind {
        NodeKind::Binary { operator, .. } => binary_shape(operator),
        NodeKind::Unary { operator, .. } => Shape::Unary(unary_precedence(operator).unwrap_or(0)),
        _ => Shape::Atom,
    }
}

fn binary_shape(operator: &str) -> Shape {
    Shape::Binary {
        precedence: binary_precedence(operator).unwrap_or(0),
        comparison: is_comparison(operator),
    }
}

fn format_node(out: &mut String, node: &Node) {
    if let Some((operator, left, right)) = negated_relation(node) {
        format_binary(out, &format!("not {operator}"), operator, left, right);
        return;
    }

    match &node.kind {
        NodeKind::Binary {
            operator,
            left,
            right,
        } => format_binary(out, operator, operator, left, right),
        NodeKind::Unary { operator, operand } => {
            out.push_str(operator);
            if operator.chars().all(char::is_alphabetic) {
                out.push(' ');
            }
            let precedence = unary_precedence(operator).unwrap_or(0);
            let parens = match shape(operand) {
                Shape::Binary { precedence: p, .. } => p <= precedence,
                Shape::Unary(_) => true,
                Shape::Atom => false,
            };
            format_operand(out, operand, parens);
        }
        NodeKind::Member {
            object, property, ..
        } => {
            let parens = matches!(
                object.kind,
                NodeKind::Binary { .. } | NodeKind::Unary { .. } | NodeKind::Integer { .. }
            );
            format_operand(out, object, parens);
            out.push('.');
            match &property.kind {
                NodeKind::Identifier { value } => out.push_str(value),
                _ => format_node(out, property),
            }
        }
        NodeKind::Call { callee } => {
            format_node(out, callee);
            out.push_str("()");
        }
        NodeKind::Pointer { name } => {
            out.push('#');
            out.push_str(name);
        }
        NodeKind::String { value } => format_string(out, value),
        NodeKind::Integer { value } => out.push_str(&value.to_string()),
        NodeKind::Bool { value } => out.push_str(if *value { "true" } else { "false" }),
        NodeKind::Nil => out.push_str("nil"),
        NodeKind::Identifier { value } => out.push_str(value),
    }
}

/// `symbol` is what gets printed, `operator` decides the binding.
fn format_binary(out: &mut String, symbol: &str, operator: &str, left: &Node, right: &Node) {
    let precedence = binary_precedence(operator).unwrap_or(0);
    let comparison = is_comparison(operator);

    let left_parens = match shape(left) {
        Shape::Binary {
            precedence: p,
            comparison: c,
        } => p < precedence || (comparison && c),
        Shape::Unary(p) => p < precedence,
        Shape::Atom => false,
    };
    // Left-associative: an equal-precedence right operand needs parens.
    // A trailing prefix operator would swallow what follows the parent.
    let right_parens = match shape(right) {
        Shape::Binary { precedence: p, .. } => p <= precedence,
        Shape::Unary(p) => p < precedence,
        Shape::Atom => false,
    };

    format_operand(out, left, left_parens);
    out.push(' ');
    out.push_str(symbol);
    out.push(' ');
    format_operand(out, right, right_parens);
}

fn format_operand(out: &mut String, node: &Node, parens: bool) {
    if parens {
        out.push('(');
        format_node(out, node);
        out.push(')');
    } else {
        format_node(out, node);
    }
}

fn format_string(out: &mut String, value: &str) {
    out.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn reformat(src: &str) -> String {
        let ast = parse(&tokenize(src).tokens).into_result().expect("valid expression");
        format(&ast)
    }

    #[test]
    fn spacing_is_normalized() {
        assert_eq!(reformat("a==1&&b"), "a == 1 && b");
        assert_eq!(reformat("  x  "), "x");
    }

    #[test]
    fn redundant_parens_dropped() {
        assert_eq!(reformat("(a + b) + c"), "a + b + c");
        assert_eq!(reformat("((a))"), "a");
    }

    #[test]
    fn needed_parens_kept() {
        assert_eq!(reformat("a + (b + c)"), "a + (b + c)");
        assert_eq!(reformat("(a or b) and c"), "(a or b) and c");
        assert_eq!(reformat("(-a) ** b"), "(-a) ** b");
        assert_eq!(reformat("not (a == b)"), "not (a == b)");
    }

    #[test]
    fn unary_spacing() {
        assert_eq!(reformat("!a"), "!a");
        assert_eq!(reformat("not a"), "not a");
        assert_eq!(reformat("- 1"), "-1");
    }

    #[test]
    fn chained_comparison_expands() {
        assert_eq!(reformat("a < b < c"), "a < b && b < c");
    }

    #[test]
    fn negated_relation() {
        assert_eq!(reformat("x not in y"), "x not in y");
        assert_eq!(reformat("not (x in y)"), "x not in y");
    }

    #[test]
    fn member_and_strings() {
        assert_eq!(reformat("a.b.c"), "a.b.c");
        assert_eq!(reformat("'it\\'s'"), "\"it's\"");
        assert_eq!(reformat("\"a\\nb\""), "\"a\\nb\"");
    }
}
