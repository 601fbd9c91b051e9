#![allow(dead_code)]

use exprkit::{Node, Schema, Suggestions, TokenKind, format, parse, suggest, tokenize};

/// Schema with one variable of every shape the editor cares about.
pub fn schema() -> Schema {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/schema.json");
    Schema::load(path).unwrap_or_else(|e| panic!("fixture schema: {e}"))
}

/// Parse `input`, failing the test on any lexer or parser error.
pub fn ast(input: &str) -> Node {
    let lexed = tokenize(input);
    assert!(lexed.error.is_none(), "lex error in {input:?}: {:?}", lexed.error);
    parse(&lexed.tokens)
        .into_result()
        .unwrap_or_else(|e| panic!("parse error in {input:?}: {e}"))
}

/// Parse then format.
pub fn canonical(input: &str) -> String {
    format(&ast(input))
}

/// Suggestions with the cursor at the end of `input`.
pub fn suggest_at_end(input: &str) -> Option<Suggestions> {
    let tokens = tokenize(input).tokens;
    suggest(input.chars().count(), &tokens, input, &schema())
}

pub fn names(suggestions: &Suggestions) -> Vec<&str> {
    suggestions.items.iter().map(|s| s.name.as_str()).collect()
}

/// `(kind, value)` pairs without the trailing EOF.
pub fn kinds_and_values(input: &str) -> Vec<(TokenKind, String)> {
    tokenize(input)
        .tokens
        .into_iter()
        .filter(|t| t.kind != TokenKind::Eof)
        .map(|t| (t.kind, t.value))
        .collect()
}
