//! Locating tokens and partial words around a cursor column.

use std::sync::LazyLock;

use regex::Regex;

use crate::token::{Token, TokenKind};

/// Trailing partial word before the cursor: the run of characters after
/// the last space, `(` or `.`.
static QUERY_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(((^|\()\s*)|([^\s]\s+)|\.)(?<query>[^\s().]*)$").ok());

#[must_use]
pub const fn is_open_bracket(c: char) -> bool {
    matches!(c, '(' | '[' | '{')
}

#[must_use]
pub const fn is_closed_bracket(c: char) -> bool {
    matches!(c, ')' | ']' | '}')
}

/// Counterpart of a bracket character.
#[must_use]
pub const fn matching_bracket(c: char) -> Option<char> {
    match c {
        '(' => Some(')'),
        '[' => Some(']'),
        '{' => Some('}'),
        ')' => Some('('),
        ']' => Some('['),
        '}' => Some('{'),
        _ => None,
    }
}

fn is_word(token: &Token) -> bool {
    !matches!(
        token.kind,
        TokenKind::Eof | TokenKind::WhiteSpace | TokenKind::Bracket
    )
}

fn is_member_operator(token: &Token) -> bool {
    token.is(TokenKind::Operator, ".")
}

/// Token spanning `column`, inclusive of both ends. Where two tokens
/// touch, a word token wins over whitespace, brackets and EOF.
#[must_use]
pub fn find_token_by_position(tokens: &[Token], column: usize) -> Option<&Token> {
    let mut found: Option<&Token> = None;
    for token in tokens {
        if (token.location.column..=token.end_column()).contains(&column)
            && (found.is_none() || is_word(token))
        {
            found = Some(token);
        }
    }
    found
}

/// Tokens on either side of `column`: the one ending at or containing
/// it, and the one starting exactly there.
#[must_use]
pub fn find_bounding_tokens(tokens: &[Token], column: usize) -> (Option<&Token>, Option<&Token>) {
    let mut lo = None;
    for token in tokens {
        if token.location.column == column {
            return (lo, Some(token));
        }
        if token.location.column < column && column <= token.end_column() {
            lo = Some(token);
        }
    }
    (lo, None)
}

/// Prefix of `tokens` that lies fully before the cursor.
///
/// A token ending exactly at the cursor is the word being typed and is
/// excluded, except brackets and the member `.` which are complete as
/// soon as they are typed.
#[must_use]
pub fn find_tokens_until(tokens: &[Token], column: usize) -> &[Token] {
    let end = tokens
        .iter()
        .position(|token| {
            let closed = token.kind == TokenKind::Bracket || is_member_operator(token);
            let keep = if closed {
                token.end_column() <= column
            } else {
                token.end_column() < column
            };
            !keep
        })
        .unwrap_or(tokens.len());
    &tokens[..end]
}

/// Partial word ending at `column` in `input`, with the column it
/// starts at.
#[must_use]
pub fn partial_word(input: &str, column: usize) -> (String, usize) {
    let before: String = input.chars().take(column).collect();
    let query = QUERY_PATTERN
        .as_ref()
        .and_then(|re| re.captures(&before))
        .and_then(|caps| caps.name("query"))
        .map_or_else(String::new, |m| m.as_str().to_string());
    let start = column.saturating_sub(query.chars().count());
    (query, start)
}

/// A raw field split into free-text search and expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitInput<'a> {
    pub search: &'a str,
    /// Whether the separator is present.
    pub active: bool,
    pub expression: &'a str,
    /// Char offset of the expression within the raw field.
    pub starts_at: usize,
}

/// Split `raw` at the first `separator`. An empty separator makes the
/// whole field an expression.
#[must_use]
pub fn split_input<'a>(raw: &'a str, separator: &str) -> SplitInput<'a> {
    if separator.is_empty() {
        return SplitInput {
            search: "",
            active: true,
            expression: raw,
            starts_at: 0,
        };
    }
    match raw.split_once(separator) {
        Some((search, expression)) => SplitInput {
            search,
            active: true,
            expression,
            starts_at: search.chars().count() + separator.chars().count(),
        },
        None => SplitInput {
            search: raw,
            active: false,
            expression: "",
            starts_at: raw.chars().count() + separator.chars().count(),
        },
    }
}
