//! Completion candidates at a cursor position.
//!
//! The input before the cursor is re-parsed with a synthetic caret
//! token at its end. A clean parse means a complete operand precedes
//! the cursor, so operators come next. A failed parse leaves the
//! recovery stack pointing at the production that was in progress.
//!
//! ```
//! use exprkit::{Schema, Title, TypeInfo, suggest, tokenize};
//!
//! let schema = Schema::new()
//!     .variable_info("status", TypeInfo::string().values(["on", "off"]));
//! let input = "status == ";
//! let tokens = tokenize(input).tokens;
//! let found = suggest(input.len(), &tokens, input, &schema).unwrap();
//! assert_eq!(found.title, Title::Values);
//! assert_eq!(found.items[0].name, "\"off\"");
//! ```

use std::fmt;

use serde::Serialize;
use tracing::{debug, trace};

use crate::ast::Kind;
use crate::checker::{check, info_of};
use crate::cursor::{find_token_by_position, find_tokens_until, partial_word};
use crate::fuzzy;
use crate::parser::{Frame, parse_speculative};
use crate::schema::{Allow, OperatorInfo, Schema, TypeInfo};
use crate::token::{Location, Token, TokenKind};

/// What kind of completion is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Title {
    /// Schema variables.
    Fields,
    Operators,
    /// Enumerated values of the left operand.
    Values,
    /// Fields of a struct-typed left operand.
    #[serde(rename = "json fields")]
    JsonFields,
    /// A date picker; carries no items.
    Date,
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fields => "fields",
            Self::Operators => "operators",
            Self::Values => "values",
            Self::JsonFields => "json fields",
            Self::Date => "date",
        })
    }
}

/// Schema entry a suggestion was drawn from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Entry {
    Variable(TypeInfo),
    Operator(OperatorInfo),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub name: String,
    /// Name with matched characters wrapped in `<em>`.
    pub html: String,
    #[serde(rename = "type")]
    pub entry: Entry,
}

/// A ranked completion list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestions {
    pub title: Title,
    pub items: Vec<Suggestion>,
    /// Column where an accepted item should be inserted.
    pub anchor_column: usize,
}

/// Suggest completions at `cursor`, using the partial word before it as
/// the query.
#[must_use]
pub fn suggest(cursor: usize, tokens: &[Token], input: &str, schema: &Schema) -> Option<Suggestions> {
    let (query, _) = partial_word(input, cursor);
    suggest_with_query(cursor, tokens, &query, schema)
}

/// Suggest completions at `cursor` filtered by an explicit query.
#[must_use]
pub fn suggest_with_query(
    cursor: usize,
    tokens: &[Token],
    query: &str,
    schema: &Schema,
) -> Option<Suggestions> {
    let (title, items) = candidates(cursor, tokens, query, schema)?;
    let anchor_column = find_token_by_position(tokens, cursor).map_or_else(
            || cursor.saturating_sub(query.chars().count()),
            |t| t.location.column,
        );
    debug!(%title, items = items.len(), anchor_column, "suggestions");
    Some(Suggestions {
        title,
        items,
        anchor_column,
    })
}

/// Alternatives for the token under the cursor: any variable for a
/// name, any operator for an operator. Other positions fall back to
/// [`suggest`].
#[must_use]
pub fn replacements_at(
    cursor: usize,
    tokens: &[Token],
    input: &str,
    schema: &Schema,
) -> Option<Suggestions> {
    let selected = find_token_by_position(tokens, cursor)?;
    let (title, items) = match selected.kind {
        TokenKind::Identifier => (Title::Fields, variable_items("", schema)),
        TokenKind::Operator if selected.value == "not" => return None,
        TokenKind::Operator => (Title::Operators, operator_items("", schema, |_| true)),
        _ => return suggest(cursor, tokens, input, schema),
    };
    Some(Suggestions {
        title,
        items,
        anchor_column: selected.location.column,
    })
}

fn candidates(
    cursor: usize,
    tokens: &[Token],
    query: &str,
    schema: &Schema,
) -> Option<(Title, Vec<Suggestion>)> {
    let mut tokens: Vec<Token> = find_tokens_until(tokens, cursor)
        .iter()
        .filter(|t| t.kind != TokenKind::WhiteSpace)
        .cloned()
        .collect();
    let prev = tokens.last().cloned();
    tokens.push(Token::new(TokenKind::Caret, "", Location::new(1, cursor)));

    let recovery = match parse_speculative(&tokens) {
        Ok(_) => {
            trace!("speculative parse complete");
            return Some(match prev {
                None => (Title::Fields, variable_items(query, schema)),
                Some(prev) => operators_after(&prev, query, schema),
            });
        }
        Err(recovery) => recovery,
    };

    trace!(frame = ?recovery.top(), error = %recovery.error, "speculative parse recovered");
    match recovery.top() {
        Some(Frame::Binary { left, operator, .. }) => {
            let mut left = left.clone();
            check(&mut left, schema, Some(Kind::Bool));
            match info_of(&left) {
                Some(info) if info.is_date() => Some((Title::Date, Vec::new())),
                Some(info) if info.values.is_some() => Some((Title::Values, value_items(info))),
                Some(TypeInfo {
                    fields: Some(fields),
                    ..
                }) => {
                    let items = rank(query, fields.iter().map(|(k, v)| (k.as_str(), Entry::Variable(v.clone()))));
                    Some((Title::JsonFields, items))
                }
                _ if matches!(operator.as_str(), "and" | "or" | "&&" | "||") => {
                    Some((Title::Fields, variable_items(query, schema)))
                }
                _ => None,
            }
        }
        None | Some(Frame::Brackets)
            if prev.as_ref().is_none_or(|p| p.kind == TokenKind::Bracket) =>
        {
            Some((Title::Fields, variable_items(query, schema)))
        }
        _ => prev.map(|prev| operators_after(&prev, query, schema)),
    }
}

/// Operators that may follow `prev`, narrowed by the type of a
/// preceding variable.
fn operators_after(prev: &Token, query: &str, schema: &Schema) -> (Title, Vec<Suggestion>) {
    let variable = (prev.kind == TokenKind::Identifier)
        .then(|| schema.variable(&prev.value))
        .flatten();
    let items = match variable {
        Some(info) if info.kind == Kind::Int => operator_items(query, schema, |op| {
            matches!(op.allow, None | Some(Allow::Number))
        }),
        Some(info) if info.is_date() => operator_items(query, schema, |op| op.allow.is_none()),
        _ => operator_items(query, schema, |_| true),
    };
    (Title::Operators, items)
}

fn variable_items(query: &str, schema: &Schema) -> Vec<Suggestion> {
    rank(
        query,
        schema
            .variables
            .iter()
            .map(|(k, v)| (k.as_str(), Entry::Variable(v.clone()))),
    )
}

fn operator_items(query: &str, schema: &Schema, keep: impl Fn(&OperatorInfo) -> bool) -> Vec<Suggestion> {
    let mut items = rank(
        query,
        schema
            .operators
            .iter()
            .filter(|(_, op)| keep(op))
            .map(|(k, v)| (k.as_str(), Entry::Operator(v.clone()))),
    );
    if query.is_empty() {
        items.sort_by_key(|s| matches!(&s.entry, Entry::Operator(op) if op.allow == Some(Allow::String)));
    }
    items
}

/// Quoted, sorted values of `info`, each carrying `info` as its entry.
fn value_items(info: &TypeInfo) -> Vec<Suggestion> {
    let mut sorted: Vec<&String> = info.values.iter().flatten().collect();
    sorted.sort();
    sorted
        .into_iter()
        .map(|v| {
            let quoted = format!("\"{v}\"");
            Suggestion {
                name: quoted.clone(),
                html: quoted,
                entry: Entry::Variable(info.clone()),
            }
        })
        .collect()
}

fn rank<'a>(query: &str, candidates: impl IntoIterator<Item = (&'a str, Entry)>) -> Vec<Suggestion> {
    let candidates: Vec<(&str, Entry)> = candidates.into_iter().collect();
    fuzzy::rank(query, candidates.iter().map(|(name, _)| *name))
        .into_iter()
        .filter_map(|ranked| {
            let (_, entry) = candidates.iter().find(|(name, _)| *name == ranked.name)?;
            Some(Suggestion {
                name: ranked.name.to_string(),
                html: ranked.html,
                entry: entry.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn schema() -> Schema {
        Schema::new()
            .variable_info("count", TypeInfo::int())
            .variable_info("name", TypeInfo::string())
            .variable_info("status", TypeInfo::string().values(["on", "off"]))
            .variable_info("created", TypeInfo::date())
            .variable_info(
                "meta",
                TypeInfo::structure()
                    .field_info("region", TypeInfo::string())
                    .field_info("rack", TypeInfo::int()),
            )
    }

    fn at_end(input: &str) -> Option<Suggestions> {
        let tokens = tokenize(input).tokens;
        suggest(input.chars().count(), &tokens, input, &schema())
    }

    fn names(s: &Suggestions) -> Vec<&str> {
        s.items.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn empty_input_offers_fields() {
        let s = at_end("").expect("suggestions");
        assert_eq!(s.title, Title::Fields);
        assert_eq!(names(&s), vec!["count", "created", "meta", "name", "status"]);
        assert_eq!(s.anchor_column, 0);
    }

    #[test]
    fn after_operand_offers_operators() {
        let s = at_end("name ").expect("suggestions");
        assert_eq!(s.title, Title::Operators);
        assert_eq!(s.items.len(), schema().operators.len());
        let last = s.items.last().map(|i| i.name.as_str());
        assert!(matches!(last, Some("contains" | "endsWith" | "matches" | "startsWith")));
    }

    #[test]
    fn int_operand_hides_string_operators() {
        let s = at_end("count ").expect("suggestions");
        assert!(names(&s).contains(&"+"));
        assert!(!names(&s).contains(&"contains"));
        assert!(!names(&s).contains(&"and"));
    }

    #[test]
    fn date_operand_keeps_unrestricted_operators() {
        let s = at_end("created ").expect("suggestions");
        assert_eq!(names(&s), vec!["!=", "<", "<=", "==", ">", ">="]);
    }

    #[test]
    fn enum_values_after_comparison() {
        let s = at_end("status == ").expect("suggestions");
        assert_eq!(s.title, Title::Values);
        assert_eq!(names(&s), vec!["\"off\"", "\"on\""]);
        assert!(s.items.iter().all(|i| matches!(&i.entry, Entry::Variable(info) if info.values.is_some())));
        assert_eq!(s.anchor_column, 9);
    }

    #[test]
    fn value_entries_carry_their_type() {
        let info = TypeInfo::string().values(["b", "a"]);
        let items = value_items(&info);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "\"a\"");
        assert_eq!(items[1].html, "\"b\"");
        assert!(items.iter().all(|i| i.entry == Entry::Variable(info.clone())));
    }

    #[test]
    fn date_picker_after_comparison() {
        let s = at_end("created > ").expect("suggestions");
        assert_eq!(s.title, Title::Date);
        assert!(s.items.is_empty());
    }

    #[test]
    fn struct_fields_after_dot() {
        let s = at_end("meta.").expect("suggestions");
        assert_eq!(s.title, Title::JsonFields);
        assert_eq!(names(&s), vec!["rack", "region"]);
        assert_eq!(s.anchor_column, 4);
    }

    #[test]
    fn fields_after_connective() {
        let s = at_end("count > 1 and ").expect("suggestions");
        assert_eq!(s.title, Title::Fields);
    }

    #[test]
    fn plain_string_comparison_has_no_suggestions() {
        assert!(at_end("name == ").is_none());
    }

    #[test]
    fn fields_inside_brackets() {
        let s = at_end("(").expect("suggestions");
        assert_eq!(s.title, Title::Fields);
        assert_eq!(s.anchor_column, 0);
    }

    #[test]
    fn query_filters_and_highlights() {
        let s = at_end("count > 1 and sta").expect("suggestions");
        assert_eq!(s.title, Title::Fields);
        assert_eq!(s.items[0].name, "status");
        assert_eq!(s.items[0].html, "<em>sta</em>tus");
        assert_eq!(s.anchor_column, 14);
    }

    #[test]
    fn anchor_is_the_located_token() {
        // Whitespace spanning the cursor anchors at its own start.
        let s = at_end("name ").expect("suggestions");
        assert_eq!(s.anchor_column, 4);
        let s = at_end("count > 1 and (").expect("suggestions");
        assert_eq!(s.anchor_column, 14);
    }

    #[test]
    fn anchor_falls_back_to_query_start() {
        let s = suggest_with_query(3, &[], "me", &schema()).expect("suggestions");
        assert_eq!(s.title, Title::Fields);
        assert_eq!(s.anchor_column, 1);
    }

    #[test]
    fn explicit_query() {
        let tokens = tokenize("").tokens;
        let s = suggest_with_query(0, &tokens, "me", &schema()).expect("suggestions");
        assert_eq!(names(&s), vec!["meta", "name"]);
    }

    #[test]
    fn replacements_for_identifier_and_operator() {
        let input = "count == 1";
        let tokens = tokenize(input).tokens;
        let s = replacements_at(2, &tokens, input, &schema()).expect("fields");
        assert_eq!(s.title, Title::Fields);
        assert_eq!(s.anchor_column, 0);
        let s = replacements_at(7, &tokens, input, &schema()).expect("operators");
        assert_eq!(s.title, Title::Operators);
        assert_eq!(s.anchor_column, 6);
    }

    #[test]
    fn no_replacements_for_not() {
        let input = "not x";
        let tokens = tokenize(input).tokens;
        assert!(replacements_at(1, &tokens, input, &schema()).is_none());
    }
}
