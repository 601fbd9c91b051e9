//! Expression lexer, parser, type checker, and completion engine.
//!
//! Filter editors use this to turn typed text such as
//! `status == "active" and meta.region startsWith "eu"` into a typed
//! syntax tree, report the first problem, and offer completions at
//! the cursor.
//!
//! # Quick start
//!
//! ## Check an expression against a schema
//!
//! ```
//! use exprkit::{Kind, Schema, TypeInfo, check_str, format};
//!
//! let schema = Schema::new()
//!     .variable_info("count", TypeInfo::int())
//!     .variable_info("name", TypeInfo::string());
//!
//! let ast = check_str("count>3 and name=='x'", &schema, Some(Kind::Bool)).unwrap();
//! assert_eq!(format(&ast), "count > 3 and name == \"x\"");
//!
//! let err = check_str("count", &schema, Some(Kind::Bool)).unwrap_err();
//! assert_eq!(err.to_string(), "Expected type bool at line 1, column 0");
//! ```
//!
//! ## Complete at the cursor
//!
//! ```
//! use exprkit::{Schema, Title, TypeInfo, suggest, tokenize};
//!
//! let schema = Schema::new().variable_info("count", TypeInfo::int());
//! let input = "cou";
//! let tokens = tokenize(input).tokens;
//! let found = suggest(3, &tokens, input, &schema).unwrap();
//! assert_eq!(found.title, Title::Fields);
//! assert_eq!(found.items[0].html, "<em>cou</em>nt");
//! assert_eq!(found.anchor_column, 0);
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod ast;
pub mod builder;
pub mod checker;
pub mod cursor;
pub mod diagnostic;
pub mod formatter;
pub mod fuzzy;
pub mod lexer;
pub mod parser;
pub mod schema;
pub mod suggest;
pub mod token;

use serde::Serialize;
use tracing::debug;

pub use ast::{Kind, Nature, Node, NodeKind};
pub use checker::{CheckError, CheckErrorKind, Checked, Checker, check};
pub use diagnostic::{Diagnostic, annotate_tokens};
pub use formatter::format;
pub use lexer::{LexError, LexErrorKind, Lexed, tokenize};
pub use parser::{Frame, ParseError, ParseErrorKind, Parsed, Recovery, parse, parse_speculative};
pub use schema::{Allow, OperatorInfo, Schema, SchemaError, TypeInfo};
pub use suggest::{Entry, Suggestion, Suggestions, Title, replacements_at, suggest, suggest_with_query};
pub use token::{Location, Token, TokenKind};

/// Unified error type covering every stage.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A lexer error.
    #[error("{0}")]
    Lex(#[from] LexError),
    /// A parser error.
    #[error("{0}")]
    Parse(#[from] ParseError),
    /// A type error.
    #[error("{0}")]
    Check(#[from] CheckError),
    /// The schema could not be loaded.
    #[error("{0}")]
    Schema(#[from] SchemaError),
}

/// Everything an editor needs after one keystroke.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    /// Tokens with diagnostics attached.
    pub tokens: Vec<Token>,
    /// Checked tree, when parsing produced one.
    pub ast: Option<Node>,
    pub nature: Option<Nature>,
    pub lex_error: Option<LexError>,
    pub parse_error: Option<ParseError>,
    pub check_error: Option<CheckError>,
}

impl Analysis {
    /// The diagnostic to show: the parse error, else the type error,
    /// else the lexer error.
    #[must_use]
    pub fn diagnostic(&self) -> Option<Diagnostic> {
        self.syntax_diagnostic()
            .or_else(|| self.lex_error.as_ref().map(Diagnostic::from))
    }

    fn syntax_diagnostic(&self) -> Option<Diagnostic> {
        self.parse_error
            .as_ref()
            .map(Diagnostic::from)
            .or_else(|| self.check_error.as_ref().map(Diagnostic::from))
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lex_error.is_none() && self.parse_error.is_none() && self.check_error.is_none()
    }
}

/// Run tokenize, parse and check over `source`, keeping the
/// best-effort output of every stage.
#[must_use]
pub fn analyze(source: &str, schema: &Schema, expected: Option<Kind>) -> Analysis {
    let Lexed { tokens, error: lex_error } = tokenize(source);
    let Parsed { ast, error: parse_error } = parse(&tokens);
    let (ast, nature, check_error) = match ast {
        Some(mut ast) => {
            let Checked { nature, error } = check(&mut ast, schema, expected);
            (Some(ast), nature, error)
        }
        None => (None, None, None),
    };

    let mut analysis = Analysis {
        tokens,
        ast,
        nature,
        lex_error,
        parse_error,
        check_error,
    };
    let syntax = analysis.syntax_diagnostic();
    let lexical = analysis.lex_error.as_ref().map(Diagnostic::from);
    annotate_tokens(&mut analysis.tokens, syntax.as_ref(), lexical.as_ref());
    debug!(valid = analysis.is_valid(), tokens = analysis.tokens.len(), "analyzed expression");
    analysis
}

/// Tokenize, parse and check `source`, failing on the first error.
pub fn check_str(source: &str, schema: &Schema, expected: Option<Kind>) -> Result<Node, Error> {
    let tokens = tokenize(source).into_result()?;
    let mut ast = parse(&tokens).into_result()?;
    check(&mut ast, schema, expected).into_result()?;
    Ok(ast)
}
