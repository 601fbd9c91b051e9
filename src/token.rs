use serde::Serialize;

/// Source location for error reporting.
///
/// `line` is 1-based, `column` is 0-based and counts scanned
/// characters on the current line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Variable or field name, also `true`, `false` and `nil`.
    #[serde(rename = "ident")]
    Identifier,
    /// Numeric literal, kept verbatim.
    Number,
    /// Quoted or backtick string; the token value is unescaped.
    String,
    /// Operator symbol or operator keyword (`and`, `in`, ...).
    Operator,
    /// One of `( [ { ) ] }`.
    Bracket,
    /// End of input.
    #[serde(rename = "EOF")]
    Eof,
    /// Run of whitespace characters.
    WhiteSpace,
    /// Synthetic end marker used by speculative parsing for suggestions.
    Caret,
    /// Reserved.
    #[serde(rename = "")]
    Unknown,
    /// Reserved.
    Punctuation,
    /// Reserved.
    Keyword,
    /// Reserved.
    Boolean,
    /// Reserved.
    Comment,
}

impl TokenKind {
    /// Name used in diagnostics and serialized output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Identifier => "ident",
            Self::Number => "number",
            Self::String => "string",
            Self::Operator => "operator",
            Self::Bracket => "bracket",
            Self::Eof => "EOF",
            Self::WhiteSpace => "whitespace",
            Self::Caret => "caret",
            Self::Unknown => "",
            Self::Punctuation => "punctuation",
            Self::Keyword => "keyword",
            Self::Boolean => "boolean",
            Self::Comment => "comment",
        }
    }

    /// CSS class suffix used by highlighters (`token-<class>`).
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Identifier => "ident",
            Self::Number => "number",
            Self::String => "string",
            Self::Operator => "operator",
            Self::Bracket => "bracket",
            Self::Eof => "eof",
            Self::WhiteSpace => "whitespace",
            Self::Caret => "caret",
            Self::Unknown | Self::Comment => "",
            Self::Punctuation => "punctuation",
            Self::Keyword => "keyword",
            Self::Boolean => "bool",
        }
    }
}

/// A single token with its kind, text, and source location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub location: Location,
    pub kind: TokenKind,
    pub value: String,
    /// Number of source characters the token spans. Differs from the
    /// value length for string literals.
    #[serde(skip)]
    pub width: usize,
    /// Diagnostic message attached after parsing or checking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Token {
    #[must_use]
    pub fn new(kind: TokenKind, value: impl Into<String>, location: Location) -> Self {
        let value = value.into();
        Self {
            location,
            kind,
            width: value.chars().count(),
            value,
            error: None,
        }
    }

    /// Column just past the last source character of the token.
    #[must_use]
    pub fn end_column(&self) -> usize {
        self.location.column + self.width
    }

    #[must_use]
    pub fn is(&self, kind: TokenKind, value: &str) -> bool {
        self.kind == kind && self.value == value
    }
}
