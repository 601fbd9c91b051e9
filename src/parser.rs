use std::fmt;

use serde::Serialize;
use tracing::{debug, trace};

use crate::ast::Node;
use crate::lexer::NEGATABLE_OPERATORS;
use crate::token::{Location, Token, TokenKind};

/// Classifies a parser error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ParseErrorKind {
    /// Token that cannot appear here, shown as `value (kind)`.
    UnexpectedToken(String),
    /// Ran out of tokens while an expression was still open.
    UnexpectedEnd,
    /// `.` not followed by a property name.
    ExpectedName,
    /// Number token that is not a valid integer.
    InvalidInteger(String),
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedToken(t) => write!(f, "unexpected token {t}"),
            Self::UnexpectedEnd => write!(f, "unexpected end of expression"),
            Self::ExpectedName => write!(f, "expected name"),
            Self::InvalidInteger(t) => write!(f, "invalid integer literal: {t}"),
        }
    }
}

/// Error produced during parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[error("{kind} at line {}, column {}", location.line, location.column)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub location: Location,
}

/// Grammar production in progress, recorded for error recovery.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "key", rename_all = "lowercase")]
pub enum Frame {
    /// Parsing the right-hand side of `left operator ...`.
    Binary {
        left: Node,
        operator: String,
        negate: bool,
    },
    /// Parsing the operand of a prefix operator.
    Unary { operator: String },
    /// Inside `( ... )`.
    Brackets,
    /// Parsing the postfix chain of an identifier or string.
    Secondary,
}

/// Result of a collecting parse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parsed {
    /// Best-effort tree. `None` only when no operand could be built.
    pub ast: Option<Node>,
    pub error: Option<ParseError>,
}

impl Parsed {
    pub fn into_result(self) -> Result<Node, ParseError> {
        match (self.ast, self.error) {
            (Some(ast), None) => Ok(ast),
            (_, Some(err)) => Err(err),
            (None, None) => Err(ParseError {
                kind: ParseErrorKind::UnexpectedEnd,
                location: Location::new(1, 0),
            }),
        }
    }
}

/// Failure of a speculative parse: the error and the context stack as
/// it stood when the error was raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recovery {
    pub error: ParseError,
    pub frames: Vec<Frame>,
}

impl Recovery {
    /// Innermost production at the failure point.
    #[must_use]
    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }
}

/// Parse a token stream into an expression tree.
///
/// Parsing continues past recoverable errors; only the first error is
/// reported.
#[must_use]
pub fn parse(tokens: &[Token]) -> Parsed {
    let mut parser = Parser::new(tokens, Mode::Collect);
    let ast = parser.parse().ok();
    debug!(error = ?parser.error, "parsed expression");
    Parsed {
        ast,
        error: parser.error,
    }
}

/// Parse a token stream, stopping at the first error.
///
/// # Errors
///
/// Returns the error together with the recovery context stack at the
/// point of failure.
pub fn parse_speculative(tokens: &[Token]) -> Result<Node, Recovery> {
    let mut parser = Parser::new(tokens, Mode::Abort);
    match parser.parse() {
        Ok(node) if parser.error.is_none() => Ok(node),
        _ => {
            let error = parser.error.unwrap_or(ParseError {
                kind: ParseErrorKind::UnexpectedEnd,
                location: Location::new(1, 0),
            });
            trace!(%error, frames = parser.frames.len(), "speculative parse stopped");
            Err(Recovery {
                error,
                frames: parser.frames,
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Record the first error and keep building.
    Collect,
    /// Stop at the first error.
    Abort,
}

/// Marker for an unwinding parse; the error itself lives in
/// `Parser::error`.
#[derive(Debug)]
struct Interrupt;

type Step<T> = Result<T, Interrupt>;

/// Binding power of a binary operator, if `op` is one. All binary
/// operators are left-associative.
#[must_use]
pub fn binary_precedence(op: &str) -> Option<u16> {
    let precedence = match op {
        "|" => 0,
        "or" | "||" => 10,
        "and" | "&&" => 15,
        "==" | "!=" | "<" | ">" | ">=" | "<=" | "in" | "matches" | "contains" | "startsWith"
        | "endsWith" => 20,
        ".." => 25,
        "+" | "-" => 30,
        "*" | "/" | "%" => 60,
        "**" | "^" => 100,
        "??" => 500,
        _ => return None,
    };
    Some(precedence)
}

/// Binding power of a prefix operator, if `op` is one.
#[must_use]
pub fn unary_precedence(op: &str) -> Option<u16> {
    match op {
        "not" | "!" => Some(50),
        "-" | "+" => Some(90),
        _ => None,
    }
}

/// Operators that chain: `a < b < c` means `a < b && b < c`.
#[must_use]
pub fn is_comparison(op: &str) -> bool {
    matches!(op, "<" | ">" | "<=" | ">=")
}

fn is_negatable(token: &Token) -> bool {
    token.kind == TokenKind::Operator && NEGATABLE_OPERATORS.contains(&token.value.as_str())
}

fn describe(token: &Token) -> String {
    format!("{} ({})", token.value, token.kind.name())
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    mode: Mode,
    error: Option<ParseError>,
    frames: Vec<Frame>,
}

impl<'a> Parser<'a> {
    const fn new(tokens: &'a [Token], mode: Mode) -> Self {
        Self {
            tokens,
            pos: 0,
            mode,
            error: None,
            frames: Vec::new(),
        }
    }

    fn parse(&mut self) -> Step<Node> {
        let Some(first) = self
            .tokens
            .iter()
            .position(|t| t.kind != TokenKind::WhiteSpace)
        else {
            return Err(self.fail(ParseErrorKind::UnexpectedEnd, Location::new(1, 0)));
        };
        self.pos = first;

        let node = self.parse_expression(0)?;
        let current = self.current();
        if !matches!(current.kind, TokenKind::Eof | TokenKind::Caret) {
            self.error(
                ParseErrorKind::UnexpectedToken(describe(current)),
                current.location,
            )?;
        }
        Ok(node)
    }

    // -- token cursor --

    fn current(&self) -> &'a Token {
        let tokens = self.tokens;
        &tokens[self.pos]
    }

    /// Advance to the next non-whitespace token. Running off the end
    /// leaves the cursor on the last token.
    fn next(&mut self) -> Step<()> {
        loop {
            if self.pos + 1 >= self.tokens.len() {
                let location = self.current().location;
                return self.error(ParseErrorKind::UnexpectedEnd, location);
            }
            self.pos += 1;
            if self.current().kind != TokenKind::WhiteSpace {
                return Ok(());
            }
        }
    }

    fn expect(&mut self, kind: TokenKind, value: &str) -> Step<()> {
        let current = self.current();
        if current.is(kind, value) {
            return self.next();
        }
        self.error(
            ParseErrorKind::UnexpectedToken(describe(current)),
            current.location,
        )
    }

    // -- diagnostics --

    fn record(&mut self, kind: ParseErrorKind, location: Location) {
        if self.error.is_none() {
            self.error = Some(ParseError { kind, location });
        }
    }

    /// Recoverable error: interrupts only in abort mode.
    fn error(&mut self, kind: ParseErrorKind, location: Location) -> Step<()> {
        self.record(kind, location);
        match self.mode {
            Mode::Collect => Ok(()),
            Mode::Abort => Err(Interrupt),
        }
    }

    /// Error that leaves no node to build.
    fn fail(&mut self, kind: ParseErrorKind, location: Location) -> Interrupt {
        self.record(kind, location);
        Interrupt
    }

    // -- context --

    fn enter(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    fn exit(&mut self) {
        self.frames.pop();
    }

    // -- grammar --

    fn parse_expression(&mut self, precedence: u16) -> Step<Node> {
        let mut left = self.parse_primary()?;

        while self.error.is_none() {
            let mut op_token = self.current();
            if op_token.kind != TokenKind::Operator {
                break;
            }

            let mut negation = None;
            if op_token.value == "not" {
                let before_not = self.pos;
                self.next()?;
                let suffix = self.current();
                if !is_negatable(suffix) {
                    self.error(
                        ParseErrorKind::UnexpectedToken(describe(suffix)),
                        suffix.location,
                    )?;
                    break;
                }
                if binary_precedence(&suffix.value).is_some_and(|p| p >= precedence) {
                    negation = Some(op_token.location);
                    op_token = suffix;
                } else {
                    // Leave `not` for an outer, lower-precedence level.
                    self.pos = before_not;
                    break;
                }
            }

            let Some(op_precedence) = binary_precedence(&op_token.value) else {
                break;
            };
            if op_precedence < precedence {
                break;
            }

            self.enter(Frame::Binary {
                left: left.clone(),
                operator: op_token.value.clone(),
                negate: negation.is_some(),
            });
            self.next()?;

            if is_comparison(&op_token.value) {
                left = self.parse_comparison(left, op_token, op_precedence)?;
                self.exit();
                continue;
            }

            let right = self.parse_expression(op_precedence + 1)?;
            left = Node::binary(op_token.value.clone(), left, right, op_token.location);
            if let Some(location) = negation {
                left = Node::unary("not", left, location);
            }
            self.exit();
        }

        Ok(left)
    }

    /// unary | ( expression ) | secondary
    fn parse_primary(&mut self) -> Step<Node> {
        let token = self.current();

        if token.kind == TokenKind::Operator {
            if let Some(precedence) = unary_precedence(&token.value) {
                self.enter(Frame::Unary {
                    operator: token.value.clone(),
                });
                self.next()?;
                let operand = self.parse_expression(precedence)?;
                let unary = Node::unary(token.value.clone(), operand, token.location);
                let node = self.parse_postfix(unary)?;
                self.exit();
                return Ok(node);
            }
        }

        if token.is(TokenKind::Bracket, "(") {
            self.enter(Frame::Brackets);
            self.next()?;
            let expr = self.parse_expression(0)?;
            self.expect(TokenKind::Bracket, ")")?;
            self.exit();
            return self.parse_postfix(expr);
        }

        self.parse_secondary()
    }

    /// identifier | number | string, with member access
    fn parse_secondary(&mut self) -> Step<Node> {
        let token = self.current();

        let node = match token.kind {
            TokenKind::Identifier => {
                self.next()?;
                match token.value.as_str() {
                    "true" => return Ok(Node::bool(true, token.location)),
                    "false" => return Ok(Node::bool(false, token.location)),
                    "nil" => return Ok(Node::nil(token.location)),
                    name => Node::identifier(name, token.location),
                }
            }
            TokenKind::Number => {
                self.next()?;
                let value = match parse_integer(&token.value) {
                    Some(value) => value,
                    None => {
                        self.error(
                            ParseErrorKind::InvalidInteger(token.value.clone()),
                            token.location,
                        )?;
                        0
                    }
                };
                return Ok(Node::integer(value, token.location));
            }
            TokenKind::String => {
                self.next()?;
                Node::string(token.value.clone(), token.location)
            }
            _ => {
                return Err(self.fail(
                    ParseErrorKind::UnexpectedToken(describe(token)),
                    token.location,
                ));
            }
        };

        self.enter(Frame::Secondary);
        let node = self.parse_postfix(node)?;
        self.exit();
        Ok(node)
    }

    fn parse_postfix(&mut self, mut node: Node) -> Step<Node> {
        while self.error.is_none() && self.current().is(TokenKind::Operator, ".") {
            self.enter(Frame::Binary {
                left: node.clone(),
                operator: ".".to_string(),
                negate: false,
            });
            self.next()?;

            let property = self.current();
            self.next()?;

            // Operator tokens double as names so that keyword-shaped
            // fields like `a.in` stay addressable.
            if !matches!(property.kind, TokenKind::Identifier | TokenKind::Operator) {
                self.error(ParseErrorKind::ExpectedName, property.location)?;
            }

            let name = Node::identifier(property.value.clone(), property.location);
            node = Node::member(node, name, property.location);
            self.exit();
        }
        Ok(node)
    }

    fn parse_comparison(&mut self, mut left: Node, mut token: &'a Token, precedence: u16) -> Step<Node> {
        let mut root: Option<Node> = None;
        loop {
            let comparator = self.parse_expression(precedence + 1)?;
            let comparison = Node::binary(
                token.value.clone(),
                left,
                comparator.clone(),
                token.location,
            );
            root = Some(match root {
                None => comparison,
                Some(prev) => Node::binary("&&", prev, comparison, token.location),
            });

            left = comparator;
            token = self.current();
            if !(token.kind == TokenKind::Operator
                && is_comparison(&token.value)
                && self.error.is_none())
            {
                break;
            }

            if let Some(Frame::Binary {
                left: frame_left,
                operator,
                ..
            }) = self.frames.last_mut()
            {
                frame_left.clone_from(&left);
                operator.clone_from(&token.value);
            }
            self.next()?;
        }
        Ok(root.unwrap_or(left))
    }
}

/// Parse an integer literal, honoring `_` separators and base prefixes.
///
/// A decimal literal keeps only its leading digits, so `2.5` is `2` and
/// `1e3` is `1`. `None` means the value does not fit an `i64`.
fn parse_integer(text: &str) -> Option<i64> {
    let digits: String = text.chars().filter(|&c| c != '_').collect();
    let lower = digits.to_ascii_lowercase();
    if let Some(rest) = lower.strip_prefix("0x") {
        return i64::from_str_radix(rest, 16).ok();
    }
    if let Some(rest) = lower.strip_prefix("0o") {
        return i64::from_str_radix(rest, 8).ok();
    }
    if let Some(rest) = lower.strip_prefix("0b") {
        return i64::from_str_radix(rest, 2).ok();
    }
    let end = lower
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(lower.len());
    match &lower[..end] {
        "" => Some(0),
        whole => whole.parse().ok(),
    }
}
