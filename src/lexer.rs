use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::token::{Location, Token, TokenKind};

/// Words that lex as operators rather than identifiers.
const KEYWORD_OPERATORS: &[&str] = &[
    "and",
    "or",
    "in",
    "matches",
    "contains",
    "startsWith",
    "endsWith",
    "let",
];

/// Operators that may follow `not` to form a negated relation.
pub(crate) const NEGATABLE_OPERATORS: &[&str] =
    &["in", "matches", "contains", "startsWith", "endsWith"];

const DECIMAL_DIGITS: &str = "0123456789_";
const HEX_DIGITS: &str = "0123456789abcdefABCDEF_";
const OCTAL_DIGITS: &str = "01234567_";
const BINARY_DIGITS: &str = "01_";

/// Classifies a lexer error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LexErrorKind {
    /// Character that cannot start any token.
    UnrecognizedCharacter(char),
    /// Number followed by a word character, e.g. `12ab`.
    BadNumberSyntax(String),
    /// String literal without its closing quote.
    UnterminatedLiteral,
    /// Unknown or malformed backslash escape.
    InvalidEscape,
    /// `/*` comment without `*/`.
    UnclosedComment,
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedCharacter(ch) => {
                write!(f, "unrecognized character: {ch}")
            }
            Self::BadNumberSyntax(word) => write!(f, "bad number syntax: {word}"),
            Self::UnterminatedLiteral => write!(f, "literal not terminated"),
            Self::InvalidEscape => write!(f, "invalid char escape"),
            Self::UnclosedComment => write!(f, "unclosed comment"),
        }
    }
}

/// Error produced during lexing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[error("{kind} at line {}, column {}", location.line, location.column)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub location: Location,
}

/// Result of a lexer pass: the best-effort token stream plus the
/// first error encountered, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub error: Option<LexError>,
}

impl Lexed {
    /// Discard the best-effort tokens when lexing failed.
    pub fn into_result(self) -> Result<Vec<Token>, LexError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.tokens),
        }
    }
}

/// Tokenize an expression into a sequence of tokens.
///
/// Never fails: lexing continues past errors and the stream always
/// ends with an EOF token. Only the first error is reported.
#[must_use]
pub fn tokenize(input: &str) -> Lexed {
    Lexer::new(input).run()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Root,
    Number,
    Dot,
    Identifier,
    Not,
    QuestionMark,
    Slash,
    SingleLineComment,
    MultiLineComment,
    Pointer,
    Done,
}

/// Saved cursor for rewinds longer than one character.
#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    end: usize,
    loc: Location,
    prev: Location,
}

struct Lexer {
    input: Vec<char>,
    start: usize,
    end: usize,
    /// Width of the last `next()`, 0 at end of input or after a backup.
    width: usize,
    start_loc: Location,
    loc: Location,
    prev: Location,
    tokens: Vec<Token>,
    error: Option<LexError>,
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

impl Lexer {
    fn new(input: &str) -> Self {
        let origin = Location::new(1, 0);
        Self {
            input: input.chars().collect(),
            start: 0,
            end: 0,
            width: 0,
            start_loc: origin,
            loc: origin,
            prev: origin,
            tokens: Vec::new(),
            error: None,
        }
    }

    fn run(mut self) -> Lexed {
        let mut state = State::Root;
        while state != State::Done {
            state = self.step(state);
        }
        debug!(
            tokens = self.tokens.len(),
            error = ?self.error,
            "tokenized expression"
        );
        Lexed {
            tokens: self.tokens,
            error: self.error,
        }
    }

    fn step(&mut self, state: State) -> State {
        match state {
            State::Root => self.lex_root(),
            State::Number => self.lex_number(),
            State::Dot => self.lex_dot(),
            State::Identifier => self.lex_identifier(),
            State::Not => self.lex_not(),
            State::QuestionMark => self.lex_question_mark(),
            State::Slash => self.lex_slash(),
            State::SingleLineComment => self.lex_single_line_comment(),
            State::MultiLineComment => self.lex_multi_line_comment(),
            State::Pointer => self.lex_pointer(),
            State::Done => State::Done,
        }
    }

    // -- cursor --

    fn next(&mut self) -> Option<char> {
        let Some(&ch) = self.input.get(self.end) else {
            self.width = 0;
            return None;
        };
        self.width = 1;
        self.end += 1;
        self.prev = self.loc;
        if ch == '\n' {
            self.loc.line += 1;
            self.loc.column = 0;
        } else {
            self.loc.column += 1;
        }
        Some(ch)
    }

    /// Step back over the last character returned by `next()`. Only
    /// one step is remembered.
    fn backup(&mut self) {
        if self.width > 0 {
            self.end -= self.width;
            self.loc = self.prev;
            self.width = 0;
        }
    }

    fn peek(&mut self) -> Option<char> {
        let ch = self.next();
        self.backup();
        ch
    }

    fn accept(&mut self, valid: &str) -> bool {
        match self.next() {
            Some(ch) if valid.contains(ch) => true,
            _ => {
                self.backup();
                false
            }
        }
    }

    fn accept_run(&mut self, valid: &str) {
        while self.accept(valid) {}
    }

    fn accept_while(&mut self, pred: impl Fn(char) -> bool) {
        loop {
            match self.next() {
                Some(ch) if pred(ch) => {}
                _ => {
                    self.backup();
                    break;
                }
            }
        }
    }

    const fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            end: self.end,
            loc: self.loc,
            prev: self.prev,
        }
    }

    const fn restore(&mut self, cp: Checkpoint) {
        self.end = cp.end;
        self.loc = cp.loc;
        self.prev = cp.prev;
        self.width = 0;
    }

    fn word(&self) -> String {
        self.input[self.start..self.end].iter().collect()
    }

    // -- output --

    fn emit(&mut self, kind: TokenKind) {
        let value = self.word();
        self.emit_value(kind, value);
    }

    fn emit_value(&mut self, kind: TokenKind, value: String) {
        self.tokens.push(Token {
            location: self.start_loc,
            kind,
            value,
            width: self.end - self.start,
            error: None,
        });
        self.ignore();
    }

    fn emit_eof(&mut self) {
        self.tokens.push(Token::new(TokenKind::Eof, "", self.loc));
        self.ignore();
    }

    const fn ignore(&mut self) {
        self.start = self.end;
        self.start_loc = self.loc;
    }

    fn error(&mut self, kind: LexErrorKind) {
        self.error_at(kind, self.start_loc);
    }

    fn error_at(&mut self, kind: LexErrorKind, location: Location) {
        if self.error.is_none() {
            self.error = Some(LexError { kind, location });
        }
    }

    // -- states --

    fn lex_root(&mut self) -> State {
        let Some(ch) = self.next() else {
            self.emit_eof();
            return State::Done;
        };

        match ch {
            c if c.is_whitespace() => {
                self.accept_while(char::is_whitespace);
                self.emit(TokenKind::WhiteSpace);
            }
            '\'' | '"' => self.scan_string(ch),
            '`' => self.scan_raw_string(),
            '0'..='9' => {
                self.backup();
                return State::Number;
            }
            '?' => return State::QuestionMark,
            '/' => return State::Slash,
            '#' => return State::Pointer,
            '|' => {
                self.accept("|");
                self.emit(TokenKind::Operator);
            }
            ':' => {
                self.accept(":");
                self.emit(TokenKind::Operator);
            }
            '(' | '[' | '{' | ')' | ']' | '}' => self.emit(TokenKind::Bracket),
            ',' | ';' | '%' | '+' | '-' | '^' => self.emit(TokenKind::Operator),
            '&' | '!' | '=' | '*' | '<' | '>' => {
                self.accept("&=*");
                self.emit(TokenKind::Operator);
            }
            '.' => {
                self.backup();
                return State::Dot;
            }
            c if is_word_char(c) => {
                self.backup();
                return State::Identifier;
            }
            c => {
                self.error(LexErrorKind::UnrecognizedCharacter(c));
                self.ignore();
            }
        }
        State::Root
    }

    fn lex_number(&mut self) -> State {
        if !self.scan_number() {
            let word = self.word();
            self.error(LexErrorKind::BadNumberSyntax(word));
        }
        self.emit(TokenKind::Number);
        State::Root
    }

    fn scan_number(&mut self) -> bool {
        let mut digits = DECIMAL_DIGITS;
        if self.accept("0") {
            // A leading 0 alone does not mean octal.
            if self.accept("xX") {
                digits = HEX_DIGITS;
            } else if self.accept("oO") {
                digits = OCTAL_DIGITS;
            } else if self.accept("bB") {
                digits = BINARY_DIGITS;
            }
        }
        self.accept_run(digits);

        let before_dot = self.checkpoint();
        if self.accept(".") {
            // `1..2` is a range, leave both dots to the operator.
            if self.peek() == Some('.') {
                self.restore(before_dot);
                return true;
            }
            self.accept_run(digits);
        }
        if self.accept("eE") {
            self.accept("+-");
            self.accept_run(digits);
        }

        match self.peek() {
            Some(ch) if is_word_char(ch) => {
                self.next();
                false
            }
            _ => true,
        }
    }

    fn lex_dot(&mut self) -> State {
        self.next();
        if self.accept("0123456789") {
            self.backup();
            return State::Number;
        }
        self.accept(".");
        self.emit(TokenKind::Operator);
        State::Root
    }

    fn lex_identifier(&mut self) -> State {
        self.accept_while(is_word_char);
        let word = self.word();
        if word == "not" {
            return State::Not;
        }
        if KEYWORD_OPERATORS.contains(&word.as_str()) {
            self.emit(TokenKind::Operator);
        } else {
            self.emit(TokenKind::Identifier);
        }
        State::Root
    }

    fn lex_not(&mut self) -> State {
        self.emit(TokenKind::Operator);

        self.accept_while(char::is_whitespace);
        if self.end > self.start {
            self.emit(TokenKind::WhiteSpace);
        }

        let after_space = self.checkpoint();
        self.accept_while(is_word_char);
        if NEGATABLE_OPERATORS.contains(&self.word().as_str()) {
            self.emit(TokenKind::Operator);
        } else {
            self.restore(after_space);
        }
        State::Root
    }

    fn lex_question_mark(&mut self) -> State {
        self.accept(".?");
        self.emit(TokenKind::Operator);
        State::Root
    }

    fn lex_slash(&mut self) -> State {
        if self.accept("/") {
            return State::SingleLineComment;
        }
        if self.accept("*") {
            return State::MultiLineComment;
        }
        self.emit(TokenKind::Operator);
        State::Root
    }

    fn lex_single_line_comment(&mut self) -> State {
        loop {
            match self.next() {
                None => break,
                Some('\n') => {
                    self.backup();
                    break;
                }
                Some(_) => {}
            }
        }
        self.ignore();
        State::Root
    }

    fn lex_multi_line_comment(&mut self) -> State {
        loop {
            match self.next() {
                None => {
                    self.error(LexErrorKind::UnclosedComment);
                    break;
                }
                Some('*') if self.accept("/") => break,
                Some(_) => {}
            }
        }
        self.ignore();
        State::Root
    }

    fn lex_pointer(&mut self) -> State {
        self.accept("#");
        self.emit(TokenKind::Operator);
        self.accept_while(is_word_char);
        if self.end > self.start {
            self.emit(TokenKind::Identifier);
        }
        State::Root
    }

    // -- literals --

    fn scan_string(&mut self, quote: char) {
        let mut value = String::new();
        loop {
            match self.next() {
                None => {
                    self.error(LexErrorKind::UnterminatedLiteral);
                    break;
                }
                Some('\n') => {
                    self.backup();
                    self.error(LexErrorKind::UnterminatedLiteral);
                    break;
                }
                Some('\\') => self.scan_escape(quote, &mut value),
                Some(ch) if ch == quote => break,
                Some(ch) => value.push(ch),
            }
        }
        self.emit_value(TokenKind::String, value);
    }

    fn scan_escape(&mut self, quote: char, value: &mut String) {
        let Some(ch) = self.next() else {
            self.error_at(LexErrorKind::InvalidEscape, self.loc);
            return;
        };
        match ch {
            'a' => value.push('\u{07}'),
            'b' => value.push('\u{08}'),
            'f' => value.push('\u{0C}'),
            'n' => value.push('\n'),
            'r' => value.push('\r'),
            't' => value.push('\t'),
            'v' => value.push('\u{0B}'),
            '\\' => value.push('\\'),
            c if c == quote => value.push(c),
            '0'..='7' => {
                self.backup();
                self.scan_code_point(8, 3, false, value);
            }
            'x' => self.scan_code_point(16, 2, true, value),
            'u' => self.scan_code_point(16, 4, true, value),
            'U' => self.scan_code_point(16, 8, true, value),
            _ => self.error_at(LexErrorKind::InvalidEscape, self.prev),
        }
    }

    /// Read up to `max` digits in `radix` (exactly `max` when `exact`)
    /// and push the resulting code point.
    fn scan_code_point(&mut self, radix: u32, max: usize, exact: bool, value: &mut String) {
        let mut code: u32 = 0;
        let mut count = 0;
        while count < max {
            let Some(digit) = self.peek().and_then(|ch| ch.to_digit(radix)) else {
                break;
            };
            self.next();
            code = code.wrapping_mul(radix).wrapping_add(digit);
            count += 1;
        }
        if count == 0 || (exact && count < max) {
            self.error_at(LexErrorKind::InvalidEscape, self.loc);
            return;
        }
        match char::from_u32(code) {
            Some(ch) => value.push(ch),
            None => self.error_at(LexErrorKind::InvalidEscape, self.loc),
        }
    }

    fn scan_raw_string(&mut self) {
        loop {
            match self.next() {
                None => {
                    self.error(LexErrorKind::UnterminatedLiteral);
                    let value = self.input[self.start + 1..self.end].iter().collect();
                    self.emit_value(TokenKind::String, value);
                    return;
                }
                Some('`') => break,
                Some(_) => {}
            }
        }
        let value = self.input[self.start + 1..self.end - 1].iter().collect();
        self.emit_value(TokenKind::String, value);
    }
}
