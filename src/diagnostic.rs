use serde::Serialize;

use crate::checker::CheckError;
use crate::lexer::LexError;
use crate::parser::ParseError;
use crate::token::{Location, Token};

/// Stage-independent view of an error, as shown next to the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    #[serde(rename = "loc")]
    pub location: Location,
    pub message: String,
}

impl From<&LexError> for Diagnostic {
    fn from(err: &LexError) -> Self {
        Self {
            location: err.location,
            message: err.kind.to_string(),
        }
    }
}

impl From<&ParseError> for Diagnostic {
    fn from(err: &ParseError) -> Self {
        Self {
            location: err.location,
            message: err.kind.to_string(),
        }
    }
}

impl From<&CheckError> for Diagnostic {
    fn from(err: &CheckError) -> Self {
        Self {
            location: err.location,
            message: err.kind.to_string(),
        }
    }
}

fn attach(token: &mut Token, diagnostic: Option<&Diagnostic>, strict: bool) {
    let Some(d) = diagnostic else {
        return;
    };
    let column = token.location.column;
    let hit = if strict {
        d.location.column == column
    } else {
        d.location.column >= column
    };
    if hit {
        token.error = Some(d.message.clone());
    }
}

/// Copy diagnostics onto the tokens they point at.
///
/// Each diagnostic lands on every token starting at its column. The
/// last token also takes any diagnostic at or past its column, so
/// errors at the end of input stay visible. `lexical` is applied after
/// `syntax` and wins when both hit the same token.
pub fn annotate_tokens(tokens: &mut [Token], syntax: Option<&Diagnostic>, lexical: Option<&Diagnostic>) {
    for token in tokens.iter_mut() {
        attach(token, syntax, true);
        attach(token, lexical, true);
    }
    if let Some(last) = tokens.last_mut() {
        attach(last, syntax, false);
        attach(last, lexical, false);
    }
}
