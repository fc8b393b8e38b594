use crate::lang::symbols::NameError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Malformed token sequence or missing keyword/punctuation.
    Syntax,
    /// Redeclaration or undefined reference.
    Name,
}

/// A parsing error with source location.
///
/// `line` and `col` are 1-based positions taken from the token spans. For
/// errors at end of input the parser falls back to the last consumed token
/// so locations are never `0:0`.
#[derive(Debug, Clone, Error)]
#[error("{line}:{col}: {message}")]
pub struct ParserError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl ParserError {
    pub fn category(&self) -> &'static str {
        match self.kind {
            ParseErrorKind::Syntax => "SyntaxError",
            ParseErrorKind::Name => "NameResolutionError",
        }
    }

    pub(crate) fn from_name(err: NameError, line: usize, col: usize) -> Self {
        ParserError {
            kind: ParseErrorKind::Name,
            message: err.to_string(),
            line,
            col,
        }
    }
}
