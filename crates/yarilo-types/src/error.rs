use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum number of diagnostics kept before the front end stops.
pub const MAX_ERRORS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Numeric syntax error code (E100–E199).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    pub const UNEXPECTED_CHARACTER: Self = Self(100);
    pub const UNCLOSED_BRACKET: Self = Self(101);
    pub const UNTERMINATED_STRING: Self = Self(102);
    pub const UNEXPECTED_CLOSE: Self = Self(103);
    pub const EMPTY_SYMBOL: Self = Self(104);
    pub const INVALID_ESCAPE: Self = Self(105);
    pub const MALFORMED_NUMBER: Self = Self(106);
    pub const NESTING_TOO_DEEP: Self = Self(107);
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// A single structured syntax diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxError {
    pub file: String,
    pub code: ErrorCode,
    pub severity: Severity,
    pub message: String,
    #[serde(flatten)]
    pub span: Span,
    /// The offending source line, quoted verbatim.
    pub source_line: String,
}

impl SyntaxError {
    pub fn new(
        file: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        source_line: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            code,
            severity: Severity::Error,
            message: message.into(),
            span,
            source_line: source_line.into(),
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {} {}", self.file, self.span, self.code, self.message)
    }
}

/// Diagnostics collected by one lexing/parsing pass.
///
/// Only the first [`MAX_ERRORS`] are stored; `total_errors` keeps counting.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Error)]
#[error("{} syntax error(s){}", .total_errors, first_message(.errors))]
pub struct SyntaxErrors {
    pub errors: Vec<SyntaxError>,
    pub total_errors: usize,
}

fn first_message(errors: &[SyntaxError]) -> String {
    errors
        .first()
        .map(|e| format!(", first: {e}"))
        .unwrap_or_default()
}

impl SyntaxErrors {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// True once the cap is reached and the caller should stop scanning.
    pub fn is_full(&self) -> bool {
        self.total_errors >= MAX_ERRORS
    }

    pub fn push(&mut self, error: SyntaxError) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
        self.total_errors += 1;
    }

    /// Append everything from another pass (lexer errors ahead of parser errors).
    pub fn extend(&mut self, other: SyntaxErrors) {
        let overflow = other.total_errors.saturating_sub(other.errors.len());
        for error in other.errors {
            self.push(error);
        }
        self.total_errors += overflow;
    }
}
