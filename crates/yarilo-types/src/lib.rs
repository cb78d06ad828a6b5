//! Shared types for Yarilo.
//!
//! This crate defines the plain syntax tree produced by the parser, source
//! spans, and the structured syntax diagnostics used by the lexer, the
//! parser and the virtual machine.

mod error;
mod span;
pub mod ast;

pub use error::{ErrorCode, Severity, SyntaxError, SyntaxErrors, MAX_ERRORS};
pub use span::{SourceFile, Span};

/// Result type used by the front end (lexer and parser).
pub type Result<T> = std::result::Result<T, SyntaxErrors>;
