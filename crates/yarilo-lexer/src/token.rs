//! Token types for the Yarilo lexer.
//!
//! Yarilo has almost no fixed vocabulary: every symbol is a word, and the
//! only structure is brackets. [`TokenKind`] therefore stays small.

use std::fmt;
use yarilo_types::ast::WordKind;
use yarilo_types::Span;

/// A single token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `42`, `-7`, `3.25`
    Number(f64),
    /// `"text"`, escapes already resolved.
    Str(String),
    /// A symbol with its sigil stripped. `text` may still contain `/` or `.`
    /// path separators; the parser splits them.
    Word { kind: WordKind, text: String },
    /// `/ident`
    Refinement(String),
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::LBracket => write!(f, "["),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            TokenKind::Str(s) => write!(f, "\"{s}\""),
            TokenKind::Word { kind, text } => match kind {
                WordKind::Normal => write!(f, "{text}"),
                WordKind::Get => write!(f, ":{text}"),
                WordKind::Set => write!(f, "{text}:"),
                WordKind::Quote => write!(f, "'{text}"),
            },
            TokenKind::Refinement(ident) => write!(f, "/{ident}"),
            TokenKind::Eof => write!(f, "end of file"),
        }
    }
}
