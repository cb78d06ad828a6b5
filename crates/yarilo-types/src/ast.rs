//! Plain syntax tree produced by the parser.
//!
//! Nodes carry no runtime state; the virtual machine lowers them into its
//! bindable code model before execution.

use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a symbol-bearing node is written in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WordKind {
    /// `word`: read, invoking procedures.
    Normal,
    /// `:word`: read without invoking.
    Get,
    /// `word:`: assign the next value.
    Set,
    /// `'word`: the symbol itself.
    Quote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Word { kind: WordKind, symbol: String },
    /// `a/b/c` or `a.b.c`; never fewer than two segments.
    Path { kind: WordKind, segments: Vec<String> },
    /// `[ ... ]`
    Block(Vec<Node>),
    /// `( ... )`
    Paren(Vec<Node>),
    Number(f64),
    String(String),
    /// `/ident`
    Refinement(String),
}

impl fmt::Display for WordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WordKind::Normal => "word",
            WordKind::Get => "get-word",
            WordKind::Set => "set-word",
            WordKind::Quote => "quote",
        };
        f.write_str(name)
    }
}

/// Re-renders a node in source form (used in error messages and tests).
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn symbol(f: &mut fmt::Formatter<'_>, kind: WordKind, text: &str) -> fmt::Result {
            match kind {
                WordKind::Normal => write!(f, "{text}"),
                WordKind::Get => write!(f, ":{text}"),
                WordKind::Set => write!(f, "{text}:"),
                WordKind::Quote => write!(f, "'{text}"),
            }
        }
        fn seq(f: &mut fmt::Formatter<'_>, open: char, items: &[Node], close: char) -> fmt::Result {
            write!(f, "{open}")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{item}")?;
            }
            write!(f, "{close}")
        }
        match &self.kind {
            NodeKind::Word { kind, symbol: sym } => symbol(f, *kind, sym),
            NodeKind::Path { kind, segments } => symbol(f, *kind, &segments.join("/")),
            NodeKind::Block(items) => seq(f, '[', items, ']'),
            NodeKind::Paren(items) => seq(f, '(', items, ')'),
            NodeKind::Number(n) if n.fract() == 0.0 && n.is_finite() => write!(f, "{}", *n as i64),
            NodeKind::Number(n) => write!(f, "{n}"),
            NodeKind::String(s) => write!(f, "{s:?}"),
            NodeKind::Refinement(ident) => write!(f, "/{ident}"),
        }
    }
}
