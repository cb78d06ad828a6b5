//! The bindable code model.
//!
//! [`Code`] is an immutable, shareable sequence of [`CodeItem`]s lowered from
//! the parser's syntax tree. The only mutable part is the binding slot on
//! words and paths, filled by [`bind`](crate::bind::bind).

use crate::bind::Binding;
use crate::value::{write_number, Value};
use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;
use yarilo_types::ast::{Node, NodeKind};

pub use yarilo_types::ast::WordKind;

/// First characters that make a normal word an infix operator.
pub const INFIX_CHARS: &str = "+-|*>=";

/// Ordered, fixed-length code sequence. Cloning shares the items.
#[derive(Clone)]
pub struct Code(Rc<[CodeItem]>);

pub enum CodeItem {
    Word(Word),
    Path(Path),
    /// Nested code, evaluates to itself.
    Block(Code),
    /// Nested code, evaluated in place.
    Paren(Code),
    /// Literal; never bound.
    Const(Value),
    /// Parameter-list marker; never executed.
    Refinement(String),
}

pub struct Word {
    kind: WordKind,
    symbol: String,
    infix: bool,
    bound: RefCell<Option<Binding>>,
}

pub struct Path {
    kind: WordKind,
    segments: Vec<String>,
    bound: RefCell<Option<Binding>>,
}

impl Code {
    pub fn new(items: Vec<CodeItem>) -> Self {
        Self(items.into())
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Lower parser output into runtime code.
    pub fn from_nodes(nodes: &[Node]) -> Self {
        Self::new(nodes.iter().map(CodeItem::from_node).collect())
    }

    /// A structurally equal copy with its own binding slots. Existing
    /// bindings are carried over, so a later [`bind`](crate::bind::bind) on
    /// the copy leaves this code untouched.
    pub fn deep_clone(&self) -> Self {
        Self::new(self.iter().map(CodeItem::deep_clone).collect())
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Code) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for Code {
    type Target = [CodeItem];

    fn deref(&self) -> &[CodeItem] {
        &self.0
    }
}

impl CodeItem {
    fn from_node(node: &Node) -> Self {
        match &node.kind {
            NodeKind::Word { kind, symbol } => CodeItem::Word(Word::new(*kind, symbol.clone())),
            NodeKind::Path { kind, segments } => {
                CodeItem::Path(Path::new(*kind, segments.clone()))
            }
            NodeKind::Block(items) => CodeItem::Block(Code::from_nodes(items)),
            NodeKind::Paren(items) => CodeItem::Paren(Code::from_nodes(items)),
            NodeKind::Number(n) => CodeItem::Const(Value::Number(*n)),
            NodeKind::String(s) => CodeItem::Const(Value::String(s.clone())),
            NodeKind::Refinement(ident) => CodeItem::Refinement(ident.clone()),
        }
    }

    fn deep_clone(&self) -> Self {
        match self {
            CodeItem::Word(word) => CodeItem::Word(Word {
                kind: word.kind,
                symbol: word.symbol.clone(),
                infix: word.infix,
                bound: RefCell::new(word.binding()),
            }),
            CodeItem::Path(path) => CodeItem::Path(Path {
                kind: path.kind,
                segments: path.segments.clone(),
                bound: RefCell::new(path.binding()),
            }),
            CodeItem::Block(code) => CodeItem::Block(code.deep_clone()),
            CodeItem::Paren(code) => CodeItem::Paren(code.deep_clone()),
            CodeItem::Const(value) => CodeItem::Const(value.clone()),
            CodeItem::Refinement(ident) => CodeItem::Refinement(ident.clone()),
        }
    }

    /// The word, if this item is one.
    pub fn as_word(&self) -> Option<&Word> {
        match self {
            CodeItem::Word(word) => Some(word),
            _ => None,
        }
    }
}

impl Word {
    pub fn new(kind: WordKind, symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        let infix =
            kind == WordKind::Normal && symbol.starts_with(|c: char| INFIX_CHARS.contains(c));
        Self {
            kind,
            symbol,
            infix,
            bound: RefCell::new(None),
        }
    }

    pub fn kind(&self) -> WordKind {
        self.kind
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn is_infix(&self) -> bool {
        self.infix
    }

    pub fn binding(&self) -> Option<Binding> {
        self.bound.borrow().clone()
    }

    pub(crate) fn attach(&self, binding: Binding) {
        *self.bound.borrow_mut() = Some(binding);
    }
}

impl Path {
    pub fn new(kind: WordKind, segments: Vec<String>) -> Self {
        Self {
            kind,
            segments,
            bound: RefCell::new(None),
        }
    }

    pub fn kind(&self) -> WordKind {
        self.kind
    }

    /// All segments; the first is the bound symbol.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn head(&self) -> &str {
        self.segments.first().map(String::as_str).unwrap_or("")
    }

    pub fn binding(&self) -> Option<Binding> {
        self.bound.borrow().clone()
    }

    pub(crate) fn attach(&self, binding: Binding) {
        *self.bound.borrow_mut() = Some(binding);
    }
}

// ── Display ───────────────────────────────────────────────────────────────────

fn write_symbol(f: &mut fmt::Formatter<'_>, kind: WordKind, text: &str) -> fmt::Result {
    match kind {
        WordKind::Normal => write!(f, "{text}"),
        WordKind::Get => write!(f, ":{text}"),
        WordKind::Set => write!(f, "{text}:"),
        WordKind::Quote => write!(f, "'{text}"),
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}

impl fmt::Display for CodeItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeItem::Word(word) => write_symbol(f, word.kind, &word.symbol),
            CodeItem::Path(path) => write_symbol(f, path.kind, &path.segments.join("/")),
            CodeItem::Block(code) => write!(f, "[{code}]"),
            CodeItem::Paren(code) => write!(f, "({code})"),
            CodeItem::Const(Value::String(s)) => write!(f, "{s:?}"),
            CodeItem::Const(Value::Number(n)) => write_number(f, *n),
            CodeItem::Const(value) => write!(f, "{value}"),
            CodeItem::Refinement(ident) => write!(f, "/{ident}"),
        }
    }
}

impl fmt::Debug for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Code[{self}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(source: &str) -> Code {
        Code::from_nodes(&yarilo_parser::parse("test.y", source).unwrap())
    }

    #[test]
    fn test_infix_flag() {
        assert!(Word::new(WordKind::Normal, "+").is_infix());
        assert!(Word::new(WordKind::Normal, ">=").is_infix());
        assert!(Word::new(WordKind::Normal, "|").is_infix());
        assert!(!Word::new(WordKind::Set, "+").is_infix());
        assert!(!Word::new(WordKind::Get, "*").is_infix());
        assert!(!Word::new(WordKind::Normal, "add").is_infix());
        assert!(!Word::new(WordKind::Normal, "a+b").is_infix());
    }

    #[test]
    fn test_lowering() {
        let code = code(r#"x: add 1 "s" [n] (m) core/add /local"#);
        assert_eq!(code.len(), 8);
        assert!(matches!(&code[0], CodeItem::Word(w) if w.kind() == WordKind::Set));
        assert!(matches!(&code[2], CodeItem::Const(Value::Number(n)) if *n == 1.0));
        assert!(matches!(&code[3], CodeItem::Const(Value::String(s)) if s == "s"));
        assert!(matches!(&code[4], CodeItem::Block(b) if b.len() == 1));
        assert!(matches!(&code[5], CodeItem::Paren(p) if p.len() == 1));
        assert!(matches!(&code[6], CodeItem::Path(p) if p.segments() == ["core", "add"]));
        assert!(matches!(&code[7], CodeItem::Refinement(r) if r == "local"));
    }

    #[test]
    fn test_display_round_trips_source_shape() {
        let source = r#"f: proc [n /local x] [x: :n either x > 1 ["big"] ('y)]"#;
        assert_eq!(code(source).to_string(), source);
    }

    #[test]
    fn test_deep_clone_has_own_slots() {
        use crate::bind::{bind, DictionaryBinding};
        use crate::value::Dictionary;

        let original = code("a [a]");
        let dict = Dictionary::default();
        bind(&original, &|_: &str| {
            Some(Rc::new(DictionaryBinding(dict.clone())) as Binding)
        });
        let copy = original.deep_clone();
        assert!(copy[0].as_word().and_then(Word::binding).is_some());

        let other = Dictionary::default();
        bind(&copy, &|_: &str| {
            Some(Rc::new(DictionaryBinding(other.clone())) as Binding)
        });
        let first = original[0].as_word().and_then(Word::binding).unwrap();
        let second = copy[0].as_word().and_then(Word::binding).unwrap();
        assert!(!Rc::ptr_eq(&first, &second));
        assert!(!copy.ptr_eq(&original));
    }

    #[test]
    fn test_fresh_words_are_unbound() {
        let code = code("a b/c");
        assert!(code[0].as_word().and_then(Word::binding).is_none());
        assert!(matches!(&code[1], CodeItem::Path(p) if p.binding().is_none()));
    }
}
