//! Runtime values.

use crate::code::Code;
use crate::cursor::Cursor;
use crate::error::EvalResult;
use crate::suspend::{Suspend, Task};
use crate::vm::Vm;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A Yarilo runtime value.
#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Number(f64),
    String(String),
    /// Unevaluated code.
    Block(Code),
    /// A field-projection target for paths (`m/dbl`).
    Object(Dictionary),
    /// Host function over already-evaluated arguments.
    Func(Func),
    /// Cursor-driven invocable.
    Proc(Proc),
    /// Deferred streaming computation, not yet resumed.
    Suspend(Suspend),
    /// A resumed suspend.
    Task(Task),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Block(_) => "block",
            Value::Object(_) => "object",
            Value::Func(_) => "native",
            Value::Proc(_) => "proc",
            Value::Suspend(_) => "suspend",
            Value::Task(_) => "task",
        }
    }

    /// `none` and `false` are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::None | Value::Bool(false))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&Code> {
        match self {
            Value::Block(code) => Some(code),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Dictionary> {
        match self {
            Value::Object(dict) => Some(dict),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Dictionary> for Value {
    fn from(dict: Dictionary) -> Self {
        Value::Object(dict)
    }
}

/// Scalars and objects compare structurally; code and callables by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Block(a), Value::Block(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Func(a), Value::Func(b)) => Rc::ptr_eq(&a.0, &b.0),
            (Value::Proc(a), Value::Proc(b)) => a.ptr_eq(b),
            (Value::Suspend(a), Value::Suspend(b)) => a.ptr_eq(b),
            (Value::Task(a), Value::Task(b)) => a.out().ptr_eq(b.out()),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "none"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write_number(f, *n),
            Value::String(s) => write!(f, "{s}"),
            Value::Block(code) => write!(f, "[{code}]"),
            Value::Object(dict) => write!(f, "{dict}"),
            Value::Func(_) => write!(f, "<native>"),
            Value::Proc(_) => write!(f, "<proc>"),
            Value::Suspend(_) => write!(f, "<suspend>"),
            Value::Task(_) => write!(f, "<task>"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Block(code) => write!(f, "Block([{code}])"),
            Value::Object(dict) => write!(f, "Object({dict})"),
            other => write!(f, "{other}"),
        }
    }
}

/// Integral numbers print without a fractional part.
pub(crate) fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{n}")
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Dictionary
// ══════════════════════════════════════════════════════════════════════════════

/// Shared, mutable symbol table: the VM's root scope, module exports and
/// module metadata are all dictionaries.
#[derive(Clone, Default)]
pub struct Dictionary(Rc<RefCell<BTreeMap<String, Value>>>);

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
        let dict = Self::new();
        for (key, value) in entries {
            dict.set(key, value);
        }
        dict
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.borrow().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: Value) {
        self.0.borrow_mut().insert(key.to_string(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.borrow().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn ptr_eq(&self, other: &Dictionary) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Dictionary {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0.borrow() == *other.0.borrow()
    }
}

impl fmt::Display for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.0.borrow().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}: {value}")?;
        }
        write!(f, "}}")
    }
}

impl fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dictionary({self})")
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Callables
// ══════════════════════════════════════════════════════════════════════════════

pub type HostFn = dyn Fn(&Vm, Vec<Value>) -> EvalResult<Value>;

/// A host function. Arity is decided by whoever wraps it (`native [x y] ...`).
#[derive(Clone)]
pub struct Func(Rc<HostFn>);

impl Func {
    pub fn new(f: impl Fn(&Vm, Vec<Value>) -> EvalResult<Value> + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, vm: &Vm, args: Vec<Value>) -> EvalResult<Value> {
        (self.0)(vm, args)
    }
}

pub type PrefixFn = dyn Fn(&mut Cursor) -> EvalResult<Value>;
pub type InfixFn = dyn Fn(&mut Cursor, Value, Value) -> EvalResult<Value>;

/// A procedure reads its own arguments from the calling cursor.
#[derive(Clone)]
pub enum Proc {
    Prefix(Rc<PrefixFn>),
    /// Receives the left operand (the last result) and the next value.
    Infix(Rc<InfixFn>),
}

impl Proc {
    pub fn prefix(f: impl Fn(&mut Cursor) -> EvalResult<Value> + 'static) -> Self {
        Proc::Prefix(Rc::new(f))
    }

    pub fn infix(f: impl Fn(&mut Cursor, Value, Value) -> EvalResult<Value> + 'static) -> Self {
        Proc::Infix(Rc::new(f))
    }

    pub fn is_infix(&self) -> bool {
        matches!(self, Proc::Infix(_))
    }

    fn ptr_eq(&self, other: &Proc) -> bool {
        match (self, other) {
            (Proc::Prefix(a), Proc::Prefix(b)) => Rc::ptr_eq(a, b),
            (Proc::Infix(a), Proc::Infix(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}
