//! Cursor-driven execution.
//!
//! A [`Cursor`] walks one bound [`Code`] sequence. Each step evaluates the
//! item under the cursor, stores the value in the VM's result register and
//! then folds any infix words that follow, strictly left to right.

use crate::code::{Code, CodeItem, Path, Word, WordKind};
use crate::error::{EvalError, EvalResult};
use crate::value::{Proc, Value};
use crate::vm::Vm;
use tracing::trace;

pub struct Cursor {
    vm: Vm,
    code: Code,
    pos: usize,
}

impl Cursor {
    pub fn new(vm: Vm, code: Code) -> Self {
        Self { vm, code, pos: 0 }
    }

    pub fn vm(&self) -> &Vm {
        &self.vm
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.code.len()
    }

    /// Run to the end and return the last value (`none` for empty code).
    pub fn exec(mut self) -> EvalResult<Value> {
        let mut last = Value::None;
        while !self.at_end() {
            last = self.next()?;
        }
        Ok(last)
    }

    /// Evaluate one item plus any infix chain that follows it.
    pub fn next(&mut self) -> EvalResult<Value> {
        let mut value = self.next_no_infix()?;
        loop {
            let code = self.code.clone();
            let Some(op) = code
                .get(self.pos)
                .and_then(CodeItem::as_word)
                .filter(|word| word.is_infix())
            else {
                break;
            };
            self.pos += 1;
            value = self.apply_infix(op, value)?;
            value = self.vm.auto_resume(value)?;
            self.vm.set_result(value.clone());
        }
        Ok(value)
    }

    /// Evaluate exactly one item. Suspends are resumed automatically.
    pub fn next_no_infix(&mut self) -> EvalResult<Value> {
        let value = self.fetch()?;
        let value = self.vm.auto_resume(value)?;
        self.vm.set_result(value.clone());
        Ok(value)
    }

    /// Evaluate exactly one item and hand back a suspend untouched.
    pub fn next_deferred(&mut self) -> EvalResult<Value> {
        let value = self.fetch()?;
        self.vm.set_result(value.clone());
        Ok(value)
    }

    fn fetch(&mut self) -> EvalResult<Value> {
        let code = self.code.clone();
        let item = code.get(self.pos).ok_or(EvalError::ExhaustedCode)?;
        if self.vm.config().trace {
            trace!(position = self.pos, item = %item, "step");
        }
        self.pos += 1;
        self.exec_item(item)
    }

    fn exec_item(&mut self, item: &CodeItem) -> EvalResult<Value> {
        match item {
            CodeItem::Word(word) => self.exec_word(word),
            CodeItem::Path(path) => self.exec_path(path),
            CodeItem::Block(code) => Ok(Value::Block(code.clone())),
            CodeItem::Paren(code) => self.vm.execute(code),
            CodeItem::Const(value) => Ok(value.clone()),
            CodeItem::Refinement(ident) => Err(EvalError::MalformedUse(format!(
                "refinement /{ident} outside a parameter list"
            ))),
        }
    }

    // ── Words ─────────────────────────────────────────────────────────────

    fn exec_word(&mut self, word: &Word) -> EvalResult<Value> {
        match word.kind() {
            WordKind::Quote => Ok(Value::String(word.symbol().to_string())),
            WordKind::Get => lookup(word),
            WordKind::Set => {
                let value = self.next()?;
                let binding = word
                    .binding()
                    .ok_or_else(|| EvalError::UnboundReference(word.symbol().to_string()))?;
                binding.set(word.symbol(), value.clone())?;
                Ok(value)
            }
            WordKind::Normal => {
                let value = lookup(word)?;
                self.invoke(value)
            }
        }
    }

    /// Procedures read their own arguments, and so does an object whose
    /// `default` field is a procedure. Every other value is returned as is.
    fn invoke(&mut self, value: Value) -> EvalResult<Value> {
        match value {
            Value::Proc(Proc::Prefix(f)) => f(self),
            Value::Proc(Proc::Infix(f)) => {
                let left = self.next_no_infix()?;
                let right = self.next_no_infix()?;
                f(self, left, right)
            }
            Value::Object(dict) => match dict.get("default") {
                Some(proc @ Value::Proc(_)) => self.invoke(proc),
                _ => Ok(Value::Object(dict)),
            },
            other => Ok(other),
        }
    }

    fn apply_infix(&mut self, op: &Word, left: Value) -> EvalResult<Value> {
        match lookup(op)? {
            Value::Proc(Proc::Infix(f)) => {
                let right = self.next_no_infix()?;
                f(self, left, right)
            }
            Value::Func(func) => {
                let right = self.next_no_infix()?;
                func.call(&self.vm, vec![left, right])
            }
            other => Err(EvalError::NotInvocable(format!(
                "{} is a {}",
                op.symbol(),
                other.type_name()
            ))),
        }
    }

    // ── Paths ─────────────────────────────────────────────────────────────

    fn exec_path(&mut self, path: &Path) -> EvalResult<Value> {
        match path.kind() {
            WordKind::Quote => Ok(Value::String(path.segments().join("/"))),
            WordKind::Get => project(path, path.segments().len()),
            WordKind::Normal => {
                let value = project(path, path.segments().len())?;
                self.invoke(value)
            }
            WordKind::Set => {
                let value = self.next()?;
                let field = path
                    .segments()
                    .last()
                    .ok_or_else(|| EvalError::MalformedUse("empty path".to_string()))?;
                match project(path, path.segments().len() - 1)? {
                    Value::Object(dict) => {
                        dict.set(field, value.clone());
                        Ok(value)
                    }
                    other => Err(EvalError::TypeMismatch(format!(
                        "cannot set {field} on a {}",
                        other.type_name()
                    ))),
                }
            }
        }
    }
}

fn lookup(word: &Word) -> EvalResult<Value> {
    let binding = word
        .binding()
        .ok_or_else(|| EvalError::UnboundReference(word.symbol().to_string()))?;
    binding.get(word.symbol())
}

/// Resolve the head through its binding, then project the next `depth - 1`
/// segments as object fields.
fn project(path: &Path, depth: usize) -> EvalResult<Value> {
    let head = path.head();
    let binding = path
        .binding()
        .ok_or_else(|| EvalError::UnboundReference(head.to_string()))?;
    let mut value = binding.get(head)?;
    for (i, field) in path.segments().iter().enumerate().take(depth).skip(1) {
        let dict = match &value {
            Value::Object(dict) => dict.clone(),
            other => {
                return Err(EvalError::TypeMismatch(format!(
                    "{} is a {}, not an object",
                    path.segments()[..i].join("/"),
                    other.type_name()
                )))
            }
        };
        value = dict
            .get(field)
            .ok_or_else(|| EvalError::UnboundReference(path.segments()[..=i].join("/")))?;
    }
    Ok(value)
}
