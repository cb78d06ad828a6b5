//! Procedure activation.
//!
//! `proc`/`fn` turn a parameter list and a body into a [`Proc`]. Two
//! activation strategies exist:
//!
//! - **Stack frames** for ordinary procedures. Each call pushes its
//!   arguments and locals onto the VM stack. The body is bound once to
//!   slots addressed as `frame base + index`, where the frame base is the
//!   stack length when the call began. Recursion therefore always addresses
//!   the innermost frame, and the frame is popped on every exit path.
//! - **Private cells** for streaming procedures (`/in`, `/out`). A call
//!   captures its arguments in a fresh activation and returns a [`Suspend`]
//!   that runs the body once, or once per upstream value.

use crate::bind::{bind, Bound, Binding};
use crate::code::{Code, CodeItem, WordKind};
use crate::error::{EvalError, EvalResult};
use crate::stream::Publisher;
use crate::suspend::{run_once, run_per_value, Step, Suspend};
use crate::value::{Proc, Value};
use crate::vm::{Stack, Vm};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;
use tracing::{debug, trace};

/// Parameter groups declared by a parameter list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamSpec {
    /// Supplied by the caller, in order.
    pub positional: Vec<String>,
    /// `/local` slots, start as `none`.
    pub locals: Vec<String>,
    /// `/in` declared.
    pub input: bool,
    /// `/out` declared.
    pub output: bool,
}

impl ParamSpec {
    pub fn is_streaming(&self) -> bool {
        self.input || self.output
    }

    /// Slot names in slot order: positionals first, then locals.
    fn slots(&self) -> Vec<String> {
        self.positional.iter().chain(&self.locals).cloned().collect()
    }
}

#[derive(Clone, Copy)]
enum Group {
    Positional,
    Local,
    In,
    Out,
}

/// Scan a parameter list. A refinement switches the group for the words
/// that follow it.
pub fn scan_params(params: &Code, allow_streaming: bool) -> EvalResult<ParamSpec> {
    let mut spec = ParamSpec::default();
    let mut group = Group::Positional;
    let mut seen = HashSet::new();

    for item in params.iter() {
        match item {
            CodeItem::Refinement(ident) => {
                group = match ident.as_str() {
                    "local" => Group::Local,
                    "in" if allow_streaming => {
                        spec.input = true;
                        Group::In
                    }
                    "out" if allow_streaming => {
                        spec.output = true;
                        Group::Out
                    }
                    _ => return Err(EvalError::UnsupportedParameterKind(ident.clone())),
                };
            }
            CodeItem::Word(word) if word.kind() == WordKind::Normal => {
                let name = word.symbol();
                let slots = match group {
                    Group::Positional => &mut spec.positional,
                    Group::Local => &mut spec.locals,
                    Group::In => return Err(group_takes_no_names("in", name)),
                    Group::Out => return Err(group_takes_no_names("out", name)),
                };
                if !seen.insert(name.to_string()) {
                    return Err(EvalError::MalformedUse(format!(
                        "parameter {name} declared twice"
                    )));
                }
                slots.push(name.to_string());
            }
            other => {
                return Err(EvalError::MalformedUse(format!(
                    "{other} is not allowed in a parameter list"
                )))
            }
        }
    }

    if spec.is_streaming() {
        if let Some(reserved) = spec.slots().into_iter().find(|n| n == "in" || n == "out") {
            return Err(EvalError::MalformedUse(format!(
                "{reserved} is reserved in a streaming proc"
            )));
        }
    }
    Ok(spec)
}

fn group_takes_no_names(group: &str, name: &str) -> EvalError {
    EvalError::MalformedUse(format!("/{group} takes no names, found {name}"))
}

/// Build a procedure value. `allow_streaming` is false for `fn`.
pub fn make_proc(vm: &Vm, params: &Code, body: &Code, allow_streaming: bool) -> EvalResult<Value> {
    let spec = scan_params(params, allow_streaming)?;
    debug!(
        positional = spec.positional.len(),
        locals = spec.locals.len(),
        streaming = spec.is_streaming(),
        "proc defined"
    );
    // Each definition binds its own copy; the same `proc` expression may run
    // many times.
    let body = body.deep_clone();
    let proc = if spec.is_streaming() {
        streaming_proc(&spec, body)
    } else {
        stack_proc(vm, &spec, body)
    };
    Ok(Value::Proc(proc))
}

// ══════════════════════════════════════════════════════════════════════════════
// Stack frames
// ══════════════════════════════════════════════════════════════════════════════

/// One parameter or local, addressed relative to the current frame base.
struct FrameSlot {
    stack: Stack,
    base: Rc<Cell<usize>>,
    index: usize,
}

impl FrameSlot {
    fn outside_call(symbol: &str) -> EvalError {
        EvalError::MalformedUse(format!("{symbol} used outside its procedure call"))
    }
}

impl Bound for FrameSlot {
    fn get(&self, symbol: &str) -> EvalResult<Value> {
        self.stack
            .borrow()
            .get(self.base.get() + self.index)
            .cloned()
            .ok_or_else(|| Self::outside_call(symbol))
    }

    fn set(&self, symbol: &str, value: Value) -> EvalResult<()> {
        let mut stack = self.stack.borrow_mut();
        let slot = stack
            .get_mut(self.base.get() + self.index)
            .ok_or_else(|| Self::outside_call(symbol))?;
        *slot = value;
        Ok(())
    }
}

/// An active call. Dropping it pops the frame and restores the previous
/// base, whichever way the body exits.
struct Frame<'a> {
    vm: &'a Vm,
    base: &'a Cell<usize>,
    start: usize,
    previous: usize,
}

impl<'a> Frame<'a> {
    fn enter(vm: &'a Vm, base: &'a Cell<usize>, slots: Vec<Value>) -> EvalResult<Self> {
        vm.enter_call()?;
        let start = {
            let mut stack = vm.stack().borrow_mut();
            let start = stack.len();
            stack.extend(slots);
            start
        };
        let previous = base.replace(start);
        trace!(base = start, "frame entered");
        Ok(Self {
            vm,
            base,
            start,
            previous,
        })
    }
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        self.vm.stack().borrow_mut().truncate(self.start);
        self.base.set(self.previous);
        self.vm.exit_call();
        trace!(base = self.start, "frame left");
    }
}

fn stack_proc(vm: &Vm, spec: &ParamSpec, body: Code) -> Proc {
    let stack = vm.stack().clone();
    let base = Rc::new(Cell::new(0));
    let names = spec.slots();
    bind(&body, &|symbol: &str| {
        names.iter().position(|n| n == symbol).map(|index| {
            Rc::new(FrameSlot {
                stack: stack.clone(),
                base: base.clone(),
                index,
            }) as Binding
        })
    });

    let arity = spec.positional.len();
    let width = names.len();
    Proc::prefix(move |cursor| {
        let mut slots = Vec::with_capacity(width);
        for _ in 0..arity {
            slots.push(cursor.next()?);
        }
        slots.resize(width, Value::None);
        let vm = cursor.vm().clone();
        let _frame = Frame::enter(&vm, &base, slots)?;
        vm.execute(&body)
    })
}

// ══════════════════════════════════════════════════════════════════════════════
// Streaming activations
// ══════════════════════════════════════════════════════════════════════════════

struct Activation {
    slots: RefCell<Vec<Value>>,
    input: RefCell<Value>,
    out: Publisher,
}

/// The activation whose body is running right now, if any.
type Current = Rc<RefCell<Option<Rc<Activation>>>>;

fn active(current: &Current, symbol: &str) -> EvalResult<Rc<Activation>> {
    current
        .borrow()
        .clone()
        .ok_or_else(|| EvalError::MalformedUse(format!("{symbol} used outside its procedure body")))
}

struct CellSlot {
    current: Current,
    index: usize,
}

impl Bound for CellSlot {
    fn get(&self, symbol: &str) -> EvalResult<Value> {
        let activation = active(&self.current, symbol)?;
        let value = activation.slots.borrow().get(self.index).cloned();
        value.ok_or_else(|| EvalError::MalformedUse(format!("no slot for {symbol}")))
    }

    fn set(&self, symbol: &str, value: Value) -> EvalResult<()> {
        let activation = active(&self.current, symbol)?;
        let mut slots = activation.slots.borrow_mut();
        let slot = slots
            .get_mut(self.index)
            .ok_or_else(|| EvalError::MalformedUse(format!("no slot for {symbol}")))?;
        *slot = value;
        Ok(())
    }
}

/// `in`: the value being processed. Read-only.
struct InputSlot(Current);

impl Bound for InputSlot {
    fn get(&self, symbol: &str) -> EvalResult<Value> {
        let activation = active(&self.0, symbol)?;
        let value = activation.input.borrow().clone();
        Ok(value)
    }

    fn set(&self, _: &str, _: Value) -> EvalResult<()> {
        Err(EvalError::MalformedUse("cannot assign to in".to_string()))
    }
}

/// `out`: a one-argument procedure that publishes its argument.
struct OutputSlot(Proc);

impl OutputSlot {
    fn new(current: Current) -> Self {
        Self(Proc::prefix(move |cursor| {
            let value = cursor.next()?;
            active(&current, "out")?.out.write(value.clone());
            Ok(value)
        }))
    }
}

impl Bound for OutputSlot {
    fn get(&self, _: &str) -> EvalResult<Value> {
        Ok(Value::Proc(self.0.clone()))
    }

    fn set(&self, _: &str, _: Value) -> EvalResult<()> {
        Err(EvalError::MalformedUse("cannot assign to out".to_string()))
    }
}

fn streaming_proc(spec: &ParamSpec, body: Code) -> Proc {
    let current: Current = Rc::default();
    let names = spec.slots();
    let input: Option<Binding> = spec
        .input
        .then(|| Rc::new(InputSlot(current.clone())) as Binding);
    let output: Option<Binding> = spec
        .output
        .then(|| Rc::new(OutputSlot::new(current.clone())) as Binding);
    bind(&body, &|symbol: &str| match symbol {
        "in" if input.is_some() => input.clone(),
        "out" if output.is_some() => output.clone(),
        _ => names.iter().position(|n| n == symbol).map(|index| {
            Rc::new(CellSlot {
                current: current.clone(),
                index,
            }) as Binding
        }),
    });

    let arity = spec.positional.len();
    let width = names.len();
    let accepts_input = spec.input;
    Proc::prefix(move |cursor| {
        let mut slots = Vec::with_capacity(width);
        for _ in 0..arity {
            slots.push(cursor.next()?);
        }
        slots.resize(width, Value::None);
        let activation = Rc::new(Activation {
            slots: RefCell::new(slots),
            input: RefCell::new(Value::None),
            out: Publisher::new(),
        });
        let out = activation.out.clone();
        let vm = cursor.vm().clone();
        let body = body.clone();
        let current = current.clone();

        let run: Step = Rc::new(move |value: Value| {
            *activation.input.borrow_mut() = value;
            let previous = current.replace(Some(activation.clone()));
            let result = vm.execute(&body);
            *current.borrow_mut() = previous;
            result.map(|_| ())
        });
        let start_out = out.clone();
        Ok(Value::Suspend(Suspend::new(
            out,
            accepts_input,
            None,
            Box::new(move |upstream: Option<Publisher>| match upstream {
                Some(upstream) => run_per_value(upstream, start_out, run),
                None => run_once(start_out, move || run(Value::None)),
            }),
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(source: &str) -> Code {
        Code::from_nodes(&yarilo_parser::parse("params.y", source).unwrap())
    }

    #[test]
    fn test_scan_positional_and_locals() {
        let spec = scan_params(&params("a b /local c"), true).unwrap();
        assert_eq!(spec.positional, vec!["a", "b"]);
        assert_eq!(spec.locals, vec!["c"]);
        assert!(!spec.is_streaming());
    }

    #[test]
    fn test_scan_streaming_groups() {
        let spec = scan_params(&params("value /out"), true).unwrap();
        assert_eq!(spec.positional, vec!["value"]);
        assert!(spec.output && !spec.input);

        let spec = scan_params(&params("/in /out /local acc"), true).unwrap();
        assert!(spec.input && spec.output);
        assert_eq!(spec.locals, vec!["acc"]);
    }

    #[test]
    fn test_scan_rejects_unknown_refinement() {
        assert_eq!(
            scan_params(&params("a /static b"), true).unwrap_err(),
            EvalError::UnsupportedParameterKind("static".into())
        );
    }

    #[test]
    fn test_fn_rejects_streaming_groups() {
        assert_eq!(
            scan_params(&params("/in"), false).unwrap_err(),
            EvalError::UnsupportedParameterKind("in".into())
        );
    }

    #[test]
    fn test_scan_malformed_lists() {
        for source in ["a a", "/out x", "1", "x:", "in /out", "/in /local out"] {
            assert!(
                matches!(
                    scan_params(&params(source), true),
                    Err(EvalError::MalformedUse(_))
                ),
                "expected malformed use for {source:?}"
            );
        }
    }

    #[test]
    fn test_in_and_out_are_plain_names_without_streaming() {
        let spec = scan_params(&params("in out"), true).unwrap();
        assert_eq!(spec.positional, vec!["in", "out"]);
    }
}
