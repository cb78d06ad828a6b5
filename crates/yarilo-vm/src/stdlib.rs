//! The `core` library and the boot script that wires it into the root scope.

use crate::error::{EvalError, EvalResult};
use crate::module::evaluate_module;
use crate::procedure::make_proc;
use crate::value::{Dictionary, Func, Value};
use crate::vm::Vm;

/// Evaluated by [`Vm::boot`] after the native primitives are installed.
pub const BOOT: &str = r#"
add: native [x y] :core/add
sub: native [x y] :core/sub
mul: native [x y] :core/mul
gt: native [x y] :core/gt
eq: native [x y] :core/eq

+: native-infix [x y] :core/add
-: native-infix [x y] :core/sub
*: native-infix [x y] :core/mul
>: native-infix [x y] :core/gt
=: native-infix [x y] :core/eq

either: native [cond if-true if-false] :core/either
proc: native [params body] :core/proc
fn: native [params body] :core/fn
module: native [desc body] :core/module
throw: native [message] :core/throw
print: native [value] :core/print

write: proc [value /out] [out value]
passthrough: proc [/in /out] [out in]
"#;

pub(crate) fn install(vm: &Vm) -> EvalResult<()> {
    vm.define("core", Value::Object(core()));
    vm.eval(BOOT)?;
    Ok(())
}

/// Host functions behind the boot script's words.
pub fn core() -> Dictionary {
    Dictionary::from_entries([
        ("add", Value::Func(Func::new(add))),
        ("sub", arithmetic("sub", |a, b| a - b)),
        ("mul", arithmetic("mul", |a, b| a * b)),
        ("gt", Value::Func(Func::new(gt))),
        ("eq", Value::Func(Func::new(|_, args| {
            let [a, b] = two(args, "eq")?;
            Ok(Value::Bool(a == b))
        }))),
        ("either", Value::Func(Func::new(either))),
        ("proc", Value::Func(Func::new(|vm, args| {
            let [params, body] = two(args, "proc")?;
            make_proc(vm, block(&params, "proc")?, block(&body, "proc")?, true)
        }))),
        ("fn", Value::Func(Func::new(|vm, args| {
            let [params, body] = two(args, "fn")?;
            make_proc(vm, block(&params, "fn")?, block(&body, "fn")?, false)
        }))),
        ("module", Value::Func(Func::new(|vm, args| {
            let [desc, body] = two(args, "module")?;
            let exports = evaluate_module(vm, block(&desc, "module")?, block(&body, "module")?)?;
            Ok(Value::Object(exports))
        }))),
        ("throw", Value::Func(Func::new(|_, args| {
            let message = args.into_iter().next().unwrap_or(Value::None);
            Err(EvalError::Thrown(message.to_string()))
        }))),
        ("print", Value::Func(Func::new(|vm, args| {
            let value = args.into_iter().next().unwrap_or(Value::None);
            vm.print(value.to_string());
            Ok(value)
        }))),
    ])
}

// ── Argument helpers ──────────────────────────────────────────────────────

fn two(args: Vec<Value>, name: &str) -> EvalResult<[Value; 2]> {
    <[Value; 2]>::try_from(args).map_err(|args| {
        EvalError::TypeMismatch(format!("{name} takes 2 arguments, got {}", args.len()))
    })
}

fn block<'a>(value: &'a Value, name: &str) -> EvalResult<&'a crate::code::Code> {
    value.as_block().ok_or_else(|| {
        EvalError::TypeMismatch(format!("{name} expects a block, got {}", value.type_name()))
    })
}

fn numbers(a: &Value, b: &Value, name: &str) -> EvalResult<(f64, f64)> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(EvalError::TypeMismatch(format!(
            "{name} expects numbers, got {} and {}",
            a.type_name(),
            b.type_name()
        ))),
    }
}

// ── Functions ─────────────────────────────────────────────────────────────

/// Numbers add; if either side is a string the two are concatenated.
fn add(_: &Vm, args: Vec<Value>) -> EvalResult<Value> {
    match two(args, "add")? {
        [Value::Number(a), Value::Number(b)] => Ok(Value::Number(a + b)),
        [a @ Value::String(_), b] | [a, b @ Value::String(_)] => {
            Ok(Value::String(format!("{a}{b}")))
        }
        [a, b] => numbers(&a, &b, "add").map(|(a, b)| Value::Number(a + b)),
    }
}

fn arithmetic(name: &'static str, op: fn(f64, f64) -> f64) -> Value {
    Value::Func(Func::new(move |_, args| {
        let [a, b] = two(args, name)?;
        let (a, b) = numbers(&a, &b, name)?;
        Ok(Value::Number(op(a, b)))
    }))
}

fn gt(_: &Vm, args: Vec<Value>) -> EvalResult<Value> {
    match two(args, "gt")? {
        [Value::String(a), Value::String(b)] => Ok(Value::Bool(a > b)),
        [a, b] => numbers(&a, &b, "gt").map(|(a, b)| Value::Bool(a > b)),
    }
}

/// Blocks are executed, other branch values are returned as they are.
fn either(vm: &Vm, args: Vec<Value>) -> EvalResult<Value> {
    let [cond, if_true, if_false] = <[Value; 3]>::try_from(args).map_err(|args| {
        EvalError::TypeMismatch(format!("either takes 3 arguments, got {}", args.len()))
    })?;
    let branch = if cond.is_truthy() { if_true } else { if_false };
    match branch {
        Value::Block(code) => vm.execute(&code),
        other => Ok(other),
    }
}
