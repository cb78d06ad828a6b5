//! Rust-defined primitives that wrap host functions as procedures.
//!
//! ```text
//! add: native [x y] :core/add
//! +: native-infix [x y] :core/add
//! fetch: native-async [url] "application/json" :http/get
//! pipe producer consumer
//! ```

use crate::cursor::Cursor;
use crate::error::{EvalError, EvalResult};
use crate::procedure::scan_params;
use crate::stream::Publisher;
use crate::suspend::{self, run_once, run_per_value, Step, Suspend};
use crate::value::{Func, Proc, Value};
use crate::vm::Vm;
use std::rc::Rc;

pub(crate) fn install(vm: &Vm) {
    vm.define("native", Value::Proc(Proc::prefix(native)));
    vm.define("native-infix", Value::Proc(Proc::prefix(native_infix)));
    vm.define("native-async", Value::Proc(Proc::prefix(native_async)));
    vm.define("pipe", Value::Proc(Proc::prefix(pipe)));
}

fn expect_block(value: Value, what: &str) -> EvalResult<crate::code::Code> {
    match value {
        Value::Block(code) => Ok(code),
        other => Err(EvalError::TypeMismatch(format!(
            "{what} must be a block, got {}",
            other.type_name()
        ))),
    }
}

fn expect_func(value: Value, what: &str) -> EvalResult<Func> {
    match value {
        Value::Func(func) => Ok(func),
        other => Err(EvalError::TypeMismatch(format!(
            "{what} needs a native function, got {}",
            other.type_name()
        ))),
    }
}

fn expect_string(value: Value, what: &str) -> EvalResult<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(EvalError::TypeMismatch(format!(
            "{what} must be a string, got {}",
            other.type_name()
        ))),
    }
}

/// Parameter count of a native's parameter list. Natives take positional
/// parameters only.
fn arity(params: &crate::code::Code, what: &str) -> EvalResult<usize> {
    let spec = scan_params(params, false)?;
    if !spec.locals.is_empty() {
        return Err(EvalError::MalformedUse(format!("{what} takes no /local")));
    }
    Ok(spec.positional.len())
}

fn read_args(cursor: &mut Cursor, count: usize) -> EvalResult<Vec<Value>> {
    (0..count).map(|_| cursor.next()).collect()
}

// ── native ────────────────────────────────────────────────────────────────

fn native(cursor: &mut Cursor) -> EvalResult<Value> {
    let params = expect_block(cursor.next()?, "native parameters")?;
    let func = expect_func(cursor.next()?, "native")?;
    let count = arity(&params, "native")?;
    Ok(Value::Proc(Proc::prefix(move |cursor| {
        let args = read_args(cursor, count)?;
        func.call(cursor.vm(), args)
    })))
}

fn native_infix(cursor: &mut Cursor) -> EvalResult<Value> {
    let params = expect_block(cursor.next()?, "native-infix parameters")?;
    let func = expect_func(cursor.next()?, "native-infix")?;
    let count = arity(&params, "native-infix")?;
    if count != 2 {
        return Err(EvalError::MalformedUse(format!(
            "native-infix takes exactly two parameters, got {count}"
        )));
    }
    Ok(Value::Proc(Proc::infix(move |cursor, left, right| {
        func.call(cursor.vm(), vec![left, right])
    })))
}

// ── native-async ──────────────────────────────────────────────────────────

/// Failures inside a resumed native surface as host task failures.
fn host_failure(error: EvalError) -> EvalError {
    match error {
        EvalError::HostTaskFailure(_) => error,
        other => EvalError::HostTaskFailure(other.to_string()),
    }
}

fn native_async(cursor: &mut Cursor) -> EvalResult<Value> {
    let params = expect_block(cursor.next()?, "native-async parameters")?;
    let mime = expect_string(cursor.next()?, "native-async content type")?;
    let func = expect_func(cursor.next()?, "native-async")?;
    let count = arity(&params, "native-async")?;
    Ok(Value::Proc(Proc::prefix(move |cursor| {
        let args = read_args(cursor, count)?;
        Ok(Value::Suspend(async_call(
            cursor.vm().clone(),
            func.clone(),
            args,
            mime.clone(),
        )))
    })))
}

/// Without input the function runs once on `args`; with input it runs on
/// `args + [value]` for every upstream value. Each result is published.
fn async_call(vm: Vm, func: Func, args: Vec<Value>, mime: String) -> Suspend {
    let out = Publisher::new();
    let writer = out.clone();
    let call = Rc::new(move |extra: Option<Value>| -> EvalResult<()> {
        let mut call_args = args.clone();
        call_args.extend(extra);
        let result = func.call(&vm, call_args).map_err(host_failure)?;
        writer.write(result);
        Ok(())
    });
    Suspend::new(
        out.clone(),
        true,
        Some(mime),
        Box::new(move |upstream: Option<Publisher>| match upstream {
            Some(upstream) => {
                let step: Step = Rc::new(move |value: Value| call(Some(value)));
                run_per_value(upstream, out, step)
            }
            None => run_once(out, move || call(None)),
        }),
    )
}

// ── pipe ──────────────────────────────────────────────────────────────────

fn pipe(cursor: &mut Cursor) -> EvalResult<Value> {
    let left = cursor.next_deferred()?;
    let right = cursor.next_deferred()?;
    match (left, right) {
        (Value::Suspend(left), Value::Suspend(right)) => {
            Ok(Value::Suspend(suspend::pipe(&left, &right)?))
        }
        (left, right) => Err(EvalError::TypeMismatch(format!(
            "pipe needs two suspends, got {} and {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}
