//! The VM: root scope, shared value stack and entry points.

use crate::bind::{bind, Binding, DictionaryBinding};
use crate::code::Code;
use crate::config::VmConfig;
use crate::cursor::Cursor;
use crate::error::{EvalError, EvalResult};
use crate::module::{Backing, BackingFactory};
use crate::suspend::Task;
use crate::value::{Dictionary, Value};
use crate::{natives, stdlib};
use futures::future::join_all;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, info};

/// The shared activation stack of non-streaming procedures.
pub(crate) type Stack = Rc<RefCell<Vec<Value>>>;

/// One interpreter instance. Cloning shares the instance.
///
/// A `Vm` is single-threaded: at most one cursor drives it at a time, and
/// resumed tasks are driven by the host through [`settle`](Vm::settle).
#[derive(Clone)]
pub struct Vm(Rc<VmState>);

struct VmState {
    config: VmConfig,
    dictionary: Dictionary,
    stack: Stack,
    result: RefCell<Value>,
    depth: Cell<usize>,
    tasks: RefCell<Vec<Task>>,
    output: RefCell<Vec<String>>,
    backings: RefCell<HashMap<String, BackingFactory>>,
    modules: RefCell<HashMap<String, Rc<dyn Backing>>>,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    /// An empty VM: no natives, no core library.
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self(Rc::new(VmState {
            config,
            dictionary: Dictionary::new(),
            stack: Rc::default(),
            result: RefCell::new(Value::None),
            depth: Cell::new(0),
            tasks: RefCell::default(),
            output: RefCell::default(),
            backings: RefCell::default(),
            modules: RefCell::default(),
        }))
    }

    /// Install the native primitives and the core library.
    pub fn boot(&self) -> EvalResult<()> {
        natives::install(self);
        stdlib::install(self)?;
        debug!(words = self.0.dictionary.len(), "vm booted");
        Ok(())
    }

    pub fn config(&self) -> &VmConfig {
        &self.0.config
    }

    /// The root scope.
    pub fn dictionary(&self) -> &Dictionary {
        &self.0.dictionary
    }

    pub fn define(&self, name: &str, value: Value) {
        self.0.dictionary.set(name, value);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.0.dictionary.get(name)
    }

    /// Bind every word and path in `code` to the root scope.
    pub fn bind(&self, code: &Code) {
        let root: Binding = Rc::new(DictionaryBinding(self.0.dictionary.clone()));
        bind(code, &|_: &str| Some(root.clone()));
    }

    /// Run already-bound code on a fresh cursor.
    pub fn execute(&self, code: &Code) -> EvalResult<Value> {
        Cursor::new(self.clone(), code.clone()).exec()
    }

    /// Parse, bind and execute `source`.
    pub fn eval(&self, source: &str) -> EvalResult<Value> {
        let nodes = yarilo_parser::parse("<eval>", source)?;
        let code = Code::from_nodes(&nodes);
        self.bind(&code);
        self.execute(&code)
    }

    /// The most recently produced value.
    pub fn result(&self) -> Value {
        self.0.result.borrow().clone()
    }

    pub(crate) fn set_result(&self, value: Value) {
        *self.0.result.borrow_mut() = value;
    }

    pub(crate) fn stack(&self) -> &Stack {
        &self.0.stack
    }

    /// Slots currently held by active procedure frames.
    pub fn stack_len(&self) -> usize {
        self.0.stack.borrow().len()
    }

    pub(crate) fn enter_call(&self) -> EvalResult<()> {
        let depth = self.0.depth.get();
        if depth >= self.0.config.max_call_depth {
            return Err(EvalError::CallDepthExceeded(self.0.config.max_call_depth));
        }
        self.0.depth.set(depth + 1);
        Ok(())
    }

    pub(crate) fn exit_call(&self) {
        self.0.depth.set(self.0.depth.get().saturating_sub(1));
    }

    /// Lines written by `print`.
    pub fn output(&self) -> Vec<String> {
        self.0.output.borrow().clone()
    }

    pub(crate) fn print(&self, line: String) {
        info!(output = %line, "print");
        self.0.output.borrow_mut().push(line);
    }

    /// Resume a suspend met in plain sequencing and track its task.
    pub(crate) fn auto_resume(&self, value: Value) -> EvalResult<Value> {
        match value {
            Value::Suspend(suspend) => {
                let task = suspend.resume(None)?;
                self.0.tasks.borrow_mut().push(task.clone());
                Ok(Value::Task(task))
            }
            other => Ok(other),
        }
    }

    /// Tasks resumed but not yet driven by [`settle`](Vm::settle).
    pub fn pending_tasks(&self) -> usize {
        self.0.tasks.borrow().len()
    }

    /// Drive every resumed task to completion, including tasks started
    /// while settling. Returns the first failure.
    pub async fn settle(&self) -> EvalResult<()> {
        let mut first_error = None;
        loop {
            let batch = std::mem::take(&mut *self.0.tasks.borrow_mut());
            if batch.is_empty() {
                break;
            }
            debug!(tasks = batch.len(), "settling tasks");
            for result in join_all(batch).await {
                if let Err(error) = result {
                    first_error.get_or_insert(error);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    // ── Native backings ───────────────────────────────────────────────────

    /// Make a native backing available to `Impl-Native: "name"` modules.
    pub fn register_backing(&self, name: &str, factory: BackingFactory) {
        self.0.backings.borrow_mut().insert(name.to_string(), factory);
    }

    pub(crate) fn backing_factory(&self, name: &str) -> Option<BackingFactory> {
        self.0.backings.borrow().get(name).cloned()
    }

    pub(crate) fn track_module(&self, id: &str, backing: Rc<dyn Backing>) {
        self.0.modules.borrow_mut().insert(id.to_string(), backing);
    }

    pub(crate) fn untrack_module(&self, id: &str) -> Option<Rc<dyn Backing>> {
        self.0.modules.borrow_mut().remove(id)
    }

    /// Ids of modules with a running native backing.
    pub fn running_modules(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.0.modules.borrow().keys().cloned().collect();
        ids.sort();
        ids
    }
}
