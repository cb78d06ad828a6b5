//! Single-subscriber publish/subscribe channel.
//!
//! A [`Publisher`] is either *buffering* (no subscriber yet: signals queue in
//! arrival order) or *subscribed* (signals go straight to the subscriber).
//! Subscribing flushes the queue exactly once. Delivery never holds the
//! internal borrow while a subscriber runs, so a subscriber may write to
//! other publishers, or re-enter this one, without panicking.

use crate::error::{EvalError, EvalResult};
use crate::value::Value;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::{debug, trace};

/// Receives what a publisher emits. Terminal signals arrive at most once.
pub trait Subscriber<T> {
    fn on_next(&self, value: T);
    fn on_error(&self, error: EvalError);
    fn on_complete(&self);
}

enum Signal<T> {
    Next(T),
    Error(EvalError),
    Complete,
}

enum State<T> {
    Buffering(VecDeque<Signal<T>>),
    Subscribed {
        subscriber: Rc<dyn Subscriber<T>>,
        backlog: VecDeque<Signal<T>>,
        draining: bool,
    },
}

struct Inner<T> {
    state: State<T>,
    terminated: bool,
}

pub struct Publisher<T = Value>(Rc<RefCell<Inner<T>>>);

impl<T> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: 'static> Default for Publisher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Publisher<T> {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(Inner {
            state: State::Buffering(VecDeque::new()),
            terminated: false,
        })))
    }

    pub fn write(&self, value: T) {
        self.emit(Signal::Next(value));
    }

    pub fn error(&self, error: EvalError) {
        self.emit(Signal::Error(error));
    }

    pub fn complete(&self) {
        self.emit(Signal::Complete);
    }

    /// Attach the one and only subscriber and flush everything queued so far.
    pub fn subscribe(&self, subscriber: Rc<dyn Subscriber<T>>) -> EvalResult<()> {
        {
            let mut inner = self.0.borrow_mut();
            let queued = match &mut inner.state {
                State::Subscribed { .. } => return Err(EvalError::AlreadySubscribed),
                State::Buffering(queue) => std::mem::take(queue),
            };
            debug!(queued = queued.len(), "flushing publisher queue");
            inner.state = State::Subscribed {
                subscriber,
                backlog: queued,
                draining: false,
            };
        }
        self.drain();
        Ok(())
    }

    pub fn is_subscribed(&self) -> bool {
        matches!(self.0.borrow().state, State::Subscribed { .. })
    }

    /// True once `complete` or `error` has been emitted.
    pub fn is_terminated(&self) -> bool {
        self.0.borrow().terminated
    }

    /// Signals waiting for a subscriber.
    pub fn queued(&self) -> usize {
        match &self.0.borrow().state {
            State::Buffering(queue) => queue.len(),
            State::Subscribed { .. } => 0,
        }
    }

    pub fn ptr_eq(&self, other: &Publisher<T>) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn emit(&self, signal: Signal<T>) {
        let deliver_now = {
            let mut inner = self.0.borrow_mut();
            if inner.terminated {
                trace!("dropping signal written after completion");
                return;
            }
            if matches!(signal, Signal::Error(_) | Signal::Complete) {
                inner.terminated = true;
            }
            match &mut inner.state {
                State::Buffering(queue) => {
                    queue.push_back(signal);
                    false
                }
                State::Subscribed {
                    backlog, draining, ..
                } => {
                    backlog.push_back(signal);
                    !*draining
                }
            }
        };
        if deliver_now {
            self.drain();
        }
    }

    /// Deliver the backlog in order. A re-entrant write lands in the backlog
    /// and is picked up by the loop already running.
    fn drain(&self) {
        loop {
            let (subscriber, signal) = {
                let mut inner = self.0.borrow_mut();
                let State::Subscribed {
                    subscriber,
                    backlog,
                    draining,
                } = &mut inner.state
                else {
                    return;
                };
                match backlog.pop_front() {
                    Some(signal) => {
                        *draining = true;
                        (Rc::clone(subscriber), signal)
                    }
                    None => {
                        *draining = false;
                        return;
                    }
                }
            };
            match signal {
                Signal::Next(value) => subscriber.on_next(value),
                Signal::Error(error) => subscriber.on_error(error),
                Signal::Complete => subscriber.on_complete(),
            }
        }
    }
}

/// Re-publishes everything it observes into another publisher.
pub struct Forward<T>(pub Publisher<T>);

impl<T: 'static> Subscriber<T> for Forward<T> {
    fn on_next(&self, value: T) {
        self.0.write(value);
    }

    fn on_error(&self, error: EvalError) {
        self.0.error(error);
    }

    fn on_complete(&self) {
        self.0.complete();
    }
}

/// Subscriber that keeps everything it receives. Handy for hosts and tests.
pub struct Collector<T> {
    items: RefCell<Vec<T>>,
    error: RefCell<Option<EvalError>>,
    completed: Cell<bool>,
}

impl<T: Clone> Collector<T> {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            items: RefCell::new(Vec::new()),
            error: RefCell::new(None),
            completed: Cell::new(false),
        })
    }

    pub fn items(&self) -> Vec<T> {
        self.items.borrow().clone()
    }

    pub fn error(&self) -> Option<EvalError> {
        self.error.borrow().clone()
    }

    pub fn is_completed(&self) -> bool {
        self.completed.get()
    }
}

impl<T> Subscriber<T> for Collector<T> {
    fn on_next(&self, value: T) {
        self.items.borrow_mut().push(value);
    }

    fn on_error(&self, error: EvalError) {
        *self.error.borrow_mut() = Some(error);
    }

    fn on_complete(&self) {
        self.completed.set(true);
    }
}
