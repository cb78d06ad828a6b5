//! Deferred streaming computations and the `pipe` combinator.

use crate::error::{EvalError, EvalResult};
use crate::stream::{Forward, Publisher, Subscriber};
use crate::value::Value;
use futures::channel::oneshot;
use futures::future::{join, FutureExt, LocalBoxFuture, Shared};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendState {
    Created,
    Resuming,
    Completed,
    Failed,
}

/// Starts the computation. Receives the upstream publisher, if any, and
/// returns a future that does the actual work when first polled.
pub type ResumeFn = Box<dyn FnOnce(Option<Publisher>) -> LocalBoxFuture<'static, EvalResult<()>>>;

/// A deferred computation: does nothing until [`resume`](Suspend::resume),
/// publishes results on [`out`](Suspend::out), and optionally consumes an
/// upstream publisher.
#[derive(Clone)]
pub struct Suspend(Rc<SuspendInner>);

struct SuspendInner {
    state: Rc<Cell<SuspendState>>,
    start: RefCell<Option<ResumeFn>>,
    out: Publisher,
    accepts_input: bool,
    mime: Option<String>,
}

impl Suspend {
    pub fn new(out: Publisher, accepts_input: bool, mime: Option<String>, start: ResumeFn) -> Self {
        Self(Rc::new(SuspendInner {
            state: Rc::new(Cell::new(SuspendState::Created)),
            start: RefCell::new(Some(start)),
            out,
            accepts_input,
            mime,
        }))
    }

    pub fn out(&self) -> &Publisher {
        &self.0.out
    }

    pub fn accepts_input(&self) -> bool {
        self.0.accepts_input
    }

    /// Content tag declared by `native-async`.
    pub fn mime(&self) -> Option<&str> {
        self.0.mime.as_deref()
    }

    pub fn state(&self) -> SuspendState {
        self.0.state.get()
    }

    pub fn ptr_eq(&self, other: &Suspend) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Start the computation. Allowed once; the returned [`Task`] completes
    /// when the computation does.
    pub fn resume(&self, input: Option<Publisher>) -> EvalResult<Task> {
        if self.state() != SuspendState::Created {
            return Err(EvalError::AlreadyResumed);
        }
        if input.is_some() && !self.accepts_input() {
            return Err(EvalError::MissingInputCapability);
        }
        let start = self
            .0
            .start
            .borrow_mut()
            .take()
            .ok_or(EvalError::AlreadyResumed)?;
        self.0.state.set(SuspendState::Resuming);
        trace!(input = input.is_some(), "suspend resuming");

        let state = Rc::clone(&self.0.state);
        let body = start(input);
        let future = async move {
            let result = body.await;
            let finished = if result.is_ok() {
                SuspendState::Completed
            } else {
                SuspendState::Failed
            };
            state.set(finished);
            trace!(state = ?finished, "suspend finished");
            result
        }
        .boxed_local()
        .shared();

        Ok(Task {
            future,
            out: self.0.out.clone(),
        })
    }
}

impl fmt::Debug for Suspend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suspend")
            .field("state", &self.state())
            .field("accepts_input", &self.accepts_input())
            .field("mime", &self.mime())
            .finish()
    }
}

/// A resumed [`Suspend`]. Awaiting it (from any clone) drives the work.
#[derive(Clone)]
pub struct Task {
    future: Shared<LocalBoxFuture<'static, EvalResult<()>>>,
    out: Publisher,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").finish_non_exhaustive()
    }
}

impl Task {
    pub fn out(&self) -> &Publisher {
        &self.out
    }

    /// The outcome, once finished.
    pub fn result(&self) -> Option<EvalResult<()>> {
        self.future.peek().cloned()
    }
}

impl Future for Task {
    type Output = EvalResult<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.poll_unpin(cx)
    }
}

/// Wire `left`'s output into `right`'s input.
///
/// Fails before anything runs if `right` cannot take input. The result
/// publishes on `right`'s output, accepts input iff `left` does, and resumes
/// both sides together.
pub fn pipe(left: &Suspend, right: &Suspend) -> EvalResult<Suspend> {
    if !right.accepts_input() {
        return Err(EvalError::MissingInputCapability);
    }
    if left.state() != SuspendState::Created || right.state() != SuspendState::Created {
        return Err(EvalError::AlreadyResumed);
    }

    let relay = Publisher::new();
    left.out().subscribe(Rc::new(Forward(relay.clone())))?;
    debug!(chained_input = left.accepts_input(), "pipe wired");

    let accepts_input = left.accepts_input();
    let out = right.out().clone();
    let (left, right) = (left.clone(), right.clone());
    Ok(Suspend::new(
        out,
        accepts_input,
        None,
        Box::new(move |input: Option<Publisher>| {
            async move {
                let upstream = left.resume(input)?;
                let downstream = right.resume(Some(relay))?;
                // Both sides run to the end so a failure upstream still
                // reaches the downstream output through the relay.
                let (upstream, downstream) = join(upstream, downstream).await;
                upstream.and(downstream)
            }
            .boxed_local()
        }),
    ))
}

// ══════════════════════════════════════════════════════════════════════════════
// Drivers shared by streaming procedures and async natives
// ══════════════════════════════════════════════════════════════════════════════

pub(crate) type Step = Rc<dyn Fn(Value) -> EvalResult<()>>;

/// Run `step` once when polled, then complete `out` (or fail it).
pub(crate) fn run_once(
    out: Publisher,
    step: impl FnOnce() -> EvalResult<()> + 'static,
) -> LocalBoxFuture<'static, EvalResult<()>> {
    async move {
        match step() {
            Ok(()) => {
                out.complete();
                Ok(())
            }
            Err(error) => {
                out.error(error.clone());
                Err(error)
            }
        }
    }
    .boxed_local()
}

/// Subscribe to `upstream` when polled and run `step` for every delivered
/// value. Finishes when upstream completes or anything fails.
pub(crate) fn run_per_value(
    upstream: Publisher,
    out: Publisher,
    step: Step,
) -> LocalBoxFuture<'static, EvalResult<()>> {
    async move {
        let (done, finished) = oneshot::channel();
        let driver = Rc::new(Driver {
            step,
            out,
            done: RefCell::new(Some(done)),
        });
        upstream.subscribe(driver)?;
        // Only the writers keep upstream alive from here on.
        drop(upstream);
        finished.await.unwrap_or_else(|_| {
            Err(EvalError::HostTaskFailure(
                "upstream dropped before completing".to_string(),
            ))
        })
    }
    .boxed_local()
}

struct Driver {
    step: Step,
    out: Publisher,
    done: RefCell<Option<oneshot::Sender<EvalResult<()>>>>,
}

impl Driver {
    fn is_finished(&self) -> bool {
        self.done.borrow().is_none()
    }

    fn finish(&self, result: EvalResult<()>) {
        let sender = self.done.borrow_mut().take();
        if let Some(sender) = sender {
            // The receiver may already be gone if the task was dropped.
            let _ = sender.send(result);
        }
    }
}

impl Subscriber<Value> for Driver {
    fn on_next(&self, value: Value) {
        if self.is_finished() {
            return;
        }
        if let Err(error) = (self.step)(value) {
            self.out.error(error.clone());
            self.finish(Err(error));
        }
    }

    fn on_error(&self, error: EvalError) {
        self.out.error(error.clone());
        self.finish(Err(error));
    }

    fn on_complete(&self) {
        self.out.complete();
        self.finish(Ok(()));
    }
}
