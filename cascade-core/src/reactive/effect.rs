//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its callback immediately to establish
//!    its initial dependencies.
//!
//! 2. When any dependency changes, the effect re-runs synchronously. Its old
//!    edges are cleared and the reads of the new run become its edges.
//!
//! 3. The callback does not touch host objects directly. It receives an
//!    [`EffectQueue`] and enqueues keyed instructions that the scheduler
//!    applies at the next flush.
//!
//! # Cleanup
//!
//! A callback may return a [`Cleanup`]. It is queued on the scheduler under
//! the effect's own key and runs after the instructions of the next flush.
//! If the effect re-runs before that flush, the queued cleanup is taken off
//! the queue and run first, so a run never starts with its predecessor's
//! teardown still outstanding.
//!
//! # Differences from Computed
//!
//! - Computeds return a value; effects do not.
//! - Computeds are lazy (compute on access); effects are eager.
//! - Nothing can depend on an effect.

use std::cell::{Cell, RefCell};
use std::fmt::{self, Display};
use std::rc::{Rc, Weak};

use super::runtime::RuntimeInner;
use super::Subscriber;
use crate::error::ReactiveError;
use crate::graph::NodeId;
use crate::scheduler::{Cleanup, CleanupKey, InstructionKey, Outcome, Target};

/// What a single effect run produced.
#[derive(Debug)]
pub enum EffectOutcome {
    Done,
    Cleanup(Cleanup),
    Failed(String),
}

/// Values an effect callback may return.
///
/// Implemented for `()`, [`Cleanup`], `Option<Cleanup>` and for `Result`
/// of any of those with a displayable error.
pub trait EffectReturn {
    fn into_effect_outcome(self) -> EffectOutcome;
}

impl EffectReturn for () {
    fn into_effect_outcome(self) -> EffectOutcome {
        EffectOutcome::Done
    }
}

impl EffectReturn for Cleanup {
    fn into_effect_outcome(self) -> EffectOutcome {
        EffectOutcome::Cleanup(self)
    }
}

impl EffectReturn for Option<Cleanup> {
    fn into_effect_outcome(self) -> EffectOutcome {
        match self {
            Some(cleanup) => EffectOutcome::Cleanup(cleanup),
            None => EffectOutcome::Done,
        }
    }
}

impl<R: EffectReturn, E: Display> EffectReturn for Result<R, E> {
    fn into_effect_outcome(self) -> EffectOutcome {
        match self {
            Ok(value) => value.into_effect_outcome(),
            Err(err) => EffectOutcome::Failed(err.to_string()),
        }
    }
}

/// The enqueue capability handed to an effect callback.
pub struct EffectQueue<'a> {
    runtime: &'a RuntimeInner,
    owner: NodeId,
}

impl EffectQueue<'_> {
    /// Defer `apply` to the next flush. Last write per `(target, key)` wins.
    pub fn enqueue<F, R>(&self, target: impl Into<Target>, key: impl Into<InstructionKey>, apply: F)
    where
        F: FnOnce() -> R + 'static,
        R: Outcome,
    {
        self.runtime.enqueue(target.into(), key.into(), apply);
    }

    /// Defer a named cleanup to the next flush.
    pub fn cleanup(&self, key: impl Into<CleanupKey>, cleanup: Cleanup) {
        self.runtime.schedule_cleanup(key.into(), cleanup);
    }

    /// The effect this queue belongs to.
    pub fn owner(&self) -> NodeId {
        self.owner
    }
}

type Callback = Box<dyn FnMut(&EffectQueue<'_>) -> EffectOutcome>;

pub(crate) struct EffectInner {
    id: NodeId,
    runtime: Weak<RuntimeInner>,
    callback: RefCell<Callback>,
    running: Cell<bool>,
    rerun: Cell<bool>,
    disposed: Cell<bool>,
    runs: Cell<u64>,
}

impl EffectInner {
    pub(crate) fn new<F>(id: NodeId, runtime: Weak<RuntimeInner>, callback: F) -> Self
    where
        F: FnMut(&EffectQueue<'_>) -> EffectOutcome + 'static,
    {
        Self {
            id,
            runtime,
            callback: RefCell::new(Box::new(callback)),
            running: Cell::new(false),
            rerun: Cell::new(false),
            disposed: Cell::new(false),
            runs: Cell::new(0),
        }
    }

    /// Run the callback, repeating while notifications arrive mid-run.
    pub(crate) fn run(&self) {
        if self.disposed.get() {
            return;
        }
        if self.running.get() {
            self.rerun.set(true);
            return;
        }
        let Some(rt) = self.runtime.upgrade() else {
            return;
        };

        self.running.set(true);
        let _running = RunningGuard(&self.running);
        let max_passes = rt.config().max_rerun_passes.max(1);

        let mut passes = 0;
        loop {
            self.rerun.set(false);
            passes += 1;
            self.run_once(&rt);

            if !self.rerun.get() || self.disposed.get() {
                break;
            }
            if passes >= max_passes {
                let err = ReactiveError::Cycle {
                    node: self.id,
                    detail: format!("effect re-triggered itself {passes} times"),
                };
                tracing::warn!(node = %self.id, error = %err, "stopping effect re-runs");
                self.rerun.set(false);
                break;
            }
        }
    }

    fn run_once(&self, rt: &RuntimeInner) {
        let key = CleanupKey::Effect(self.id);
        rt.run_pending_cleanup(&key);

        let queue = EffectQueue {
            runtime: rt,
            owner: self.id,
        };
        let result = rt.run_tracked(self.id, || {
            let mut callback = self.callback.borrow_mut();
            (&mut *callback)(&queue)
        });
        self.runs.set(self.runs.get() + 1);

        match result {
            Ok(EffectOutcome::Done) => {}
            Ok(EffectOutcome::Cleanup(cleanup)) => rt.schedule_cleanup(key, cleanup),
            Ok(EffectOutcome::Failed(message)) => {
                let err = ReactiveError::ComputationFailed {
                    node: self.id,
                    message,
                };
                tracing::error!(node = %self.id, error = %err, "effect failed");
            }
            Err(err) => {
                tracing::error!(node = %self.id, error = %err, "effect failed");
            }
        }
    }
}

impl Subscriber for EffectInner {
    fn notify(&self) {
        self.run();
    }
}

struct RunningGuard<'a>(&'a Cell<bool>);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Handle to a registered effect.
///
/// Dropping the handle does not stop the effect; call
/// [`EffectHandle::dispose`] for that.
#[derive(Clone)]
pub struct EffectHandle {
    inner: Rc<EffectInner>,
}

impl EffectHandle {
    pub(crate) fn new(inner: Rc<EffectInner>) -> Self {
        Self { inner }
    }

    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Number of times the callback has been invoked.
    pub fn run_count(&self) -> u64 {
        self.inner.runs.get()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Number of signals read during the latest run.
    pub fn dependency_count(&self) -> usize {
        self.inner
            .runtime
            .upgrade()
            .map(|rt| rt.dependency_count(self.inner.id))
            .unwrap_or(0)
    }

    /// Stop the effect permanently.
    ///
    /// Its edges are removed and it leaves the runtime's arena. A cleanup it
    /// already queued stays in the batch and runs at the next flush.
    /// Disposing twice is a no-op.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        if let Some(rt) = self.inner.runtime.upgrade() {
            rt.remove_effect(self.inner.id);
        }
        tracing::debug!(node = %self.inner.id, "effect disposed");
    }

    /// Run the effect now, as if a dependency had changed.
    pub fn rerun(&self) -> Result<(), ReactiveError> {
        if self.inner.disposed.get() {
            return Err(ReactiveError::Disposed(self.inner.id));
        }
        if self.inner.runtime.strong_count() == 0 {
            return Err(ReactiveError::RuntimeDropped);
        }
        self.inner.run();
        Ok(())
    }
}

impl fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectHandle")
            .field("id", &self.inner.id)
            .field("run_count", &self.inner.runs.get())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
