//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects state cells,
//! computed cells and effects. It owns the dependency graph, the tracker,
//! the effect arena and the batching scheduler.
//!
//! # How It Works
//!
//! 1. Creating a cell or effect registers a node in the graph.
//!
//! 2. Running a computed or effect goes through `run_tracked`: the node's
//!    previous edges are cleared, a tracking frame is pushed, and every read
//!    inside the run adds an edge back to the node.
//!
//! 3. When a state cell changes, the runtime snapshots the cell's
//!    dependents and notifies them in insertion order:
//!    a. Computed cells mark themselves stale (memoized ones pass the
//!       notification on to their own dependents)
//!    b. Effects re-run immediately and enqueue their instructions
//!
//! 4. Enqueued instructions wait in the scheduler until the tick strategy
//!    calls `flush`.
//!
//! # Threading
//!
//! A runtime is single-threaded (`!Send`). Everything is `Rc`/`RefCell`
//! and no user code runs while a runtime borrow is held.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use super::context::Tracker;
use super::effect::{EffectHandle, EffectInner, EffectQueue, EffectReturn};
use super::{Computed, State, Subscriber};
use crate::config::RuntimeConfig;
use crate::error::{panic_message, ReactiveError};
use crate::graph::{DependencyGraph, Node, NodeId, NodeKind};
use crate::scheduler::{
    self, Cleanup, CleanupKey, FlushHandle, FlushReport, InstructionKey, ManualTick, Outcome,
    Scheduler, Target, TickStrategy,
};

/// Handle to a reactive runtime.
///
/// Cloning the handle shares the runtime. Cells and effects only hold the
/// runtime weakly; it lives as long as at least one `Runtime` handle does.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

pub struct RuntimeInner {
    config: RuntimeConfig,
    graph: RefCell<DependencyGraph>,
    tracker: Tracker,
    effects: RefCell<HashMap<NodeId, Rc<EffectInner>>>,
    scheduler: Scheduler,
    tick: Box<dyn TickStrategy>,
    notify_depth: Cell<usize>,
    orphans: RefCell<Vec<NodeId>>,
    this: Weak<RuntimeInner>,
}

impl Runtime {
    /// Create a runtime with default configuration and a [`ManualTick`].
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime with the given configuration and a [`ManualTick`].
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::with_tick(config, ManualTick::new())
    }

    /// Create a runtime that requests flushes through `tick`.
    pub fn with_tick<S>(config: RuntimeConfig, tick: S) -> Self
    where
        S: TickStrategy + 'static,
    {
        let inner = Rc::new_cyclic(|this| RuntimeInner {
            config,
            graph: RefCell::new(DependencyGraph::new()),
            tracker: Tracker::new(),
            effects: RefCell::new(HashMap::new()),
            scheduler: Scheduler::new(),
            tick: Box::new(tick),
            notify_depth: Cell::new(0),
            orphans: RefCell::new(Vec::new()),
            this: this.clone(),
        });
        Self { inner }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Create a state cell compared with `PartialEq`.
    pub fn state<T>(&self, value: T) -> State<T>
    where
        T: PartialEq + 'static,
    {
        State::new(self, value)
    }

    /// Create a computed cell. See [`Computed`] for what `memo` changes.
    pub fn computed<T, F>(&self, compute: F, memo: bool) -> Computed<T>
    where
        T: Clone + 'static,
        F: Fn() -> T + 'static,
    {
        Computed::new(self, compute, memo)
    }

    /// Create a memoized computed cell.
    pub fn memo<T, F>(&self, compute: F) -> Computed<T>
    where
        T: Clone + 'static,
        F: Fn() -> T + 'static,
    {
        Computed::new(self, compute, true)
    }

    /// Register an effect and run it once.
    ///
    /// The effect re-runs whenever a cell it read during its latest run
    /// changes, until [`EffectHandle::dispose`] is called. Dropping the
    /// handle does not stop the effect.
    pub fn effect<F, R>(&self, mut callback: F) -> EffectHandle
    where
        F: FnMut(&EffectQueue<'_>) -> R + 'static,
        R: EffectReturn,
    {
        let id = NodeId::new();
        let effect = Rc::new(EffectInner::new(id, Rc::downgrade(&self.inner), move |queue| {
            callback(queue).into_effect_outcome()
        }));

        let subscriber: Weak<dyn Subscriber> = Rc::downgrade(&effect) as Weak<dyn Subscriber>;
        self.inner
            .register(Node::consumer(id, NodeKind::Effect, subscriber));
        self.inner.effects.borrow_mut().insert(id, effect.clone());

        effect.run();
        EffectHandle::new(effect)
    }

    /// Queue an instruction for the next flush. Last write per
    /// `(target, key)` wins.
    pub fn enqueue<F, R>(&self, target: impl Into<Target>, key: impl Into<InstructionKey>, apply: F)
    where
        F: FnOnce() -> R + 'static,
        R: Outcome,
    {
        self.inner.enqueue(target.into(), key.into(), apply);
    }

    /// Queue a cleanup for the next flush. Last write per key wins.
    pub fn cleanup(&self, key: impl Into<CleanupKey>, cleanup: Cleanup) {
        self.inner.schedule_cleanup(key.into(), cleanup);
    }

    /// Apply the pending batch now.
    pub fn flush(&self) -> Result<FlushReport, ReactiveError> {
        self.inner.flush()
    }

    /// A handle the host can keep to flush later.
    pub fn flush_handle(&self) -> FlushHandle {
        FlushHandle::new(Rc::downgrade(&self.inner))
    }

    /// Number of flushes that applied a batch.
    pub fn flush_count(&self) -> u64 {
        self.inner.scheduler.flush_count()
    }

    /// Whether a flush has been requested and not yet run.
    pub fn has_pending_flush(&self) -> bool {
        self.inner.scheduler.is_pending()
    }

    /// Number of instructions waiting for the next flush.
    pub fn pending_instructions(&self) -> usize {
        self.inner.scheduler.pending_instructions()
    }

    /// Run `f` without recording any reads as dependencies.
    pub fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
        self.inner.untrack(f)
    }

    /// Whether reads are currently being recorded.
    pub fn is_tracking(&self) -> bool {
        self.inner.tracker.is_tracking()
    }

    /// Number of live nodes in the dependency graph.
    pub fn node_count(&self) -> usize {
        self.inner.graph.borrow().node_count()
    }

    /// Number of registered, undisposed effects.
    pub fn effect_count(&self) -> usize {
        self.inner.effects.borrow().len()
    }

    pub(crate) fn downgrade(&self) -> Weak<RuntimeInner> {
        Rc::downgrade(&self.inner)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("nodes", &self.node_count())
            .field("effects", &self.effect_count())
            .field("pending_flush", &self.has_pending_flush())
            .field("flush_count", &self.flush_count())
            .field("tracking_depth", &self.inner.tracker.depth())
            .finish()
    }
}

impl RuntimeInner {
    pub(crate) fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub(crate) fn register(&self, node: Node) {
        self.sweep_orphans();
        self.graph.borrow_mut().insert(node);
    }

    /// Remove a node whose owner is being dropped.
    ///
    /// Drops can happen anywhere; if the graph is busy the removal is
    /// deferred to the next registration or tracked run.
    pub(crate) fn release(&self, id: NodeId) {
        match self.graph.try_borrow_mut() {
            Ok(mut graph) => {
                graph.remove_node(id);
            }
            Err(_) => self.orphans.borrow_mut().push(id),
        }
    }

    fn sweep_orphans(&self) {
        let orphans = std::mem::take(&mut *self.orphans.borrow_mut());
        if orphans.is_empty() {
            return;
        }
        let mut graph = self.graph.borrow_mut();
        for id in orphans {
            graph.remove_node(id);
        }
    }

    /// Record a read of `producer` by the active consumer, if any.
    pub(crate) fn track(&self, producer: NodeId) {
        if let Some(consumer) = self.tracker.current() {
            self.graph.borrow_mut().add_edge(producer, consumer);
        }
    }

    /// Run `body` as `consumer`, rebuilding the consumer's edges.
    ///
    /// A panic in `body` is caught and returned as an error. Edges recorded
    /// before the panic stay in place, and the tracker is restored either
    /// way.
    pub(crate) fn run_tracked<R>(
        &self,
        consumer: NodeId,
        body: impl FnOnce() -> R,
    ) -> Result<R, ReactiveError> {
        self.sweep_orphans();
        self.graph.borrow_mut().clear_dependencies(consumer);

        let _frame = self.tracker.enter(Some(consumer));
        panic::catch_unwind(AssertUnwindSafe(body)).map_err(|payload| {
            ReactiveError::ComputationPanicked {
                node: consumer,
                message: panic_message(payload.as_ref()),
            }
        })
    }

    pub(crate) fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
        let _frame = self.tracker.enter(None);
        f()
    }

    pub(crate) fn is_running(&self, consumer: NodeId) -> bool {
        self.tracker.is_running(consumer)
    }

    /// Notify everything that read `producer` during its latest run.
    pub(crate) fn notify_dependents(&self, producer: NodeId) {
        let subscribers = self.graph.borrow().subscribers_of(producer);
        if subscribers.is_empty() {
            return;
        }

        // Cycles are cut where they re-enter: a running effect defers to an
        // extra pass and a forwarding computed ignores the echo. What remains
        // is plain graph depth, bounded only to keep the stack safe.
        let depth = self.notify_depth.get();
        if depth >= self.config.max_notify_depth {
            let err = ReactiveError::Cycle {
                node: producer,
                detail: format!(
                    "notification nesting exceeded {}",
                    self.config.max_notify_depth
                ),
            };
            tracing::warn!(node = %producer, error = %err, "dropping notification");
            return;
        }

        if self.config.trace_notifications {
            tracing::trace!(
                node = %producer,
                dependents = subscribers.len(),
                depth,
                "notifying dependents"
            );
        }

        self.notify_depth.set(depth + 1);
        let _depth = DepthGuard(&self.notify_depth);
        for (_, subscriber) in subscribers {
            subscriber.notify();
        }
    }

    pub(crate) fn dependent_count(&self, producer: NodeId) -> usize {
        self.graph.borrow().dependent_count(producer)
    }

    pub(crate) fn dependency_count(&self, consumer: NodeId) -> usize {
        self.graph.borrow().dependency_count(consumer)
    }

    pub(crate) fn enqueue<F, R>(&self, target: Target, key: InstructionKey, apply: F)
    where
        F: FnOnce() -> R + 'static,
        R: Outcome,
    {
        let requested = self
            .scheduler
            .enqueue(target, key, Box::new(move || apply().into_outcome()));
        if requested {
            self.request_flush();
        }
    }

    pub(crate) fn schedule_cleanup(&self, key: CleanupKey, cleanup: Cleanup) {
        if self.scheduler.cleanup(key, cleanup) {
            self.request_flush();
        }
    }

    /// Run the queued cleanup for `key` now, if there is one.
    pub(crate) fn run_pending_cleanup(&self, key: &CleanupKey) {
        if let Some(cleanup) = self.scheduler.take_cleanup(key) {
            // Failures are logged by run_cleanup.
            let _ = scheduler::run_cleanup(key, cleanup);
        }
    }

    fn request_flush(&self) {
        self.tick.request_flush(FlushHandle::new(self.this.clone()));
    }

    pub(crate) fn flush(&self) -> Result<FlushReport, ReactiveError> {
        self.scheduler.flush()
    }

    /// Drop a disposed effect from the graph and the arena.
    pub(crate) fn remove_effect(&self, id: NodeId) {
        let node = self.graph.borrow_mut().remove_node(id);
        debug_assert!(node.map_or(true, |node| node.kind() == NodeKind::Effect));
        let removed = self.effects.borrow_mut().remove(&id);
        drop(removed);
    }
}

struct DepthGuard<'a>(&'a Cell<usize>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}
