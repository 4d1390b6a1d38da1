//! Computed Implementation
//!
//! A Computed is a derived value: a pure function over other signals whose
//! result is cached between reads.
//!
//! # How Computeds Work
//!
//! 1. On first access, the computed runs its function inside a tracked run
//!    and caches the result. The reads it makes become its dependencies.
//!
//! 2. Anything that reads the computed depends on the computed itself, not
//!    directly on its inputs.
//!
//! 3. When an input changes, the computed is marked stale. A memoized
//!    computed also forwards the notification to its own dependents right
//!    away, without recomputing (push the invalidation, pull the value).
//!
//! 4. A memoized computed recomputes on the next read after going stale.
//!    A non-memoized computed recomputes on every read and never forwards
//!    notifications, so computations that read it are not re-run when its
//!    inputs change.
//!
//! # Failure Modes
//!
//! - **Compute function panics**: the panic is logged, the cached value is
//!   kept and the computed stays stale so the next read retries.
//!   [`Computed::try_get`] surfaces the error; [`Computed::get`] falls back
//!   to the last good value, or to the seed given to
//!   [`Computed::with_initial`].
//! - **Computed reads itself**: reported as [`ReactiveError::Cycle`].
//! - **Memos that depend on each other**: a memo notified while it is still
//!   forwarding does not forward again, so the cascade stops.

use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug};
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use super::runtime::{Runtime, RuntimeInner};
use super::signal::Signal;
use super::Subscriber;
use crate::error::{panic_message, ReactiveError};
use crate::graph::{Node, NodeId, NodeKind};

/// A derived reactive value.
///
/// Cloning a `Computed` creates a new handle to the **same** cell.
///
/// # Example
///
/// ```rust
/// use cascade_core::Runtime;
///
/// let runtime = Runtime::new();
/// let count = runtime.state(2);
///
/// let c = count.clone();
/// let doubled = runtime.memo(move || c.get() * 2);
/// assert_eq!(doubled.get(), 4);
///
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Computed<T: 'static> {
    inner: Rc<ComputedInner<T>>,
}

struct ComputedInner<T: 'static> {
    id: NodeId,
    runtime: Weak<RuntimeInner>,
    compute: Box<dyn Fn() -> T>,
    value: RefCell<Option<T>>,
    stale: Cell<bool>,
    forwarding: Cell<bool>,
    memo: bool,
    runs: Cell<u64>,
}

impl<T: Clone + 'static> Computed<T> {
    /// Create a computed cell. The function does not run until first read.
    pub fn new<F>(runtime: &Runtime, compute: F, memo: bool) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self::build(runtime, Box::new(compute), memo, None)
    }

    /// Create a computed cell whose cache starts out as `initial`.
    ///
    /// The function still runs on first read. If it fails, reads fall back
    /// to `initial`, so [`Computed::get`] never panics for this cell.
    pub fn with_initial<F>(runtime: &Runtime, initial: T, compute: F, memo: bool) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self::build(runtime, Box::new(compute), memo, Some(initial))
    }

    fn build(runtime: &Runtime, compute: Box<dyn Fn() -> T>, memo: bool, initial: Option<T>) -> Self {
        let id = NodeId::new();
        let inner = Rc::new(ComputedInner {
            id,
            runtime: runtime.downgrade(),
            compute,
            value: RefCell::new(initial),
            stale: Cell::new(true),
            forwarding: Cell::new(false),
            memo,
            runs: Cell::new(0),
        });

        if let Some(rt) = inner.runtime.upgrade() {
            let subscriber: Weak<dyn Subscriber> = Rc::downgrade(&inner) as Weak<dyn Subscriber>;
            rt.register(Node::consumer(id, NodeKind::Derived, subscriber));
        }

        Self { inner }
    }

    /// Get the current value, recomputing if necessary.
    ///
    /// # Panics
    ///
    /// Panics if the computation fails and there is no earlier value to
    /// fall back to. Seed the cell with [`Computed::with_initial`], or use
    /// [`Computed::try_get`], when the function can fail.
    pub fn get(&self) -> T {
        match self.try_get() {
            Ok(value) => value,
            Err(err) => match self.inner.value.borrow().clone() {
                Some(value) => value,
                None => panic!("computed {} has no value: {err}", self.inner.id),
            },
        }
    }

    /// Get the current value, returning the error if recomputation failed.
    pub fn try_get(&self) -> Result<T, ReactiveError> {
        let runtime = self.inner.runtime.upgrade();
        if let Some(rt) = &runtime {
            rt.track(self.inner.id);
        }

        if self.inner.memo && !self.inner.stale.get() {
            if let Some(value) = self.inner.value.borrow().as_ref() {
                return Ok(value.clone());
            }
        }

        self.recompute(runtime.as_deref())
    }

    /// Get the cached value without tracking or recomputing.
    pub fn peek(&self) -> Option<T> {
        self.inner.value.borrow().clone()
    }

    fn recompute(&self, runtime: Option<&RuntimeInner>) -> Result<T, ReactiveError> {
        let id = self.inner.id;
        let result = match runtime {
            Some(rt) => {
                if rt.is_running(id) {
                    let err = ReactiveError::Cycle {
                        node: id,
                        detail: "computed read itself while computing".to_string(),
                    };
                    tracing::warn!(node = %id, error = %err, "computed cycle");
                    return Err(err);
                }
                rt.run_tracked(id, || (self.inner.compute)())
            }
            // Detached from its runtime: still computes, nothing to track.
            None => panic::catch_unwind(AssertUnwindSafe(|| (self.inner.compute)())).map_err(
                |payload| ReactiveError::ComputationPanicked {
                    node: id,
                    message: panic_message(payload.as_ref()),
                },
            ),
        };

        match result {
            Ok(value) => {
                let previous = self.inner.value.replace(Some(value.clone()));
                drop(previous);
                self.inner.stale.set(false);
                self.inner.runs.set(self.inner.runs.get() + 1);
                Ok(value)
            }
            Err(err) => {
                tracing::error!(node = %id, error = %err, "computed failed");
                Err(err)
            }
        }
    }
}

impl<T: 'static> Computed<T> {
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Whether the cached value is out of date.
    pub fn is_stale(&self) -> bool {
        self.inner.stale.get()
    }

    pub fn is_memo(&self) -> bool {
        self.inner.memo
    }

    /// Number of times the compute function has completed.
    pub fn run_count(&self) -> u64 {
        self.inner.runs.get()
    }

    /// Number of computations that read this computed during their latest run.
    pub fn dependent_count(&self) -> usize {
        self.inner
            .runtime
            .upgrade()
            .map(|rt| rt.dependent_count(self.inner.id))
            .unwrap_or(0)
    }

    /// Number of signals the latest computation read.
    pub fn dependency_count(&self) -> usize {
        self.inner
            .runtime
            .upgrade()
            .map(|rt| rt.dependency_count(self.inner.id))
            .unwrap_or(0)
    }
}

impl<T: 'static> Subscriber for ComputedInner<T> {
    fn notify(&self) {
        self.stale.set(true);
        if !self.memo {
            return;
        }
        // Already forwarding: the notification came back around a cycle and
        // our dependents are being told anyway.
        if self.forwarding.replace(true) {
            tracing::warn!(node = %self.id, "computed notified while forwarding, cycle cut");
            return;
        }
        let _forwarding = ForwardingGuard(&self.forwarding);
        if let Some(rt) = self.runtime.upgrade() {
            rt.notify_dependents(self.id);
        }
    }
}

struct ForwardingGuard<'a>(&'a Cell<bool>);

impl Drop for ForwardingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<T: Clone + 'static> Signal<T> for Computed<T> {
    fn get(&self) -> T {
        Computed::get(self)
    }

    fn get_untracked(&self) -> T {
        match self.inner.runtime.upgrade() {
            Some(rt) => rt.untrack(|| Computed::get(self)),
            None => Computed::get(self),
        }
    }

    fn id(&self) -> NodeId {
        self.inner.id
    }
}

impl<T: 'static> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        if let Some(rt) = self.runtime.upgrade() {
            rt.release(self.id);
        }
    }
}

impl<T: Debug + 'static> Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.inner.id)
            .field("memo", &self.inner.memo)
            .field("stale", &self.inner.stale.get())
            .field("cached", &*self.inner.value.borrow())
            .field("run_count", &self.inner.runs.get())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn counting<T: Clone + 'static>(
        runtime: &Runtime,
        memo: bool,
        f: impl Fn() -> T + 'static,
    ) -> (Computed<T>, Rc<Cell<u32>>) {
        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        let computed = runtime.computed(
            move || {
                calls_clone.set(calls_clone.get() + 1);
                f()
            },
            memo,
        );
        (computed, calls)
    }

    #[test]
    fn computed_does_not_run_until_read() {
        let runtime = Runtime::new();
        let (computed, calls) = counting(&runtime, true, || 42);

        assert_eq!(calls.get(), 0);
        assert!(computed.peek().is_none());

        assert_eq!(computed.get(), 42);
        assert_eq!(calls.get(), 1);
        assert_eq!(computed.peek(), Some(42));
    }

    #[test]
    fn memo_caches_value_when_fresh() {
        let runtime = Runtime::new();
        let (computed, calls) = counting(&runtime, true, || 42);

        assert_eq!(computed.get(), 42);
        assert_eq!(computed.get(), 42);
        assert_eq!(computed.get(), 42);
        assert_eq!(calls.get(), 1);
        assert!(!computed.is_stale());
    }

    #[test]
    fn non_memo_recomputes_on_every_read() {
        let runtime = Runtime::new();
        let (computed, calls) = counting(&runtime, false, || 42);

        computed.get();
        computed.get();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn memo_recomputes_after_input_change() {
        let runtime = Runtime::new();
        let input = runtime.state(1);
        let i = input.clone();
        let (computed, calls) = counting(&runtime, true, move || i.get() * 10);

        assert_eq!(computed.get(), 10);
        input.set(2);
        assert!(computed.is_stale());
        assert_eq!(calls.get(), 1);

        assert_eq!(computed.get(), 20);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn memo_forwards_notifications_to_readers() {
        let runtime = Runtime::new();
        let input = runtime.state(1);
        let i = input.clone();
        let doubled = runtime.memo(move || i.get() * 2);

        let seen = Rc::new(Cell::new(0));
        let (d, s) = (doubled.clone(), seen.clone());
        let _effect = runtime.effect(move |_| s.set(d.get()));
        assert_eq!(seen.get(), 2);
        assert_eq!(doubled.dependent_count(), 1);
        assert_eq!(input.dependent_count(), 1);

        input.set(4);
        assert_eq!(seen.get(), 8);
    }

    #[test]
    fn non_memo_does_not_forward_notifications() {
        let runtime = Runtime::new();
        let input = runtime.state(1);
        let i = input.clone();
        let doubled = runtime.computed(move || i.get() * 2, false);

        let runs = Rc::new(Cell::new(0));
        let (d, r) = (doubled.clone(), runs.clone());
        let _effect = runtime.effect(move |_| {
            d.get();
            r.set(r.get() + 1);
        });

        input.set(4);
        assert_eq!(runs.get(), 1);
        assert!(doubled.is_stale());
        assert_eq!(doubled.get(), 8);
    }

    #[test]
    fn chained_memos_propagate() {
        let runtime = Runtime::new();
        let base = runtime.state(5);

        let b = base.clone();
        let doubled = runtime.memo(move || b.get() * 2);
        let d = doubled.clone();
        let plus_ten = runtime.memo(move || d.get() + 10);

        assert_eq!(plus_ten.get(), 20);

        base.set(10);
        assert!(doubled.is_stale());
        assert!(plus_ten.is_stale());
        assert_eq!(plus_ten.get(), 30);
    }

    #[test]
    fn failed_compute_keeps_last_value_and_retries() {
        let runtime = Runtime::new();
        let input = runtime.state(1);
        let i = input.clone();
        let computed = runtime.memo(move || {
            let v = i.get();
            assert!(v < 10, "input out of range");
            v
        });

        assert_eq!(computed.get(), 1);

        input.set(50);
        assert!(matches!(
            computed.try_get(),
            Err(ReactiveError::ComputationPanicked { .. })
        ));
        assert_eq!(computed.get(), 1);
        assert!(computed.is_stale());
        assert!(!runtime.is_tracking());

        // The edge to the input survived the failed run.
        input.set(3);
        assert_eq!(computed.get(), 3);
    }

    #[test]
    fn self_read_is_a_cycle() {
        let runtime = Runtime::new();
        let slot: Rc<RefCell<Option<Computed<i32>>>> = Rc::new(RefCell::new(None));
        let s = slot.clone();
        let computed = runtime.memo(move || {
            let me = s.borrow().clone();
            match me {
                Some(me) => me.try_get().map(|v| v + 1).unwrap_or(-1),
                None => 0,
            }
        });
        *slot.borrow_mut() = Some(computed.clone());

        assert_eq!(computed.get(), -1);
        slot.borrow_mut().take();
    }

    #[test]
    fn initial_value_covers_failed_first_run() {
        let runtime = Runtime::new();
        let input = runtime.state(0);
        let i = input.clone();
        let computed = Computed::with_initial(
            &runtime,
            -1,
            move || {
                let v = i.get();
                assert!(v > 0, "not ready");
                v
            },
            true,
        );

        assert_eq!(computed.peek(), Some(-1));
        assert_eq!(computed.get(), -1);
        assert_eq!(computed.run_count(), 0);

        input.set(4);
        assert_eq!(computed.get(), 4);
        assert_eq!(computed.run_count(), 1);
    }

    #[test]
    fn deep_memo_chain_reaches_effect() {
        let runtime = Runtime::new();
        let source = runtime.state(0);

        let s = source.clone();
        let mut tail = runtime.memo(move || s.get());
        for _ in 0..150 {
            let prev = tail.clone();
            tail = runtime.memo(move || prev.get() + 1);
        }

        let seen = Rc::new(Cell::new(-1));
        let (t, out) = (tail.clone(), seen.clone());
        let _effect = runtime.effect(move |_| out.set(t.get()));
        assert_eq!(seen.get(), 150);

        source.set(1);
        assert_eq!(seen.get(), 151);
    }

    #[test]
    fn mutually_dependent_memos_stop_forwarding() {
        let runtime = Runtime::new();
        let input = runtime.state(1);
        let slot: Rc<RefCell<Option<Computed<i32>>>> = Rc::new(RefCell::new(None));

        let (i, s) = (input.clone(), slot.clone());
        let first = runtime.memo(move || {
            let other = s.borrow().clone();
            i.get() + other.map(|o| o.try_get().unwrap_or(0)).unwrap_or(0)
        });
        let f = first.clone();
        let second = runtime.memo(move || f.try_get().unwrap_or(0) + 1);
        *slot.borrow_mut() = Some(second.clone());

        // first reads second, whose read of first is cut as a cycle.
        assert_eq!(first.get(), 2);
        assert_eq!(first.dependent_count(), 1);
        assert_eq!(second.dependent_count(), 1);

        input.set(5);
        assert!(first.is_stale());
        assert!(second.is_stale());

        slot.borrow_mut().take();
    }

    #[test]
    fn dynamic_dependencies_follow_branch() {
        let runtime = Runtime::new();
        let use_a = runtime.state(true);
        let a = runtime.state(1);
        let b = runtime.state(2);

        let (flag, ra, rb) = (use_a.clone(), a.clone(), b.clone());
        let picked = runtime.memo(move || if flag.get() { ra.get() } else { rb.get() });

        assert_eq!(picked.get(), 1);
        assert_eq!(a.dependent_count(), 1);
        assert_eq!(b.dependent_count(), 0);

        use_a.set(false);
        assert_eq!(picked.get(), 2);
        assert_eq!(a.dependent_count(), 0);
        assert_eq!(b.dependent_count(), 1);
        assert_eq!(picked.dependency_count(), 2);
    }
}
