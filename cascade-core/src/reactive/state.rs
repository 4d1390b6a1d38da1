//! State Implementation
//!
//! A State is the fundamental reactive primitive. It holds a value and
//! notifies the computations that read it when the value changes.
//!
//! # How State Works
//!
//! 1. When a state is read within a tracked run (computed/effect), the
//!    runtime records an edge from the state to that computation.
//!
//! 2. When a state is written, the new value is compared with the old one.
//!    An unchanged value is a no-op: nothing is notified.
//!
//! 3. A changed value notifies every dependent synchronously, in the order
//!    they first subscribed. A dependent may write other states while it is
//!    being notified; those cascades run to completion before `set` returns.

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::{Rc, Weak};

use super::runtime::{Runtime, RuntimeInner};
use super::signal::Signal;
use crate::graph::{Node, NodeId};

type Sameness<T> = Box<dyn Fn(&T, &T) -> bool>;

/// A mutable reactive value of type `T`.
///
/// Cloning a `State` creates a new handle to the **same** cell. The cell is
/// removed from the dependency graph when the last handle is dropped.
///
/// # Example
///
/// ```rust
/// use cascade_core::Runtime;
///
/// let runtime = Runtime::new();
/// let count = runtime.state(0);
///
/// count.set(5);
/// count.update(|v| v + 1);
/// assert_eq!(count.get(), 6);
/// ```
pub struct State<T: 'static> {
    inner: Rc<StateInner<T>>,
}

struct StateInner<T: 'static> {
    id: NodeId,
    runtime: Weak<RuntimeInner>,
    value: RefCell<T>,
    same: Sameness<T>,
}

impl<T: 'static> State<T> {
    /// Create a state cell compared with `PartialEq`.
    pub fn new(runtime: &Runtime, value: T) -> Self
    where
        T: PartialEq,
    {
        Self::with_comparator(runtime, value, <T as PartialEq>::eq)
    }

    /// Create a state cell with a custom sameness check.
    ///
    /// `same(old, new)` returning true makes a write a no-op. Use
    /// `Rc::ptr_eq` for identity semantics on shared values.
    pub fn with_comparator<F>(runtime: &Runtime, value: T, same: F) -> Self
    where
        F: Fn(&T, &T) -> bool + 'static,
    {
        let id = NodeId::new();
        let runtime = runtime.downgrade();
        if let Some(rt) = runtime.upgrade() {
            rt.register(Node::source(id));
        }

        Self {
            inner: Rc::new(StateInner {
                id,
                runtime,
                value: RefCell::new(value),
                same: Box::new(same),
            }),
        }
    }

    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Get the current value.
    ///
    /// If called within a tracked run, this also records the running
    /// computation as a dependent.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.track();
        self.inner.value.borrow().clone()
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }

    /// Read the value by reference, tracking like `get`.
    ///
    /// Writing this state from inside `f` panics.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&*self.inner.value.borrow())
    }

    /// Set a new value and notify dependents if it differs from the old one.
    pub fn set(&self, value: T) {
        let unchanged = (self.inner.same)(&*self.inner.value.borrow(), &value);
        if unchanged {
            return;
        }

        let previous = self.inner.value.replace(value);
        drop(previous);
        self.notify();
    }

    /// Update the value using a function of the old value.
    ///
    /// The function sees a copy of the old value, so it may read or write
    /// this state itself. Its return value is written last and wins.
    pub fn update<F>(&self, f: F)
    where
        T: Clone,
        F: FnOnce(&T) -> T,
    {
        let current = self.get_untracked();
        let next = f(&current);
        self.set(next);
    }

    /// Number of computations that read this state during their latest run.
    pub fn dependent_count(&self) -> usize {
        self.inner
            .runtime
            .upgrade()
            .map(|rt| rt.dependent_count(self.inner.id))
            .unwrap_or(0)
    }

    fn track(&self) {
        if let Some(rt) = self.inner.runtime.upgrade() {
            rt.track(self.inner.id);
        }
    }

    fn notify(&self) {
        if let Some(rt) = self.inner.runtime.upgrade() {
            rt.notify_dependents(self.inner.id);
        }
    }
}

impl<T: Clone + 'static> Signal<T> for State<T> {
    fn get(&self) -> T {
        State::get(self)
    }

    fn get_untracked(&self) -> T {
        State::get_untracked(self)
    }

    fn id(&self) -> NodeId {
        self.inner.id
    }
}

impl<T: 'static> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Drop for StateInner<T> {
    fn drop(&mut self) {
        if let Some(rt) = self.runtime.upgrade() {
            rt.release(self.id);
        }
    }
}

impl<T: Debug + 'static> Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .field("dependent_count", &self.dependent_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn state_get_and_set() {
        let runtime = Runtime::new();
        let state = runtime.state(0);
        assert_eq!(state.get(), 0);

        state.set(42);
        assert_eq!(state.get(), 42);
    }

    #[test]
    fn state_update() {
        let runtime = Runtime::new();
        let state = runtime.state(10);
        state.update(|v| v + 5);
        assert_eq!(state.get(), 15);
    }

    #[test]
    fn update_closure_may_write_same_state() {
        let runtime = Runtime::new();
        let state = runtime.state(1);

        let s = state.clone();
        state.update(move |v| {
            s.set(100);
            v + 1
        });
        assert_eq!(state.get(), 2);
    }

    #[test]
    fn state_notifies_dependents_on_change() {
        let runtime = Runtime::new();
        let state = runtime.state(0);
        let runs = Rc::new(Cell::new(0));

        let (s, r) = (state.clone(), runs.clone());
        let _effect = runtime.effect(move |_| {
            s.get();
            r.set(r.get() + 1);
        });
        assert_eq!(runs.get(), 1);

        state.set(1);
        assert_eq!(runs.get(), 2);

        state.set(2);
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn same_value_is_a_no_op() {
        let runtime = Runtime::new();
        let state = runtime.state("a".to_string());
        let runs = Rc::new(Cell::new(0));

        let (s, r) = (state.clone(), runs.clone());
        let _effect = runtime.effect(move |_| {
            s.get();
            r.set(r.get() + 1);
        });

        state.set("a".to_string());
        state.update(|v| v.clone());
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn custom_comparator_uses_identity() {
        let runtime = Runtime::new();
        let shared = Rc::new(vec![1, 2, 3]);
        let state = State::with_comparator(&runtime, shared.clone(), Rc::ptr_eq);
        let runs = Rc::new(Cell::new(0));

        let (s, r) = (state.clone(), runs.clone());
        let _effect = runtime.effect(move |_| {
            s.get();
            r.set(r.get() + 1);
        });

        state.set(shared.clone());
        assert_eq!(runs.get(), 1);

        // Deep-equal but a different allocation.
        state.set(Rc::new(vec![1, 2, 3]));
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn untracked_read_does_not_subscribe() {
        let runtime = Runtime::new();
        let state = runtime.state(1);

        let s = state.clone();
        let _effect = runtime.effect(move |_| {
            s.get_untracked();
        });

        assert_eq!(state.dependent_count(), 0);
    }

    #[test]
    fn state_clone_shares_cell() {
        let runtime = Runtime::new();
        let state1 = runtime.state(0);
        let state2 = state1.clone();

        state1.set(42);
        assert_eq!(state2.get(), 42);
        assert_eq!(state1.id(), state2.id());
    }

    #[test]
    fn dropping_last_handle_removes_node() {
        let runtime = Runtime::new();
        let state = runtime.state(0);
        assert_eq!(runtime.node_count(), 1);

        drop(state);
        assert_eq!(runtime.node_count(), 0);
    }

    #[test]
    fn state_outlives_runtime() {
        let runtime = Runtime::new();
        let state = runtime.state(1);
        drop(runtime);

        state.set(2);
        assert_eq!(state.get(), 2);
    }
}
