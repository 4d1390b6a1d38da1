//! Reactive Context
//!
//! The tracker records which computation is currently running, so that
//! reading a cell can register that computation as a dependent.
//!
//! # Implementation
//!
//! Each runtime owns one tracker: a stack of frames. Running a computed or
//! an effect pushes a frame naming it; the frame is popped by a guard when
//! the run ends, including when the run panics. An untracked frame (no
//! consumer) hides the frames below it, which is how `untrack` works.
//!
//! Because frames form a stack, a computed that reads another computed
//! saves and restores the outer consumer automatically.

use std::cell::RefCell;

use crate::graph::NodeId;

/// The per-runtime stack of active consumers.
#[derive(Debug, Default)]
pub struct Tracker {
    stack: RefCell<Vec<Option<NodeId>>>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a frame for `consumer`, or an untracked frame for `None`.
    ///
    /// The frame is exited when the returned guard is dropped.
    pub fn enter(&self, consumer: Option<NodeId>) -> TrackingFrame<'_> {
        let mut stack = self.stack.borrow_mut();
        stack.push(consumer);
        TrackingFrame {
            tracker: self,
            consumer,
            depth: stack.len(),
        }
    }

    /// The consumer that reads should be attributed to, if any.
    pub fn current(&self) -> Option<NodeId> {
        self.stack.borrow().last().copied().flatten()
    }

    /// Whether reads are currently being recorded.
    pub fn is_tracking(&self) -> bool {
        self.current().is_some()
    }

    /// Whether `consumer` has a frame anywhere on the stack.
    pub fn is_running(&self, consumer: NodeId) -> bool {
        self.stack.borrow().contains(&Some(consumer))
    }

    /// Number of frames on the stack.
    pub fn depth(&self) -> usize {
        self.stack.borrow().len()
    }
}

/// Guard that pops its frame when dropped.
pub struct TrackingFrame<'a> {
    tracker: &'a Tracker,
    consumer: Option<NodeId>,
    depth: usize,
}

impl Drop for TrackingFrame<'_> {
    fn drop(&mut self) {
        let mut stack = self.tracker.stack.borrow_mut();
        debug_assert_eq!(
            stack.len(),
            self.depth,
            "tracking frames dropped out of order"
        );
        let popped = stack.pop();
        debug_assert_eq!(
            popped,
            Some(self.consumer),
            "tracking frame mismatch: expected {:?}, got {:?}",
            self.consumer,
            popped
        );
    }
}
