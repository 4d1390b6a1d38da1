//! Tick strategies.
//!
//! A tick strategy decides *when* a pending flush runs. The scheduler asks
//! for at most one flush at a time; the strategy receives a [`FlushHandle`]
//! and must call [`FlushHandle::flush`] exactly once at its tick boundary.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use super::FlushReport;
use crate::error::ReactiveError;
use crate::reactive::RuntimeInner;

/// Hook into the host's "next tick" primitive.
pub trait TickStrategy {
    /// A flush became pending. Arrange for `handle.flush()` to run later.
    fn request_flush(&self, handle: FlushHandle);
}

/// Deferred access to a runtime's flush.
///
/// Holds the runtime weakly, so a queued tick never keeps a dropped
/// runtime alive.
#[derive(Clone)]
pub struct FlushHandle {
    runtime: Weak<RuntimeInner>,
}

impl FlushHandle {
    pub(crate) fn new(runtime: Weak<RuntimeInner>) -> Self {
        Self { runtime }
    }

    /// Apply the owning runtime's pending batch.
    pub fn flush(&self) -> Result<FlushReport, ReactiveError> {
        let runtime = self.runtime.upgrade().ok_or(ReactiveError::RuntimeDropped)?;
        runtime.flush()
    }
}

impl std::fmt::Debug for FlushHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlushHandle")
            .field("alive", &(self.runtime.strong_count() > 0))
            .finish()
    }
}

/// The host flushes explicitly by calling `Runtime::flush`.
///
/// Counts requests so tests and hosts can tell whether a tick was asked for.
/// Clones share the counter.
#[derive(Debug, Clone, Default)]
pub struct ManualTick {
    requests: Rc<Cell<u64>>,
}

impl ManualTick {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of flushes requested so far.
    pub fn requests(&self) -> u64 {
        self.requests.get()
    }
}

impl TickStrategy for ManualTick {
    fn request_flush(&self, _handle: FlushHandle) {
        self.requests.set(self.requests.get() + 1);
    }
}

/// Flush on the next turn of a tokio `LocalSet`.
///
/// The flush task yields once before flushing, so every enqueue made by the
/// currently running synchronous code lands in the same batch.
///
/// # Panics
///
/// Requesting a flush outside of a `LocalSet` panics, like
/// `tokio::task::spawn_local` does.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTaskTick;

impl TickStrategy for LocalTaskTick {
    fn request_flush(&self, handle: FlushHandle) {
        tokio::task::spawn_local(async move {
            tokio::task::yield_now().await;
            if let Err(err) = handle.flush() {
                tracing::warn!(error = %err, "scheduled flush did not run");
            }
        });
    }
}
