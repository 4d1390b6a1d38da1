//! Batching Scheduler
//!
//! Effects never touch host objects directly. They enqueue instructions,
//! and the scheduler applies them in one batch at the next tick boundary.
//!
//! # Algorithm
//!
//! 1. `enqueue` stores the instruction under `(target, key)`, replacing any
//!    earlier instruction for the same key.
//! 2. The first enqueue (or cleanup) after a flush sets the pending flag and
//!    asks the tick strategy for one flush. Later calls in the same tick only
//!    add to the batch.
//! 3. `flush` takes the whole batch and clears the pending flag, applies
//!    every instruction grouped by target, then runs every cleanup.
//! 4. A failing entry is logged and skipped; the rest of the batch still
//!    runs.
//!
//! Work enqueued while a flush is applying goes into the next batch.

mod queue;
mod tick;

pub use queue::{Cleanup, CleanupKey, InstructionKey, Outcome, Target};
pub use tick::{FlushHandle, LocalTaskTick, ManualTick, TickStrategy};

use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};

use queue::{Batch, Instruction};

use crate::error::{panic_message, ReactiveError};

/// Summary of one flush.
#[derive(Debug, Default)]
pub struct FlushReport {
    /// Instructions that ran to completion.
    pub applied: usize,
    /// Cleanups that ran to completion.
    pub cleanups: usize,
    /// Entries that panicked or returned an error.
    pub failures: Vec<ReactiveError>,
}

impl FlushReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The instruction and cleanup queues plus the pending-flush flag.
#[derive(Default)]
pub struct Scheduler {
    batch: RefCell<Batch>,
    pending: Cell<bool>,
    flushing: Cell<bool>,
    flush_count: Cell<u64>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an instruction for `(target, key)`.
    ///
    /// Returns true when this call made a flush pending, in which case the
    /// caller must request a tick.
    pub(crate) fn enqueue(
        &self,
        target: Target,
        key: InstructionKey,
        instruction: Instruction,
    ) -> bool {
        self.batch
            .borrow_mut()
            .insert_instruction(target, key, instruction);
        self.mark_pending()
    }

    /// Queue a cleanup under `key`. Same return contract as `enqueue`.
    pub(crate) fn cleanup(&self, key: CleanupKey, cleanup: Cleanup) -> bool {
        self.batch.borrow_mut().insert_cleanup(key, cleanup);
        self.mark_pending()
    }

    /// Remove a queued cleanup so it can run ahead of the flush.
    ///
    /// Taking the last queued entry also clears the pending flag.
    pub(crate) fn take_cleanup(&self, key: &CleanupKey) -> Option<Cleanup> {
        let mut batch = self.batch.borrow_mut();
        let cleanup = batch.cleanups.shift_remove(key);
        if batch.is_empty() {
            self.pending.set(false);
        }
        cleanup
    }

    fn mark_pending(&self) -> bool {
        !self.pending.replace(true)
    }

    /// Whether a flush has been requested and not yet run.
    pub fn is_pending(&self) -> bool {
        self.pending.get()
    }

    /// Number of flushes that have applied a batch.
    pub fn flush_count(&self) -> u64 {
        self.flush_count.get()
    }

    /// Number of instructions waiting for the next flush.
    pub fn pending_instructions(&self) -> usize {
        self.batch.borrow().instruction_count()
    }

    /// Apply the pending batch.
    ///
    /// Does nothing (and does not count as a flush) when the batch is
    /// empty.
    pub fn flush(&self) -> Result<FlushReport, ReactiveError> {
        if self.flushing.get() {
            return Err(ReactiveError::FlushInProgress);
        }
        if self.batch.borrow().is_empty() {
            self.pending.set(false);
            return Ok(FlushReport::default());
        }

        let batch = std::mem::take(&mut *self.batch.borrow_mut());
        self.pending.set(false);
        self.flushing.set(true);
        let _flushing = FlushingGuard(&self.flushing);

        let mut report = FlushReport::default();

        for (target, ops) in batch.instructions {
            for (key, apply) in ops {
                match run_isolated(apply) {
                    Ok(()) => report.applied += 1,
                    Err(message) => {
                        let err = ReactiveError::InstructionFailed {
                            target: target.to_string(),
                            key: key.to_string(),
                            message,
                        };
                        tracing::error!(%target, %key, error = %err, "instruction failed during flush");
                        report.failures.push(err);
                    }
                }
            }
        }

        for (key, cleanup) in batch.cleanups {
            match run_cleanup(&key, cleanup) {
                Ok(()) => report.cleanups += 1,
                Err(err) => report.failures.push(err),
            }
        }

        self.flush_count.set(self.flush_count.get() + 1);
        tracing::debug!(
            applied = report.applied,
            cleanups = report.cleanups,
            failed = report.failures.len(),
            "flush complete"
        );

        Ok(report)
    }
}

/// Run a cleanup with the same isolation as a flush entry.
pub(crate) fn run_cleanup(key: &CleanupKey, cleanup: Cleanup) -> Result<(), ReactiveError> {
    run_isolated(cleanup.into_fn()).map_err(|message| {
        let err = ReactiveError::CleanupFailed {
            key: key.to_string(),
            message,
        };
        tracing::error!(%key, error = %err, "cleanup failed");
        err
    })
}

fn run_isolated(apply: Instruction) -> Result<(), String> {
    panic::catch_unwind(AssertUnwindSafe(apply))
        .unwrap_or_else(|payload| Err(panic_message(payload.as_ref())))
}

struct FlushingGuard<'a>(&'a Cell<bool>);

impl Drop for FlushingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}
