//! Error types for the reactive runtime.

use std::any::Any;

use thiserror::Error;

use crate::graph::NodeId;

/// Errors produced by the reactive runtime and its adapters.
///
/// Computation, instruction and cleanup failures are absorbed by the
/// runtime (logged, execution continues). Misuse errors are returned
/// synchronously to the caller.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// A computed or effect body panicked during a tracked run.
    #[error("computation {node} panicked: {message}")]
    ComputationPanicked { node: NodeId, message: String },

    /// An effect body returned an error.
    #[error("computation {node} failed: {message}")]
    ComputationFailed { node: NodeId, message: String },

    /// A queued instruction panicked or returned an error during flush.
    #[error("instruction {key} on {target} failed: {message}")]
    InstructionFailed {
        target: String,
        key: String,
        message: String,
    },

    /// A queued cleanup panicked or returned an error.
    #[error("cleanup {key} failed: {message}")]
    CleanupFailed { key: String, message: String },

    /// A reactive cascade fed back into itself past the configured bound.
    #[error("reactive cycle at {node}: {detail}")]
    Cycle { node: NodeId, detail: String },

    /// `flush` was called while a flush was already running.
    #[error("flush called while a flush is already in progress")]
    FlushInProgress,

    /// The effect has been disposed.
    #[error("effect {0} has been disposed")]
    Disposed(NodeId),

    /// The runtime that owns this cell or effect no longer exists.
    #[error("the owning runtime has been dropped")]
    RuntimeDropped,

    /// A runtime configuration document could not be parsed.
    #[error("invalid runtime configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// An attribute value could not be parsed.
    #[error("cannot parse attribute value {value:?} as {expected}")]
    Parse { value: String, expected: &'static str },
}

/// Render a caught panic payload as a message.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
