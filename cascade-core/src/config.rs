//! Runtime configuration.

use serde::{Deserialize, Serialize};

use crate::error::ReactiveError;

/// Tunables for a [`Runtime`](crate::reactive::Runtime).
///
/// Every field has a default, so a partial JSON document is valid:
///
/// ```rust
/// use cascade_core::RuntimeConfig;
///
/// let config = RuntimeConfig::from_json(r#"{ "max_rerun_passes": 8 }"#).unwrap();
/// assert_eq!(config.max_rerun_passes, 8);
/// assert_eq!(config.max_notify_depth, 1000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Maximum nesting of synchronous notification cascades. Cycles are
    /// stopped before they get here; this only caps how deep an acyclic
    /// chain of dependents may nest on the stack.
    pub max_notify_depth: usize,

    /// Maximum passes of one effect run. An effect notified while it is
    /// running (typically because it writes a cell it reads) makes another
    /// pass, up to this limit.
    pub max_rerun_passes: usize,

    /// Emit a `trace` event for every notification fan-out.
    pub trace_notifications: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_notify_depth: 1000,
            max_rerun_passes: 100,
            trace_notifications: false,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ReactiveError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, ReactiveError> {
        Ok(serde_json::to_string(self)?)
    }
}
