//! Queue entries for the batching scheduler.
//!
//! Instructions are keyed by `(Target, InstructionKey)` and cleanups by
//! `CleanupKey`. Re-inserting an existing key replaces the queued function
//! in place, so the last write in a batch wins while the original position
//! (and therefore the apply order) is kept.

use std::borrow::Cow;
use std::fmt;

use indexmap::IndexMap;

use crate::graph::NodeId;

/// The object a queued instruction mutates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// A host element, by element ID.
    Element(u64),
    /// Any other target, by name.
    Named(Cow<'static, str>),
}

impl From<&'static str> for Target {
    fn from(name: &'static str) -> Self {
        Target::Named(Cow::Borrowed(name))
    }
}

impl From<String> for Target {
    fn from(name: String) -> Self {
        Target::Named(Cow::Owned(name))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Element(id) => write!(f, "element#{id}"),
            Target::Named(name) => f.write_str(name),
        }
    }
}

/// The operation or property an instruction applies to on its target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstructionKey(Cow<'static, str>);

impl InstructionKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for InstructionKey {
    fn from(key: &'static str) -> Self {
        Self(Cow::Borrowed(key))
    }
}

impl From<String> for InstructionKey {
    fn from(key: String) -> Self {
        Self(Cow::Owned(key))
    }
}

impl fmt::Display for InstructionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a queued cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CleanupKey {
    /// The cleanup returned by an effect's latest run.
    Effect(NodeId),
    /// A cleanup registered under an explicit name.
    Named(Cow<'static, str>),
}

impl From<NodeId> for CleanupKey {
    fn from(id: NodeId) -> Self {
        CleanupKey::Effect(id)
    }
}

impl From<&'static str> for CleanupKey {
    fn from(name: &'static str) -> Self {
        CleanupKey::Named(Cow::Borrowed(name))
    }
}

impl From<String> for CleanupKey {
    fn from(name: String) -> Self {
        CleanupKey::Named(Cow::Owned(name))
    }
}

impl fmt::Display for CleanupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupKey::Effect(id) => write!(f, "effect{id}"),
            CleanupKey::Named(name) => f.write_str(name),
        }
    }
}

/// Result of running a queued function.
///
/// Implemented for `()` and for `Result<(), E>` with a displayable error,
/// so queued closures can be infallible or report failures.
pub trait Outcome {
    fn into_outcome(self) -> Result<(), String>;
}

impl Outcome for () {
    fn into_outcome(self) -> Result<(), String> {
        Ok(())
    }
}

impl<E: fmt::Display> Outcome for Result<(), E> {
    fn into_outcome(self) -> Result<(), String> {
        self.map_err(|err| err.to_string())
    }
}

/// A deferred mutation waiting for the next flush.
pub(crate) type Instruction = Box<dyn FnOnce() -> Result<(), String>>;

/// A deferred teardown function.
///
/// Effects return one to release what their previous run set up.
pub struct Cleanup(Box<dyn FnOnce() -> Result<(), String>>);

impl Cleanup {
    /// Wrap a teardown function.
    pub fn new<F, R>(cleanup: F) -> Self
    where
        F: FnOnce() -> R + 'static,
        R: Outcome,
    {
        Self(Box::new(move || cleanup().into_outcome()))
    }

    pub(crate) fn into_fn(self) -> Box<dyn FnOnce() -> Result<(), String>> {
        self.0
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cleanup(..)")
    }
}

/// One batch of pending work.
#[derive(Default)]
pub(crate) struct Batch {
    pub(crate) instructions: IndexMap<Target, IndexMap<InstructionKey, Instruction>>,
    pub(crate) cleanups: IndexMap<CleanupKey, Cleanup>,
}

impl Batch {
    /// Queue an instruction, replacing any earlier one for the same key.
    pub(crate) fn insert_instruction(
        &mut self,
        target: Target,
        key: InstructionKey,
        instruction: Instruction,
    ) {
        self.instructions
            .entry(target)
            .or_default()
            .insert(key, instruction);
    }

    /// Queue a cleanup, replacing any earlier one for the same key.
    pub(crate) fn insert_cleanup(&mut self, key: CleanupKey, cleanup: Cleanup) {
        self.cleanups.insert(key, cleanup);
    }

    pub(crate) fn instruction_count(&self) -> usize {
        self.instructions.values().map(IndexMap::len).sum()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.instructions.is_empty() && self.cleanups.is_empty()
    }
}
