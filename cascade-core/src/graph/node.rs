//! Graph Nodes
//!
//! This module defines the node types that live in the dependency graph.

use std::fmt;
use std::rc::Weak;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexSet;
use smallvec::SmallVec;

use crate::reactive::Subscriber;

/// Unique identifier for a node in the dependency graph.
///
/// Identity is stable for the lifetime of the cell or effect that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A state cell. Only ever a producer.
    Source,

    /// A computed cell. Consumer of what it reads, producer to its readers.
    Derived,

    /// An effect. Only ever a consumer.
    Effect,
}

impl NodeKind {
    /// Whether nodes of this kind can record edges when they run.
    pub fn is_consumer(&self) -> bool {
        matches!(self, NodeKind::Derived | NodeKind::Effect)
    }
}

/// A node in the dependency graph.
pub struct Node {
    id: NodeId,
    kind: NodeKind,

    /// Consumers that read this node during their latest run, in the order
    /// they first subscribed.
    dependents: IndexSet<NodeId>,

    /// Producers this node read during its latest run.
    dependencies: SmallVec<[NodeId; 4]>,

    /// Notification target for consumers. Producers-only nodes have none.
    subscriber: Option<Weak<dyn Subscriber>>,
}

impl Node {
    /// Create a new node with the given kind.
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            dependents: IndexSet::new(),
            dependencies: SmallVec::new(),
            subscriber: None,
        }
    }

    /// Create a new source (state) node.
    pub fn source(id: NodeId) -> Self {
        Self::new(id, NodeKind::Source)
    }

    /// Create a consumer node that is notified through `subscriber`.
    pub fn consumer(id: NodeId, kind: NodeKind, subscriber: Weak<dyn Subscriber>) -> Self {
        debug_assert!(kind.is_consumer(), "{kind:?} nodes cannot subscribe");
        Self {
            subscriber: Some(subscriber),
            ..Self::new(id, kind)
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn subscriber(&self) -> Option<&Weak<dyn Subscriber>> {
        self.subscriber.as_ref()
    }

    /// Add a dependency (a node that this node reads from).
    pub fn add_dependency(&mut self, node_id: NodeId) {
        if !self.dependencies.contains(&node_id) {
            self.dependencies.push(node_id);
        }
    }

    /// Remove a dependency.
    pub fn remove_dependency(&mut self, node_id: NodeId) {
        self.dependencies.retain(|id| *id != node_id);
    }

    pub fn dependencies(&self) -> &[NodeId] {
        &self.dependencies
    }

    /// Take all dependencies, leaving the list empty.
    pub fn take_dependencies(&mut self) -> SmallVec<[NodeId; 4]> {
        std::mem::take(&mut self.dependencies)
    }

    /// Add a dependent (a node that reads from this node).
    ///
    /// Returns false if the dependent was already present.
    pub fn add_dependent(&mut self, node_id: NodeId) -> bool {
        self.dependents.insert(node_id)
    }

    /// Remove a dependent, keeping the order of the remaining ones.
    pub fn remove_dependent(&mut self, node_id: NodeId) {
        self.dependents.shift_remove(&node_id);
    }

    pub fn dependents(&self) -> &IndexSet<NodeId> {
        &self.dependents
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("dependents", &self.dependents)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}
