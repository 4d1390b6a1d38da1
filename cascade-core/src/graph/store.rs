//! Dependency Graph Store
//!
//! The store owns every node and keeps both edge directions consistent:
//! a producer's dependents set and a consumer's dependency list always
//! describe the same edges.
//!
//! Edges are never patched incrementally between runs. Before a consumer
//! runs, `clear_dependencies` removes every edge it owns, and the run
//! re-adds exactly the edges it reads. A branch that is no longer taken
//! therefore leaves nothing behind.

use std::collections::HashMap;
use std::rc::Rc;

use super::node::{Node, NodeId};
use crate::reactive::Subscriber;

/// Arena of graph nodes indexed by ID.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: HashMap<NodeId, Node>,
}

impl DependencyGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Add a node to the graph.
    pub fn insert(&mut self, node: Node) -> NodeId {
        let id = node.id();
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node from the graph.
    ///
    /// Also removes all edges involving this node.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let node = self.nodes.remove(&node_id)?;

        for dep_id in node.dependencies() {
            if let Some(dep) = self.nodes.get_mut(dep_id) {
                dep.remove_dependent(node_id);
            }
        }

        for dependent_id in node.dependents() {
            if let Some(dependent) = self.nodes.get_mut(dependent_id) {
                dependent.remove_dependency(node_id);
            }
        }

        Some(node)
    }

    pub fn get_node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Add a dependency edge: `dependent` depends on `dependency`.
    ///
    /// Edges to or from unknown nodes are ignored.
    pub fn add_edge(&mut self, dependency: NodeId, dependent: NodeId) {
        if dependency == dependent
            || !self.nodes.contains_key(&dependency)
            || !self.nodes.contains_key(&dependent)
        {
            return;
        }

        if let Some(dep_node) = self.nodes.get_mut(&dependency) {
            if !dep_node.add_dependent(dependent) {
                return;
            }
        }
        if let Some(dependent_node) = self.nodes.get_mut(&dependent) {
            dependent_node.add_dependency(dependency);
        }
    }

    /// Remove every edge where `consumer` is the dependent.
    ///
    /// Called before the consumer re-runs so its edge set is rebuilt from
    /// scratch.
    pub fn clear_dependencies(&mut self, consumer: NodeId) {
        let previous = match self.nodes.get_mut(&consumer) {
            Some(node) => node.take_dependencies(),
            None => return,
        };

        for dep_id in previous {
            if let Some(dep) = self.nodes.get_mut(&dep_id) {
                dep.remove_dependent(consumer);
            }
        }
    }

    /// Snapshot the live subscribers of `producer` in notification order.
    ///
    /// The returned list is owned, so callers can notify without holding a
    /// borrow of the graph while consumers rebuild their edges.
    pub fn subscribers_of(&self, producer: NodeId) -> Vec<(NodeId, Rc<dyn Subscriber>)> {
        let Some(node) = self.nodes.get(&producer) else {
            return Vec::new();
        };

        node.dependents()
            .iter()
            .filter_map(|id| {
                let subscriber = self.nodes.get(id)?.subscriber()?.upgrade()?;
                Some((*id, subscriber))
            })
            .collect()
    }

    /// Number of dependents currently recorded for `producer`.
    pub fn dependent_count(&self, producer: NodeId) -> usize {
        self.nodes
            .get(&producer)
            .map(|node| node.dependents().len())
            .unwrap_or(0)
    }

    /// Number of producers `consumer` read during its latest run.
    pub fn dependency_count(&self, consumer: NodeId) -> usize {
        self.nodes
            .get(&consumer)
            .map(|node| node.dependencies().len())
            .unwrap_or(0)
    }

    /// Get the total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}
