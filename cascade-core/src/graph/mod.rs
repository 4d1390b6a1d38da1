//! Dependency Graph
//!
//! This module implements the explicit dependency graph that records which
//! reactive computations read which reactive values.
//!
//! # Overview
//!
//! - Nodes are state cells (`Source`), computed cells (`Derived`) or
//!   effects (`Effect`).
//! - An edge from B to A means "A read B during its latest run, so A must be
//!   notified when B changes".
//!
//! # Design Decisions
//!
//! 1. Nodes live in a single arena keyed by `NodeId`. Cells and effects only
//!    hold their ID; the graph holds weak references back to consumers, so a
//!    dropped computed never keeps receiving notifications.
//!
//! 2. Both directions are stored: dependents (for fan-out on change) and
//!    dependencies (for clearing a consumer's edges before it re-runs).
//!
//! 3. Dependents are kept in insertion order so notification order is
//!    deterministic within one runtime.

mod node;
mod store;

pub use node::{Node, NodeId, NodeKind};
pub use store::DependencyGraph;
