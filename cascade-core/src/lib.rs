//! Cascade Core
//!
//! This crate provides the core runtime for the Cascade reactive UI engine.
//! It implements:
//!
//! - Reactive primitives (state, computed, effects)
//! - Automatic, per-run dependency tracking over an explicit graph
//! - A batching scheduler that applies deferred host mutations once per tick
//! - Binding adapters that connect signals to host elements
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: the runtime and its reactive primitives
//! - `graph`: the dependency graph the runtime tracks edges in
//! - `scheduler`: instruction and cleanup queues, flush and tick strategies
//! - `binding`: host elements, attribute parsers and binding helpers
//! - `diagnostics`: the logging sink for host code
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use cascade_core::Runtime;
//!
//! let runtime = Runtime::new();
//! let count = runtime.state(1);
//! let applied = Rc::new(Cell::new(0));
//!
//! let (c, out) = (count.clone(), applied.clone());
//! runtime.effect(move |queue| {
//!     let value = c.get() * 2;
//!     let out = out.clone();
//!     queue.enqueue("x", "value", move || out.set(value));
//! });
//!
//! count.set(2);
//! runtime.flush().unwrap();
//! assert_eq!(applied.get(), 4);
//! ```

pub mod binding;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod reactive;
pub mod scheduler;

pub use config::RuntimeConfig;
pub use error::ReactiveError;
pub use reactive::{Computed, EffectHandle, EffectQueue, Runtime, Signal, State};
pub use scheduler::{Cleanup, FlushReport};
