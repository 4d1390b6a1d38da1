//! Reactive Primitives
//!
//! This module implements the core reactive system: state cells, computed
//! cells and effects, all owned by an explicit [`Runtime`].
//!
//! # Concepts
//!
//! ## State
//!
//! A State is a container for mutable data. When a state is read within a
//! tracked run (a computed or an effect), the running computation becomes a
//! dependent. When the value changes, all dependents are notified.
//!
//! ## Computed
//!
//! A Computed is a derived value that caches its result. A memoized
//! computed re-evaluates only after one of its dependencies changed, and
//! passes change notifications on to its own readers.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change. Effects enqueue instructions on the scheduler
//! instead of mutating host objects directly.
//!
//! # Implementation Notes
//!
//! There is no global state. Each runtime owns a tracker stack, and every
//! cell holds a weak reference to the runtime it was created in. Dependency
//! edges live in an explicit graph and are rebuilt on every run, so a
//! computation only ever reacts to what it read last time.

mod computed;
mod context;
mod effect;
mod runtime;
mod signal;
mod state;
mod subscriber;

pub use computed::Computed;
pub use effect::{EffectHandle, EffectOutcome, EffectQueue, EffectReturn};
pub use runtime::Runtime;
pub(crate) use runtime::RuntimeInner;
pub use signal::Signal;
pub use state::State;
pub use subscriber::Subscriber;
