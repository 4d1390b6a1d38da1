//! Subscriber types for the reactive system.
//!
//! A Subscriber is any computation that depends on reactive values: a
//! computed cell or an effect. The graph stores weak references to
//! subscribers and calls [`Subscriber::notify`] when one of their
//! dependencies changes.

/// Something that wants to hear about changes to the values it read.
pub trait Subscriber {
    /// One of this subscriber's dependencies changed.
    ///
    /// Called synchronously from the producer's write. Implementations may
    /// re-run user code, which may in turn write other cells.
    fn notify(&self);
}
