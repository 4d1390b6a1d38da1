//! The readable-signal abstraction shared by state and computed cells.

use crate::graph::NodeId;

/// A reactive value producer.
///
/// Reading through [`Signal::get`] inside a computed or effect records a
/// dependency on this signal. Binding helpers accept any `Signal`, so a
/// host can bind either a raw state cell or a derived one.
pub trait Signal<T> {
    /// Read the value, recording a dependency if a computation is running.
    fn get(&self) -> T;

    /// Read the value without recording a dependency.
    fn get_untracked(&self) -> T;

    /// Graph identity of this signal.
    fn id(&self) -> NodeId;
}
