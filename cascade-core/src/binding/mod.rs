//! Declarative Bindings
//!
//! Adapters that connect signals to host elements. A binding is an effect
//! that reads a signal and enqueues one keyed instruction per run, so the
//! scheduler collapses repeated writes into a single host mutation per
//! flush.
//!
//! Attribute parsers turn raw attribute strings into typed values, usually
//! to seed a state cell with [`attribute_state`].

mod bind;
mod element;
mod parse;

pub use bind::{set_attribute, set_property, set_style, set_text, toggle_attribute, toggle_class};
pub use element::{ElementData, HostElement};
pub use parse::{
    as_boolean, as_enum, as_integer, as_json, as_number, as_string, attribute_state,
    parse_boolean, parse_integer, parse_json, parse_number,
};
