//! Attribute value parsers.
//!
//! Host attributes arrive as optional strings. The lenient `as_*` parsers
//! map an absent or malformed value to a fallback; the strict `parse_*`
//! parsers report [`ReactiveError::Parse`] instead.

use serde::de::DeserializeOwned;

use crate::error::ReactiveError;
use crate::reactive::{Runtime, State};

use super::HostElement;

/// Boolean attribute semantics: present means true, unless the value is
/// literally `false`.
pub fn as_boolean(value: Option<&str>) -> bool {
    match value {
        Some(value) => !value.trim().eq_ignore_ascii_case("false"),
        None => false,
    }
}

pub fn as_integer(value: Option<&str>, fallback: i64) -> i64 {
    value
        .and_then(|value| parse_integer(value).ok())
        .unwrap_or(fallback)
}

/// Parse a finite number. `NaN` and infinities fall back.
pub fn as_number(value: Option<&str>, fallback: f64) -> f64 {
    value
        .and_then(|value| parse_number(value).ok())
        .unwrap_or(fallback)
}

pub fn as_string(value: Option<&str>, fallback: &str) -> String {
    value.unwrap_or(fallback).to_string()
}

/// Pick the allowed variant matching `value`, ignoring ASCII case.
pub fn as_enum<'a>(value: Option<&str>, allowed: &[&'a str], fallback: &'a str) -> &'a str {
    value
        .and_then(|value| {
            let value = value.trim();
            allowed
                .iter()
                .copied()
                .find(|candidate| candidate.eq_ignore_ascii_case(value))
        })
        .unwrap_or(fallback)
}

pub fn as_json<T: DeserializeOwned>(value: Option<&str>, fallback: T) -> T {
    value
        .and_then(|value| parse_json(value).ok())
        .unwrap_or(fallback)
}

/// Strict boolean: `true`, `false`, or the empty string (present, so true).
pub fn parse_boolean(value: &str) -> Result<bool, ReactiveError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(parse_error(value, "boolean"))
    }
}

pub fn parse_integer(value: &str) -> Result<i64, ReactiveError> {
    value
        .trim()
        .parse()
        .map_err(|_| parse_error(value, "integer"))
}

pub fn parse_number(value: &str) -> Result<f64, ReactiveError> {
    match value.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(number),
        _ => Err(parse_error(value, "number")),
    }
}

pub fn parse_json<T: DeserializeOwned>(value: &str) -> Result<T, ReactiveError> {
    serde_json::from_str(value).map_err(|_| parse_error(value, "JSON"))
}

fn parse_error(value: &str, expected: &'static str) -> ReactiveError {
    ReactiveError::Parse {
        value: value.to_string(),
        expected,
    }
}

/// Seed a state cell from an element attribute.
///
/// The attribute is read once; later writes to the state do not touch the
/// attribute unless a binding is set up for it.
pub fn attribute_state<T, P>(runtime: &Runtime, element: &HostElement, name: &str, parse: P) -> State<T>
where
    T: PartialEq + 'static,
    P: FnOnce(Option<&str>) -> T,
{
    let raw = element.attribute(name);
    runtime.state(parse(raw.as_deref()))
}
