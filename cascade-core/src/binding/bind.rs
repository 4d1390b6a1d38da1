//! Binding helpers.
//!
//! Each helper registers one effect that reads a signal and enqueues a
//! single keyed instruction on the element. Several writes to the signal
//! within a tick therefore collapse into one host mutation at flush.

use std::fmt::Display;

use serde::Serialize;

use crate::reactive::{EffectHandle, Runtime, Signal};

use super::HostElement;

/// Keep the element's text content in sync with `signal`.
pub fn set_text<T, S>(runtime: &Runtime, element: &HostElement, signal: S) -> EffectHandle
where
    T: Display + 'static,
    S: Signal<T> + 'static,
{
    let element = element.clone();
    runtime.effect(move |queue| {
        let text = signal.get().to_string();
        let el = element.clone();
        queue.enqueue(&element, "text", move || el.set_text(text));
    })
}

/// Keep a property in sync with `signal`, serialized to a JSON value.
///
/// A value that fails to serialize makes the instruction fail at flush; the
/// previous property value is left in place.
pub fn set_property<T, S>(
    runtime: &Runtime,
    element: &HostElement,
    name: impl Into<String>,
    signal: S,
) -> EffectHandle
where
    T: Serialize + 'static,
    S: Signal<T> + 'static,
{
    let element = element.clone();
    let name = name.into();
    let key = format!("property:{name}");
    runtime.effect(move |queue| {
        let value = signal.get();
        let (el, name) = (element.clone(), name.clone());
        queue.enqueue(&element, key.clone(), move || {
            serde_json::to_value(&value).map(|json| el.set_property(name, json))
        });
    })
}

/// Keep an attribute in sync with `signal`. `None` removes the attribute.
pub fn set_attribute<T, S>(
    runtime: &Runtime,
    element: &HostElement,
    name: impl Into<String>,
    signal: S,
) -> EffectHandle
where
    T: Display + 'static,
    S: Signal<Option<T>> + 'static,
{
    let element = element.clone();
    let name = name.into();
    let key = format!("attribute:{name}");
    runtime.effect(move |queue| {
        let value = signal.get().map(|value| value.to_string());
        let (el, name) = (element.clone(), name.clone());
        queue.enqueue(&element, key.clone(), move || match value {
            Some(value) => el.set_attribute(name, value),
            None => el.remove_attribute(&name),
        });
    })
}

/// Add the attribute (with an empty value) while `signal` is true.
pub fn toggle_attribute<S>(
    runtime: &Runtime,
    element: &HostElement,
    name: impl Into<String>,
    signal: S,
) -> EffectHandle
where
    S: Signal<bool> + 'static,
{
    let element = element.clone();
    let name = name.into();
    let key = format!("attribute:{name}");
    runtime.effect(move |queue| {
        let present = signal.get();
        let (el, name) = (element.clone(), name.clone());
        queue.enqueue(&element, key.clone(), move || {
            if present {
                el.set_attribute(name, "");
            } else {
                el.remove_attribute(&name);
            }
        });
    })
}

/// Add the class while `signal` is true.
pub fn toggle_class<S>(
    runtime: &Runtime,
    element: &HostElement,
    class: impl Into<String>,
    signal: S,
) -> EffectHandle
where
    S: Signal<bool> + 'static,
{
    let element = element.clone();
    let class = class.into();
    let key = format!("class:{class}");
    runtime.effect(move |queue| {
        let enabled = signal.get();
        let (el, class) = (element.clone(), class.clone());
        queue.enqueue(&element, key.clone(), move || {
            if enabled {
                el.add_class(class);
            } else {
                el.remove_class(&class);
            }
        });
    })
}

/// Keep an inline style in sync with `signal`. `None` removes the style.
pub fn set_style<T, S>(
    runtime: &Runtime,
    element: &HostElement,
    property: impl Into<String>,
    signal: S,
) -> EffectHandle
where
    T: Display + 'static,
    S: Signal<Option<T>> + 'static,
{
    let element = element.clone();
    let property = property.into();
    let key = format!("style:{property}");
    runtime.effect(move |queue| {
        let value = signal.get().map(|value| value.to_string());
        let (el, property) = (element.clone(), property.clone());
        queue.enqueue(&element, key.clone(), move || el.set_style(property, value));
    })
}
