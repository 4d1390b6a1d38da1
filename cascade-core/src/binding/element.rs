//! In-process host elements.
//!
//! A [`HostElement`] is the object binding instructions mutate. It models
//! the parts of a UI node bindings care about: attributes, properties,
//! classes, inline styles and text content.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use crate::scheduler::Target;

static ELEMENT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Observable state of one element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementData {
    pub tag: String,
    pub attributes: IndexMap<String, String>,
    pub properties: IndexMap<String, Value>,
    pub classes: IndexSet<String>,
    pub styles: IndexMap<String, String>,
    pub text: Option<String>,
}

/// Shared handle to a host element.
///
/// Clones refer to the same element and convert into the same scheduler
/// [`Target`].
#[derive(Clone)]
pub struct HostElement {
    id: u64,
    data: Rc<RefCell<ElementData>>,
}

impl HostElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            id: ELEMENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
            data: Rc::new(RefCell::new(ElementData {
                tag: tag.into(),
                ..ElementData::default()
            })),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn tag(&self) -> String {
        self.data.borrow().tag.clone()
    }

    /// The scheduler target for instructions on this element.
    pub fn target(&self) -> Target {
        Target::Element(self.id)
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.data.borrow().attributes.get(name).cloned()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.data.borrow().attributes.contains_key(name)
    }

    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        self.data
            .borrow_mut()
            .attributes
            .insert(name.into(), value.into());
    }

    pub fn remove_attribute(&self, name: &str) {
        self.data.borrow_mut().attributes.shift_remove(name);
    }

    pub fn property(&self, name: &str) -> Option<Value> {
        self.data.borrow().properties.get(name).cloned()
    }

    pub fn set_property(&self, name: impl Into<String>, value: Value) {
        self.data.borrow_mut().properties.insert(name.into(), value);
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.data.borrow().classes.contains(class)
    }

    pub fn add_class(&self, class: impl Into<String>) {
        self.data.borrow_mut().classes.insert(class.into());
    }

    pub fn remove_class(&self, class: &str) {
        self.data.borrow_mut().classes.shift_remove(class);
    }

    /// Class names in the order they were added.
    pub fn classes(&self) -> Vec<String> {
        self.data.borrow().classes.iter().cloned().collect()
    }

    pub fn style(&self, property: &str) -> Option<String> {
        self.data.borrow().styles.get(property).cloned()
    }

    /// Set an inline style, or remove it with `None`.
    pub fn set_style(&self, property: impl Into<String>, value: Option<String>) {
        let mut data = self.data.borrow_mut();
        let property = property.into();
        match value {
            Some(value) => {
                data.styles.insert(property, value);
            }
            None => {
                data.styles.shift_remove(&property);
            }
        }
    }

    pub fn text(&self) -> Option<String> {
        self.data.borrow().text.clone()
    }

    pub fn set_text(&self, text: impl Into<String>) {
        self.data.borrow_mut().text = Some(text.into());
    }

    /// Copy of the element's current state.
    pub fn snapshot(&self) -> ElementData {
        self.data.borrow().clone()
    }
}

impl From<&HostElement> for Target {
    fn from(element: &HostElement) -> Self {
        element.target()
    }
}

impl fmt::Debug for HostElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data.borrow();
        f.debug_struct("HostElement")
            .field("id", &self.id)
            .field("tag", &data.tag)
            .field("attributes", &data.attributes)
            .field("classes", &data.classes)
            .finish()
    }
}
