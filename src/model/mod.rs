//! Shared models: attribute storage, change events and widget capabilities

mod events;
mod registry;
mod widget;

pub use events::{Emitter, Subscription};
pub use registry::{REFERENCE_PREFIX, WidgetManager, WidgetRegistry, parse_reference};
pub use widget::{
    DataSource, Widget, WidgetRef, WriteBack, get_array, is_data_source, is_write_back, set_array,
};

use crate::types::Value;
use log::trace;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Options for attribute writes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Update state without emitting change events
    pub silent: bool,
}

impl SetOptions {
    pub fn silent() -> Self {
        Self { silent: true }
    }
}

/// A single attribute change, delivered to `on_change` handlers
#[derive(Debug, Clone)]
pub struct AttributeChange {
    pub key: String,
    pub previous: Value,
    pub current: Value,
    pub options: SetOptions,
}

/// All attribute changes of one write, delivered once to `on_any_change` handlers
#[derive(Debug, Clone)]
pub struct ModelChange {
    pub changes: Vec<AttributeChange>,
    pub options: SetOptions,
}

impl ModelChange {
    pub fn contains(&self, key: &str) -> bool {
        self.changes.iter().any(|c| c.key == key)
    }
}

struct ModelInner {
    id: String,
    name: String,
    attributes: RefCell<HashMap<String, Value>>,
    previous: RefCell<HashMap<String, Value>>,
    attribute_changed: Emitter<AttributeChange>,
    changed: Emitter<ModelChange>,
}

/// Attribute store of a shared object.
///
/// Clones are handles to the same model. A write only counts as a change when
/// the new value is not [`Value::same`] as the stored one.
#[derive(Clone)]
pub struct Model(Rc<ModelInner>);

impl Model {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self(Rc::new(ModelInner {
            id: id.into(),
            name: name.into(),
            attributes: RefCell::new(HashMap::new()),
            previous: RefCell::new(HashMap::new()),
            attribute_changed: Emitter::new(),
            changed: Emitter::new(),
        }))
    }

    pub fn with_attributes<K, V>(
        id: impl Into<String>,
        name: impl Into<String>,
        attributes: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let model = Self::new(id, name);
        model
            .0
            .attributes
            .borrow_mut()
            .extend(attributes.into_iter().map(|(k, v)| (k.into(), v.into())));
        model
    }

    pub fn id(&self) -> &str {
        &self.0.id
    }

    /// Model class name, e.g. `NDArrayModel`
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Reference token other models use to point at this one
    pub fn reference(&self) -> String {
        format!("{}{}", REFERENCE_PREFIX, self.0.id)
    }

    /// Current value of `key`, `Null` when unset
    pub fn get(&self, key: &str) -> Value {
        self.0
            .attributes
            .borrow()
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Value of `key` before the most recent write
    pub fn previous(&self, key: &str) -> Value {
        self.0
            .previous
            .borrow()
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.set_with(key, value, SetOptions::default());
    }

    pub fn set_with(&self, key: &str, value: impl Into<Value>, options: SetOptions) {
        self.set_many([(key.to_string(), value.into())], options);
    }

    /// Write several attributes, then notify.
    ///
    /// All values are stored before the first handler runs, so handlers
    /// always observe the post-write state.
    pub fn set_many(&self, values: impl IntoIterator<Item = (String, Value)>, options: SetOptions) {
        let mut changes = Vec::new();
        {
            let mut attributes = self.0.attributes.borrow_mut();
            *self.0.previous.borrow_mut() = attributes.clone();
            for (key, value) in values {
                let previous = attributes.get(&key).cloned().unwrap_or_default();
                if previous.same(&value) {
                    continue;
                }
                attributes.insert(key.clone(), value.clone());
                changes.push(AttributeChange {
                    key,
                    previous,
                    current: value,
                    options,
                });
            }
        }

        if changes.is_empty() || options.silent {
            return;
        }
        trace!(
            "model {}: {} attribute(s) changed",
            self.0.id,
            changes.len()
        );
        for change in &changes {
            self.0.attribute_changed.emit(Some(&change.key), change);
        }
        self.0.changed.emit(None, &ModelChange { changes, options });
    }

    /// Subscribe to changes of one attribute
    pub fn on_change(
        &self,
        key: &str,
        handler: impl Fn(&AttributeChange) + 'static,
    ) -> Subscription {
        self.0.attribute_changed.subscribe(Some(key), handler)
    }

    /// Subscribe to every write that changes at least one attribute
    pub fn on_any_change(&self, handler: impl Fn(&ModelChange) + 'static) -> Subscription {
        self.0.changed.subscribe(None, handler)
    }

    /// Whether both handles refer to the same model
    pub fn ptr_eq(&self, other: &Model) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("id", &self.0.id)
            .field("name", &self.0.name)
            .finish()
    }
}
