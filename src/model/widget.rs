//! Widget capabilities: data sources and write-back targets

use super::{Model, SetOptions, Subscription};
use crate::error::Result;
use crate::types::{NdArray, Value};
use log::debug;
use std::rc::Rc;

/// Object that can hand out an array for a key
pub trait DataSource {
    /// Array held under `key`, or under the source's default key when `None`
    fn get_ndarray(&self, key: Option<&str>) -> Option<NdArray>;
}

/// Data source that also accepts new array values
pub trait WriteBack: DataSource {
    fn can_write_back(&self, key: Option<&str>) -> bool;

    fn set_ndarray(
        &self,
        value: Option<NdArray>,
        key: Option<&str>,
        options: SetOptions,
    ) -> Result<()>;
}

/// A shared object backed by a [`Model`].
///
/// Capabilities are declared by overriding the `as_*` accessors.
pub trait Widget {
    fn model(&self) -> &Model;

    fn as_data_source(&self) -> Option<&dyn DataSource> {
        None
    }

    fn as_write_back(&self) -> Option<&dyn WriteBack> {
        None
    }

    /// Subscribe to changes of the data this widget provides
    fn on_data_change(&self, handler: Rc<dyn Fn()>) -> Subscription {
        self.model().on_any_change(move |_| handler())
    }
}

pub type WidgetRef = Rc<dyn Widget>;

pub fn is_data_source(widget: &dyn Widget) -> bool {
    widget.as_data_source().is_some()
}

pub fn is_write_back(widget: &dyn Widget) -> bool {
    widget.as_write_back().is_some()
}

/// Unwrap an attribute value to an array.
///
/// Inline arrays are returned as they are, referenced data sources are asked
/// for their array under `key`. Anything else yields `None`.
pub fn get_array(value: &Value, key: Option<&str>) -> Option<NdArray> {
    match value {
        Value::Array(array) => Some(array.clone()),
        Value::Widget(widget) => widget
            .as_data_source()
            .and_then(|source| source.get_ndarray(key)),
        _ => None,
    }
}

/// Write `value` into `owner`'s attribute `key`.
///
/// When the attribute currently references a writable widget the write is
/// delegated to it, otherwise the attribute itself is replaced.
pub fn set_array(
    owner: &Model,
    key: &str,
    value: Option<NdArray>,
    options: SetOptions,
) -> Result<()> {
    if let Value::Widget(widget) = owner.get(key) {
        if let Some(target) = widget.as_write_back() {
            if target.can_write_back(None) {
                debug!(
                    "{}.{}: writing through to {}",
                    owner.id(),
                    key,
                    widget.model().id()
                );
                return target.set_ndarray(value, None, options);
            }
        }
    }
    owner.set_with(key, value, options);
    Ok(())
}
