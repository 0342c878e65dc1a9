//! Shared-object registry: reference tokens to live widgets

use super::widget::{Widget, WidgetRef};
use crate::error::{DataError, Result};
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Prefix of serialized model references
pub const REFERENCE_PREFIX: &str = "IPY_MODEL_";

/// Extract the model id from a reference token
pub fn parse_reference(token: &str) -> Result<&str> {
    token
        .strip_prefix(REFERENCE_PREFIX)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| DataError::InvalidReference(token.to_string()))
}

/// Host lookup of shared objects by reference token
pub trait WidgetRegistry {
    /// Resolve `token` to a live widget. Resolution may suspend.
    fn resolve(&self, token: &str) -> LocalBoxFuture<'static, Result<WidgetRef>>;

    /// Reference token for `widget`
    fn reference(&self, widget: &dyn Widget) -> String {
        widget.model().reference()
    }
}

/// In-memory registry keyed by model id
#[derive(Clone, Default)]
pub struct WidgetManager {
    widgets: Rc<RefCell<HashMap<String, WidgetRef>>>,
}

impl WidgetManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `widget` under its model id, replacing any previous entry
    pub fn register(&self, widget: WidgetRef) -> Option<WidgetRef> {
        let id = widget.model().id().to_string();
        debug!("registering widget {}", id);
        self.widgets.borrow_mut().insert(id, widget)
    }

    pub fn unregister(&self, id: &str) -> Option<WidgetRef> {
        self.widgets.borrow_mut().remove(id)
    }

    pub fn get(&self, id: &str) -> Option<WidgetRef> {
        self.widgets.borrow().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.widgets.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.borrow().is_empty()
    }
}

impl WidgetRegistry for WidgetManager {
    fn resolve(&self, token: &str) -> LocalBoxFuture<'static, Result<WidgetRef>> {
        let widgets = self.widgets.clone();
        let token = token.to_string();
        async move {
            let id = parse_reference(&token)?;
            let widget = widgets.borrow().get(id).cloned();
            match widget {
                Some(widget) => {
                    debug!("resolved {}", token);
                    Ok(widget)
                }
                None => Err(DataError::UnknownModel(id.to_string())),
            }
        }
        .boxed_local()
    }
}
