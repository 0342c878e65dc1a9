//! Tracks data changes behind a union attribute

use crate::model::{Model, Subscription, WidgetRef};
use crate::types::Value;
use log::debug;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

enum Attachment {
    Unattached,
    AttachedTo {
        widget: WidgetRef,
        // Held for its Drop
        _subscription: Subscription,
    },
}

struct ListenerState {
    key: String,
    callback: Rc<dyn Fn()>,
    attachment: RefCell<Attachment>,
}

impl ListenerState {
    fn attach(&self, value: &Value) {
        let next = match value {
            Value::Widget(widget) => {
                debug!("{}: listening to {}", self.key, widget.model().id());
                Attachment::AttachedTo {
                    widget: widget.clone(),
                    _subscription: widget.on_data_change(self.callback.clone()),
                }
            }
            _ => Attachment::Unattached,
        };
        let previous = self.attachment.replace(next);
        drop(previous);
    }

    fn detach(&self) {
        let previous = self.attachment.replace(Attachment::Unattached);
        if let Attachment::AttachedTo { widget, .. } = &previous {
            debug!("{}: stopped listening to {}", self.key, widget.model().id());
        }
    }
}

/// Whether an attribute change is reported to the callback directly.
///
/// Inline-to-inline replacements and inline/reference type changes are
/// reported when `notify_on_type_change` is set. Reference swaps never are;
/// the new reference's own data changes are.
pub fn should_notify(was_reference: bool, is_reference: bool, notify_on_type_change: bool) -> bool {
    notify_on_type_change && ((!was_reference && !is_reference) || was_reference != is_reference)
}

/// Subscriptions keeping `callback` informed about one union attribute.
///
/// Dropping the listener detaches it.
#[must_use = "dropping a UnionListener detaches it"]
pub struct UnionListener {
    state: Rc<ListenerState>,
    _owner_subscription: Subscription,
}

impl UnionListener {
    /// Widget whose data changes are currently forwarded
    pub fn attached(&self) -> Option<WidgetRef> {
        match &*self.state.attachment.borrow() {
            Attachment::AttachedTo { widget, .. } => Some(widget.clone()),
            Attachment::Unattached => None,
        }
    }

    pub fn detach(self) {}
}

impl Drop for UnionListener {
    fn drop(&mut self) {
        self.state.detach();
    }
}

/// Call `callback` whenever the data behind `owner.key` changes.
///
/// A referenced widget is followed through its data-change event and
/// re-targeted whenever the attribute switches to another reference.
pub fn listen_to_union(
    owner: &Model,
    key: &str,
    callback: impl Fn() + 'static,
    notify_on_type_change: bool,
) -> UnionListener {
    let state = Rc::new(ListenerState {
        key: format!("{}.{}", owner.id(), key),
        callback: Rc::new(callback),
        attachment: RefCell::new(Attachment::Unattached),
    });
    state.attach(&owner.get(key));

    let weak: Weak<ListenerState> = Rc::downgrade(&state);
    let subscription = owner.on_change(key, move |change| {
        let Some(state) = weak.upgrade() else {
            return;
        };
        let was_reference = change.previous.is_widget();
        let is_reference = change.current.is_widget();
        if was_reference {
            state.detach();
        }
        state.attach(&change.current);
        if should_notify(was_reference, is_reference, notify_on_type_change) {
            (state.callback)();
        }
    });

    UnionListener {
        state,
        _owner_subscription: subscription,
    }
}
