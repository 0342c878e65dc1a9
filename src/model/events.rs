//! Subscription registry for model and widget events

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

type Handler<E> = Rc<dyn Fn(&E)>;

struct Slot<E> {
    id: u64,
    topic: Option<String>,
    handler: Handler<E>,
}

struct Registry<E> {
    next_id: Cell<u64>,
    slots: RefCell<Vec<Slot<E>>>,
}

impl<E> Registry<E> {
    fn contains(&self, id: u64) -> bool {
        self.slots.borrow().iter().any(|s| s.id == id)
    }
}

trait Unsubscribe {
    fn unsubscribe(&self, id: u64);
}

impl<E> Unsubscribe for Registry<E> {
    fn unsubscribe(&self, id: u64) {
        self.slots.borrow_mut().retain(|s| s.id != id);
    }
}

/// Event source with optional per-topic filtering.
///
/// Handlers are snapshotted before an emission; a handler cancelled by an
/// earlier handler in the same emission is skipped.
pub struct Emitter<E: 'static> {
    registry: Rc<Registry<E>>,
}

impl<E: 'static> Emitter<E> {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(Registry {
                next_id: Cell::new(0),
                slots: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Register `handler` for events on `topic`, or for every event when `None`
    pub fn subscribe(&self, topic: Option<&str>, handler: impl Fn(&E) + 'static) -> Subscription {
        let id = self.registry.next_id.get();
        self.registry.next_id.set(id + 1);
        self.registry.slots.borrow_mut().push(Slot {
            id,
            topic: topic.map(str::to_string),
            handler: Rc::new(handler),
        });
        let target: Weak<dyn Unsubscribe> = Rc::downgrade(&self.registry) as Weak<dyn Unsubscribe>;
        Subscription {
            target: Some(target),
            id,
        }
    }

    /// Deliver `event` to catch-all handlers and to handlers of `topic`
    pub fn emit(&self, topic: Option<&str>, event: &E) {
        let handlers: Vec<(u64, Handler<E>)> = self
            .registry
            .slots
            .borrow()
            .iter()
            .filter(|s| s.topic.is_none() || s.topic.as_deref() == topic)
            .map(|s| (s.id, s.handler.clone()))
            .collect();
        for (id, handler) in handlers {
            if self.registry.contains(id) {
                handler(event);
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.slots.borrow().len()
    }
}

impl<E: 'static> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a registered handler. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes its handler"]
pub struct Subscription {
    target: Option<Weak<dyn Unsubscribe>>,
    id: u64,
}

impl Subscription {
    /// Unsubscribe now
    pub fn cancel(mut self) {
        self.release();
    }

    /// Keep the handler registered for the emitter's whole lifetime
    pub fn forget(mut self) {
        self.target = None;
    }

    /// Whether the handler is still registered
    pub fn is_active(&self) -> bool {
        self.target.as_ref().and_then(Weak::upgrade).is_some()
    }

    fn release(&mut self) {
        if let Some(target) = self.target.take().and_then(|t| t.upgrade()) {
            target.unsubscribe(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
