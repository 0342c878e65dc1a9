//! Helpers shared by the integration tests

#![allow(dead_code)]

use datawidgets::model::{REFERENCE_PREFIX, Widget, WidgetRef, WidgetRegistry};
use datawidgets::{NdArray, Result, WidgetManager};
use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use std::cell::RefCell;

pub fn vector(values: &[f32]) -> NdArray {
    NdArray::from_slice(values, vec![values.len()]).unwrap()
}

pub fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-9, "{actual:?} vs {expected:?}");
    }
}

/// Registry whose lookups stay pending until `open` is called
pub struct GatedRegistry {
    manager: WidgetManager,
    gates: RefCell<Vec<oneshot::Sender<()>>>,
}

impl GatedRegistry {
    pub fn new(manager: WidgetManager) -> Self {
        Self {
            manager,
            gates: RefCell::new(Vec::new()),
        }
    }

    pub fn open(&self) {
        for gate in self.gates.borrow_mut().drain(..) {
            let _ = gate.send(());
        }
    }
}

impl WidgetRegistry for GatedRegistry {
    fn resolve(&self, token: &str) -> LocalBoxFuture<'static, Result<WidgetRef>> {
        let (tx, rx) = oneshot::channel();
        self.gates.borrow_mut().push(tx);
        let lookup = self.manager.resolve(token);
        async move {
            let _ = rx.await;
            lookup.await
        }
        .boxed_local()
    }
}

/// Registry handing out its own tokens, `IPY_MODEL_host-<id>`
pub struct HostRegistry {
    manager: WidgetManager,
}

impl HostRegistry {
    pub fn new(manager: WidgetManager) -> Self {
        Self { manager }
    }
}

impl WidgetRegistry for HostRegistry {
    fn resolve(&self, token: &str) -> LocalBoxFuture<'static, Result<WidgetRef>> {
        self.manager.resolve(&token.replacen("host-", "", 1))
    }

    fn reference(&self, widget: &dyn Widget) -> String {
        format!("{}host-{}", REFERENCE_PREFIX, widget.model().id())
    }
}
