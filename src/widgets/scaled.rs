//! Array derived element-wise from a source union through a scale

use crate::codec::{ArrayCodec, COMPRESSION_LEVEL};
use crate::error::{DataError, Result};
use crate::model::{
    DataSource, Emitter, Model, SetOptions, Subscription, Widget, WidgetRegistry, WriteBack,
    get_array, set_array,
};
use crate::scale::ScaleRef;
use crate::types::{ArrayData, DataType, NdArray, UnionWire, Value};
use crate::union::{
    DataUnion, UnionListener, assign_from_wire, listen_to_union, should_notify, union_to_json,
};
use futures::FutureExt;
use futures::future::{LocalBoxFuture, Shared};
use log::{debug, trace, warn};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Copy `array` into fresh storage, keeping its layout.
///
/// With `dtype` the elements are converted; only the fixed-width kinds are
/// accepted as targets.
pub fn copy_array(array: &NdArray, dtype: Option<DataType>) -> Result<NdArray> {
    let Some(dtype) = dtype else {
        return Ok(array.deep_copy());
    };
    if !dtype.is_typed() {
        return Err(DataError::UnsupportedDType(dtype));
    }
    let data = ArrayData::from_f64(dtype, &array.data().to_f64_vec())?;
    Ok(NdArray::with_layout(
        data,
        array.shape().to_vec(),
        array.stride().to_vec(),
        array.offset(),
    ))
}

/// Emitted after every recomputation of the derived array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recomputed {
    /// A new derived array was allocated (or the old one cleared)
    pub resized: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitState {
    Pending,
    Initializing,
    Ready,
    Failed,
}

struct Engine {
    model: Model,
    scaled: RefCell<Option<NdArray>>,
    state: Cell<InitState>,
    computing: Cell<bool>,
    recomputed: Emitter<Recomputed>,
    source_listener: RefCell<Option<UnionListener>>,
    subscriptions: RefCell<Vec<Subscription>>,
    registry: Option<Rc<dyn WidgetRegistry>>,
}

impl Engine {
    fn new(
        id: String,
        scale: Option<ScaleRef>,
        registry: Option<Rc<dyn WidgetRegistry>>,
    ) -> Rc<Self> {
        let model = Model::with_attributes(
            id,
            ScaledArrayModel::MODEL_NAME,
            [
                (ScaledArrayModel::SOURCE_KEY, Value::Null),
                (ScaledArrayModel::SCALE_KEY, Value::from(scale)),
                (COMPRESSION_LEVEL, Value::from(0i64)),
            ],
        );
        Rc::new(Self {
            model,
            scaled: RefCell::new(None),
            state: Cell::new(InitState::Pending),
            computing: Cell::new(false),
            recomputed: Emitter::new(),
            source_listener: RefCell::new(None),
            subscriptions: RefCell::new(Vec::new()),
            registry,
        })
    }

    fn finish_init(self: &Rc<Self>) {
        self.state.set(InitState::Ready);
        self.recompute();
        self.setup_listeners();
        debug!("{}: initialized", self.model.id());
    }

    fn setup_listeners(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);
        let listener = listen_to_union(
            &self.model,
            ScaledArrayModel::SOURCE_KEY,
            {
                let weak = weak.clone();
                move || recompute_weak(&weak)
            },
            true,
        );

        // Everything the source listener does not report itself. When it
        // already recomputed for this write, all new values were seen.
        let any = self.model.on_any_change(move |change| {
            let source_notified = change.changes.iter().any(|c| {
                c.key == ScaledArrayModel::SOURCE_KEY
                    && should_notify(c.previous.is_widget(), c.current.is_widget(), true)
            });
            if !source_notified {
                recompute_weak(&weak);
            }
        });

        *self.source_listener.borrow_mut() = Some(listener);
        self.subscriptions.borrow_mut().push(any);
    }

    fn recompute(&self) {
        if matches!(
            self.state.get(),
            InitState::Pending | InitState::Initializing
        ) {
            trace!("{}: recompute before init, skipped", self.model.id());
            return;
        }
        if self.computing.replace(true) {
            trace!("{}: recompute already running", self.model.id());
            return;
        }
        let event = self.compute();
        self.computing.set(false);

        if let Some(event) = event {
            debug!(
                "{}: recomputed (resized: {})",
                self.model.id(),
                event.resized
            );
            self.recomputed.emit(None, &event);
        }
    }

    fn compute(&self) -> Option<Recomputed> {
        let source = get_array(&self.model.get(ScaledArrayModel::SOURCE_KEY), None);
        let scale = self
            .model
            .get(ScaledArrayModel::SCALE_KEY)
            .as_scale()
            .cloned();

        let (Some(source), Some(scale)) = (source, scale) else {
            let cleared = self.scaled.borrow_mut().take().is_some();
            return cleared.then_some(Recomputed { resized: true });
        };

        let mut scaled = self.scaled.borrow_mut();
        let resized = match scaled.as_ref() {
            None => true,
            Some(current) => {
                current.shape() != source.shape() || current.dtype() != source.dtype()
            }
        };
        if resized {
            *scaled = Some(source.zeros_like());
        }
        let target = scaled.as_ref()?;
        for (i, x) in source.to_f64_vec().into_iter().enumerate() {
            target.data().set(i, scale.apply(x));
        }
        Some(Recomputed { resized })
    }

    fn scaled_data(&self) -> Option<NdArray> {
        let missing = self.scaled.borrow().is_none();
        if missing {
            self.recompute();
        }
        self.scaled.borrow().clone()
    }
}

fn recompute_weak(engine: &Weak<Engine>) {
    if let Some(engine) = engine.upgrade() {
        engine.recompute();
    }
}

/// Array model exposing `scale` applied to every element of `array`.
///
/// The derived array (`scaledData`) is not a model attribute. It is
/// recomputed whenever the source data, the scale, or any other attribute
/// changes. When shape and dtype stay the same the existing derived buffer is
/// overwritten in place, otherwise a new one is allocated.
pub struct ScaledArrayModel {
    engine: Rc<Engine>,
    init: Shared<LocalBoxFuture<'static, Result<()>>>,
}

impl ScaledArrayModel {
    pub const MODEL_NAME: &'static str = "ScaledArrayModel";
    pub const SOURCE_KEY: &'static str = "array";
    pub const SCALE_KEY: &'static str = "scale";
    pub const DERIVED_KEY: &'static str = "scaledData";

    /// Ready-to-use model over an in-memory source
    pub fn new(
        id: impl Into<String>,
        source: Option<DataUnion>,
        scale: Option<ScaleRef>,
    ) -> Rc<Self> {
        let engine = Engine::new(id.into(), scale, None);
        engine.model.set_with(
            Self::SOURCE_KEY,
            Value::from(source),
            SetOptions::silent(),
        );
        engine.finish_init();
        Rc::new(Self {
            engine,
            init: futures::future::ready(Ok(())).boxed_local().shared(),
        })
    }

    /// Model restored from serialized state.
    ///
    /// The source may reference another widget, so the model only becomes
    /// usable once [`ScaledArrayModel::ready`] resolves. If resolution fails
    /// the source stays unset, but later writes recompute as usual.
    /// `registry` also produces the tokens of [`ScaledArrayModel::state`].
    pub fn from_state(
        id: impl Into<String>,
        wire: Option<UnionWire>,
        scale: Option<ScaleRef>,
        registry: Rc<dyn WidgetRegistry>,
    ) -> Rc<Self> {
        let engine = Engine::new(id.into(), scale, Some(registry.clone()));
        let init = {
            let engine = engine.clone();
            async move {
                engine.state.set(InitState::Initializing);
                let assigned = assign_from_wire(
                    &engine.model,
                    Self::SOURCE_KEY,
                    wire,
                    registry.as_ref(),
                    SetOptions::silent(),
                )
                .await;
                match assigned {
                    Ok(_) => {
                        engine.finish_init();
                        Ok(())
                    }
                    Err(e) => {
                        warn!("{}: initialization failed: {}", engine.model.id(), e);
                        engine.state.set(InitState::Failed);
                        // Later writes still drive recomputation
                        engine.setup_listeners();
                        Err(e)
                    }
                }
            }
            .boxed_local()
            .shared()
        };
        Rc::new(Self { engine, init })
    }

    /// Resolves once the source is resolved, the derived array computed and
    /// listeners installed
    pub fn ready(&self) -> Shared<LocalBoxFuture<'static, Result<()>>> {
        self.init.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.engine.state.get() == InitState::Ready
    }

    /// Derived array, computed on first access
    pub fn scaled_data(&self) -> Option<NdArray> {
        self.engine.scaled_data()
    }

    /// Current source array, unwrapped from the union
    pub fn source(&self) -> Option<NdArray> {
        get_array(&self.engine.model.get(Self::SOURCE_KEY), None)
    }

    pub fn scale(&self) -> Option<ScaleRef> {
        self.engine.model.get(Self::SCALE_KEY).as_scale().cloned()
    }

    pub fn set_source(&self, source: Option<DataUnion>) {
        self.engine.model.set(Self::SOURCE_KEY, source);
    }

    pub fn set_scale(&self, scale: Option<ScaleRef>) {
        self.engine.model.set(Self::SCALE_KEY, scale);
    }

    /// Recompute the derived array now
    pub fn recompute(&self) {
        self.engine.recompute();
    }

    pub fn on_recomputed(&self, handler: impl Fn(&Recomputed) + 'static) -> Subscription {
        self.engine.recomputed.subscribe(None, handler)
    }

    /// Serialized source union
    pub fn state(&self) -> Result<Option<UnionWire>> {
        let source = self.engine.model.get(Self::SOURCE_KEY).to_union();
        union_to_json(
            source.as_ref(),
            &ArrayCodec,
            Some(&self.engine.model),
            self.engine.registry.as_deref(),
        )
    }

    fn write_back_derived(&self, value: Option<NdArray>, options: SetOptions) -> Result<()> {
        let model = &self.engine.model;
        let (Some(value), Some(scale)) = (value, self.scale()) else {
            return set_array(model, Self::SOURCE_KEY, None, options);
        };
        if !scale.can_invert() {
            return Err(DataError::NotWritable(Self::DERIVED_KEY.to_string()));
        }

        // Keep the source's element kind when it has one
        let dtype = self
            .source()
            .map(|s| s.dtype())
            .filter(|d| d.is_typed())
            .unwrap_or_else(|| value.dtype());
        let inverted = value
            .to_f64_vec()
            .into_iter()
            .map(|y| {
                scale
                    .invert(y)
                    .ok_or_else(|| DataError::NotWritable(Self::DERIVED_KEY.to_string()))
            })
            .collect::<Result<Vec<f64>>>()?;
        let data = ArrayData::from_f64(dtype, &inverted)?;
        let array = NdArray::new(data, value.shape().to_vec())?;
        set_array(model, Self::SOURCE_KEY, Some(array), options)
    }
}

impl DataSource for ScaledArrayModel {
    fn get_ndarray(&self, key: Option<&str>) -> Option<NdArray> {
        match key.unwrap_or(Self::DERIVED_KEY) {
            Self::DERIVED_KEY => self.scaled_data(),
            other => get_array(&self.engine.model.get(other), None),
        }
    }
}

impl WriteBack for ScaledArrayModel {
    fn can_write_back(&self, key: Option<&str>) -> bool {
        match key.unwrap_or(Self::DERIVED_KEY) {
            Self::SOURCE_KEY => true,
            Self::DERIVED_KEY => self.scale().is_none_or(|scale| scale.can_invert()),
            _ => false,
        }
    }

    fn set_ndarray(
        &self,
        value: Option<NdArray>,
        key: Option<&str>,
        options: SetOptions,
    ) -> Result<()> {
        match key.unwrap_or(Self::DERIVED_KEY) {
            Self::DERIVED_KEY => self.write_back_derived(value, options),
            other => set_array(&self.engine.model, other, value, options),
        }
    }
}

impl Widget for ScaledArrayModel {
    fn model(&self) -> &Model {
        &self.engine.model
    }

    fn as_data_source(&self) -> Option<&dyn DataSource> {
        Some(self)
    }

    fn as_write_back(&self) -> Option<&dyn WriteBack> {
        Some(self)
    }

    /// Referencing widgets see each recomputation as a data change
    fn on_data_change(&self, handler: Rc<dyn Fn()>) -> Subscription {
        self.engine.recomputed.subscribe(None, move |_| handler())
    }
}
