//! Attributes holding either inline array data or a reference to a widget

mod listener;

pub use listener::{UnionListener, listen_to_union, should_notify};

use crate::codec::{ArrayCodec, Codec, SimpleArrayCodec, TypedArrayCodec};
use crate::error::{DataError, Result};
use crate::model::{Model, SetOptions, WidgetRef, WidgetRegistry};
use crate::types::{NdArray, SimpleArray, TypedArray, UnionWire, Value, WireRecord};
use log::{debug, warn};
use std::fmt;

/// Inline value or reference to a shared widget
#[derive(Clone)]
pub enum Union<T> {
    Inline(T),
    Reference(WidgetRef),
}

/// Union over n-dimensional arrays
pub type DataUnion = Union<NdArray>;

impl<T> Union<T> {
    pub fn as_inline(&self) -> Option<&T> {
        match self {
            Union::Inline(v) => Some(v),
            Union::Reference(_) => None,
        }
    }

    pub fn as_reference(&self) -> Option<&WidgetRef> {
        match self {
            Union::Inline(_) => None,
            Union::Reference(w) => Some(w),
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Union::Reference(_))
    }
}

impl DataUnion {
    /// The array behind the union; referenced widgets are asked as data sources
    pub fn array(&self) -> Option<NdArray> {
        match self {
            Union::Inline(array) => Some(array.clone()),
            Union::Reference(widget) => widget
                .as_data_source()
                .and_then(|source| source.get_ndarray(None)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Union<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Union::Inline(v) => f.debug_tuple("Inline").field(v).finish(),
            Union::Reference(w) => f.debug_tuple("Reference").field(&w.model().id()).finish(),
        }
    }
}

impl From<NdArray> for DataUnion {
    fn from(array: NdArray) -> Self {
        Union::Inline(array)
    }
}

impl<T> From<WidgetRef> for Union<T> {
    fn from(widget: WidgetRef) -> Self {
        Union::Reference(widget)
    }
}

/// Conversion from a referenced widget's array into a flavor-specific value
pub trait FromArray: Sized {
    fn from_array(array: NdArray) -> Result<Self>;
}

impl FromArray for NdArray {
    fn from_array(array: NdArray) -> Result<Self> {
        Ok(array)
    }
}

impl FromArray for TypedArray {
    fn from_array(array: NdArray) -> Result<Self> {
        array
            .data()
            .as_typed()
            .cloned()
            .ok_or(DataError::UnknownBufferType(array.dtype()))
    }
}

impl FromArray for SimpleArray {
    fn from_array(array: NdArray) -> Result<Self> {
        Ok(SimpleArray {
            shape: array.shape().to_vec(),
            array: TypedArray::from_array(array)?,
        })
    }
}

async fn resolve_widget(token: &str, registry: &dyn WidgetRegistry) -> Result<WidgetRef> {
    debug!("resolving {}", token);
    registry.resolve(token).await
}

async fn resolve_as<T: FromArray>(token: &str, registry: &dyn WidgetRegistry) -> Result<Option<T>> {
    let widget = resolve_widget(token, registry).await?;
    let array = widget
        .as_data_source()
        .and_then(|source| source.get_ndarray(None));
    array.map(T::from_array).transpose()
}

/// Decode a union, keeping references as live widgets
pub async fn union_from_json(
    wire: Option<UnionWire>,
    registry: &dyn WidgetRegistry,
) -> Result<Option<DataUnion>> {
    match wire {
        None => Ok(None),
        Some(UnionWire::Data(record)) => Ok(ArrayCodec.decode(Some(record))?.map(Union::Inline)),
        Some(UnionWire::Reference(token)) => {
            resolve_widget(&token, registry).await.map(|w| Some(Union::Reference(w)))
        }
    }
}

/// Decode a union straight to its array
pub async fn union_array_from_json(
    wire: Option<UnionWire>,
    registry: &dyn WidgetRegistry,
) -> Result<Option<NdArray>> {
    match wire {
        None => Ok(None),
        Some(UnionWire::Data(record)) => ArrayCodec.decode(Some(record)),
        Some(UnionWire::Reference(token)) => resolve_as(&token, registry).await,
    }
}

/// Decode a union to a flat typed buffer
pub async fn union_typed_array_from_json(
    wire: Option<UnionWire>,
    registry: &dyn WidgetRegistry,
) -> Result<Option<TypedArray>> {
    match wire {
        None => Ok(None),
        Some(UnionWire::Data(record)) => TypedArrayCodec.decode(Some(record)),
        Some(UnionWire::Reference(token)) => resolve_as(&token, registry).await,
    }
}

/// Decode a union to an `{array, shape}` pair
pub async fn union_simple_from_json(
    wire: Option<UnionWire>,
    registry: &dyn WidgetRegistry,
) -> Result<Option<SimpleArray>> {
    match wire {
        None => Ok(None),
        Some(UnionWire::Data(record)) => SimpleArrayCodec.decode(Some(record)),
        Some(UnionWire::Reference(token)) => resolve_as(&token, registry).await,
    }
}

/// Encode a union: inline values go through `codec`, references become the
/// token `registry` hands out (the model's own token without a registry)
pub fn union_to_json<C>(
    value: Option<&Union<C::Value>>,
    codec: &C,
    owner: Option<&Model>,
    registry: Option<&dyn WidgetRegistry>,
) -> Result<Option<UnionWire>>
where
    C: Codec<Wire = WireRecord>,
{
    match value {
        None => Ok(None),
        Some(Union::Reference(widget)) => {
            let token = match registry {
                Some(registry) => registry.reference(widget.as_ref()),
                None => widget.model().reference(),
            };
            Ok(Some(UnionWire::Reference(token)))
        }
        Some(Union::Inline(v)) => Ok(codec.encode(Some(v), owner)?.map(UnionWire::Data)),
    }
}

/// Resolve `wire` and store it as `owner.key`.
///
/// Returns `false` without writing when the attribute changed while the
/// reference was being resolved.
pub async fn assign_from_wire(
    owner: &Model,
    key: &str,
    wire: Option<UnionWire>,
    registry: &dyn WidgetRegistry,
    options: SetOptions,
) -> Result<bool> {
    let before = owner.get(key);
    let union = union_from_json(wire, registry).await?;
    if !owner.get(key).same(&before) {
        warn!("{}.{}: discarding stale union resolution", owner.id(), key);
        return Ok(false);
    }
    owner.set_with(key, Value::from(union), options);
    Ok(true)
}
