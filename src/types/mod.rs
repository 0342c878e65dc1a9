//! Core types for datawidgets

mod array;
mod buffer;
mod dtype;
mod value;
mod wire;

pub use array::{ArrayData, NdArray, SimpleArray, element_count};
#[cfg(feature = "ndarray")]
pub(crate) use array::row_major_strides;
pub use buffer::{ByteBuffer, Element, TypedArray};
pub use dtype::{DType, DataType, ensure_serializable};
pub use value::{Value, ValueTag};
pub use wire::{CompressedWireRecord, UnionWire, WireRecord};
