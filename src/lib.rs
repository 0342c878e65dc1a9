//! datawidgets - Typed n-dimensional arrays for notebook data widgets
//!
//! Serialization and change tracking for array attributes shared between a
//! notebook frontend and its kernel.
//!
//! # Features
//!
//! - Wire records `{shape, dtype, buffer}` for the 8 fixed-width dtypes
//! - Optional zlib compression driven by the owner's `compression_level`
//! - Unions of inline arrays and references to other array widgets
//! - Union listeners following referenced widgets as they change
//! - Scaled arrays recomputed from a source through a scale function
//!
//! # Example
//!
//! ```rust
//! use datawidgets::{ArrayCodec, Codec, LinearScale, NdArray, ScaledArrayModel};
//! use std::rc::Rc;
//!
//! let source = NdArray::from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 10.0], vec![2, 3]).unwrap();
//! let record = ArrayCodec.encode(Some(&source), None).unwrap().unwrap();
//! assert_eq!(record.shape, vec![2, 3]);
//!
//! let scaled = ScaledArrayModel::new(
//!     "scaled",
//!     Some(source.into()),
//!     Some(Rc::new(LinearScale::new([0.0, 10.0], [-10.0, -5.0]))),
//! );
//! let derived = scaled.scaled_data().unwrap();
//! assert_eq!(derived.get(&[0, 0]), -9.5);
//! ```

pub mod codec;
pub mod compression;
pub mod error;
pub mod model;
pub mod scale;
pub mod types;
pub mod union;
pub mod widgets;

#[cfg(feature = "ndarray")]
pub mod ndarray_ext;

// Re-export common types at crate root
pub use codec::{ArrayCodec, Codec, CompressedArrayCodec, FixedShapeCodec, SimpleArrayCodec, TypedArrayCodec};
pub use error::{DataError, Result};
pub use model::{
    DataSource, Model, SetOptions, Widget, WidgetManager, WidgetRef, WidgetRegistry, WriteBack,
    get_array, set_array,
};
pub use scale::{LinearScale, Scale, ScaleRef};
pub use types::{
    ArrayData, ByteBuffer, CompressedWireRecord, DType, DataType, NdArray, SimpleArray,
    TypedArray, UnionWire, Value, WireRecord,
};
pub use union::{DataUnion, Union, UnionListener, listen_to_union};
pub use widgets::{NdArrayModel, Recomputed, ScaledArrayModel, copy_array};
