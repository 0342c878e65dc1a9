//! Error types for datawidgets

use crate::types::{DType, DataType};
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Result type for codec, union and widget operations
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors raised while converting, resolving or writing array data
#[derive(Debug, Clone, Error)]
pub enum DataError {
    /// The array's element type has no wire representation
    #[error("Cannot serialize ndarray with dtype: {0}")]
    UnsupportedDType(DataType),

    /// Wire dtype name not present in the dtype table
    #[error("Unknown dtype: {0:?}")]
    UnknownDType(String),

    /// Reverse dtype lookup on storage that is not a typed buffer
    #[error("Unknown TypedArray type: {0}")]
    UnknownBufferType(DataType),

    /// Fixed-shape decode received a record of another shape
    #[error("Incoming data unexpected shape: {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Fixed-shape encode received a buffer of the wrong element count
    #[error(
        "Data has wrong size for fixed shape serialization! Expected {expected} elements, got {actual}"
    )]
    SizeMismatch { expected: usize, actual: usize },

    /// Element count of a shape does not fit in memory addressing
    #[error("Shape {0:?} has too many elements")]
    ShapeOverflow(Vec<usize>),

    /// Typed extraction requested a different element type
    #[error("DType mismatch: expected {expected}, got {actual}")]
    DTypeMismatch { expected: DType, actual: DType },

    /// Byte length is not a whole number of elements
    #[error("Buffer of {len} bytes is not a multiple of the {dtype} element width")]
    MisalignedBuffer { dtype: DType, len: usize },

    /// Compressed record carries neither `buffer` nor `compressed_buffer`
    #[error("Serialized array has neither buffer nor compressed_buffer")]
    MissingBuffer,

    /// Compression level outside 0-9
    #[error("Invalid compression level: {0} (expected 0-9)")]
    InvalidCompressionLevel(u32),

    #[error("Compression failed: {0}")]
    Compression(#[source] Arc<io::Error>),

    /// Malformed deflate stream
    #[error("Decompression failed: {0}")]
    Decompression(#[source] Arc<io::Error>),

    /// String value is not a model reference token
    #[error("Invalid model reference: {0:?}")]
    InvalidReference(String),

    /// Registry has no model with this id
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Write-back into a key that cannot currently accept writes
    #[error("Cannot write back to {0:?}")]
    NotWritable(String),
}
