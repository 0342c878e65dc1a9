//! Serialized array records as exchanged with the backend

use super::buffer::ByteBuffer;
use super::dtype::DataType;
use serde::{Deserialize, Serialize};

/// Plain serialized array: `{shape, dtype, buffer}`.
///
/// Encoders only emit the 8 fixed-width dtypes; `uint8_clamped` is accepted
/// on decode and yields clamped storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRecord {
    pub shape: Vec<usize>,
    pub dtype: DataType,
    pub buffer: ByteBuffer,
}

/// Serialized array whose payload may be deflate-compressed.
///
/// Exactly one of `buffer` / `compressed_buffer` is present on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressedWireRecord {
    pub shape: Vec<usize>,
    pub dtype: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer: Option<ByteBuffer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressed_buffer: Option<ByteBuffer>,
}

impl CompressedWireRecord {
    pub fn is_compressed(&self) -> bool {
        self.compressed_buffer.is_some()
    }
}

impl From<WireRecord> for CompressedWireRecord {
    fn from(record: WireRecord) -> Self {
        Self {
            shape: record.shape,
            dtype: record.dtype,
            buffer: Some(record.buffer),
            compressed_buffer: None,
        }
    }
}

/// Serialized union value: a model reference token or inline array data.
///
/// `null` is represented by the surrounding `Option`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnionWire {
    Reference(String),
    Data(WireRecord),
}

impl From<WireRecord> for UnionWire {
    fn from(record: WireRecord) -> Self {
        UnionWire::Data(record)
    }
}
