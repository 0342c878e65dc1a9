//! Plain and compressed n-dimensional array codecs

use super::Codec;
use crate::compression::{compress, decompress};
use crate::error::{DataError, Result};
use crate::model::Model;
use crate::types::{
    ByteBuffer, CompressedWireRecord, DataType, NdArray, TypedArray, WireRecord,
    ensure_serializable,
};
use log::trace;

/// Owner attribute holding the deflate level used when encoding
pub const COMPRESSION_LEVEL: &str = "compression_level";

/// Wrap a record's buffer in a row-major view, without copying
pub fn decode_record(record: WireRecord) -> Result<NdArray> {
    trace!("decode {} {:?}", record.dtype, record.shape);
    let data = TypedArray::from_wire(record.dtype, record.buffer)?;
    NdArray::new(data, record.shape)
}

/// Serialize `array`, handing out its own buffer when it is row-major
pub fn encode_record(array: &NdArray) -> Result<WireRecord> {
    let dtype = DataType::from(ensure_serializable(array.dtype())?);
    let array = array.to_standard_layout();
    let data = array
        .data()
        .as_typed()
        .ok_or(DataError::UnsupportedDType(array.dtype()))?;
    trace!("encode {} {:?}", dtype, array.shape());
    Ok(WireRecord {
        shape: array.shape().to_vec(),
        dtype,
        buffer: data.buffer().clone(),
    })
}

/// `{shape, dtype, buffer}` <-> [`NdArray`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayCodec;

impl Codec for ArrayCodec {
    type Value = NdArray;
    type Wire = WireRecord;

    fn decode(&self, wire: Option<WireRecord>) -> Result<Option<NdArray>> {
        wire.map(decode_record).transpose()
    }

    fn encode(&self, value: Option<&NdArray>, _owner: Option<&Model>) -> Result<Option<WireRecord>> {
        value.map(encode_record).transpose()
    }
}

/// Array codec whose payload is deflated when the owner asks for it.
///
/// Decoding picks the path from the fields present; encoding reads the
/// owner's `compression_level` at encode time.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompressedArrayCodec;

impl CompressedArrayCodec {
    fn level(owner: Option<&Model>) -> u32 {
        owner
            .and_then(|model| model.get(COMPRESSION_LEVEL).as_int())
            .map_or(0, |level| level.clamp(0, i64::from(u32::MAX)) as u32)
    }
}

impl Codec for CompressedArrayCodec {
    type Value = NdArray;
    type Wire = CompressedWireRecord;

    fn decode(&self, wire: Option<CompressedWireRecord>) -> Result<Option<NdArray>> {
        let Some(record) = wire else {
            return Ok(None);
        };
        let buffer = match (record.compressed_buffer, record.buffer) {
            (Some(compressed), _) => {
                let inflated = decompress(&compressed.bytes())?;
                ByteBuffer::new(inflated)
            }
            (None, Some(buffer)) => buffer,
            (None, None) => return Err(DataError::MissingBuffer),
        };
        decode_record(WireRecord {
            shape: record.shape,
            dtype: record.dtype,
            buffer,
        })
        .map(Some)
    }

    fn encode(
        &self,
        value: Option<&NdArray>,
        owner: Option<&Model>,
    ) -> Result<Option<CompressedWireRecord>> {
        let Some(array) = value else {
            return Ok(None);
        };
        let record = encode_record(array)?;
        let level = Self::level(owner);
        if level == 0 {
            return Ok(Some(record.into()));
        }
        let compressed = compress(&record.buffer.bytes(), level)?;
        Ok(Some(CompressedWireRecord {
            shape: record.shape,
            dtype: record.dtype,
            buffer: None,
            compressed_buffer: Some(ByteBuffer::new(compressed)),
        }))
    }
}
