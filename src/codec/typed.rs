//! Codecs for bare typed buffers

use super::Codec;
use crate::error::{DataError, Result};
use crate::model::Model;
use crate::types::{SimpleArray, TypedArray, WireRecord, element_count, ensure_serializable};

fn flat_record(array: &TypedArray, shape: Vec<usize>) -> Result<WireRecord> {
    Ok(WireRecord {
        shape,
        dtype: ensure_serializable(array.data_type())?.into(),
        buffer: array.buffer().clone(),
    })
}

/// Flat typed buffer; the incoming shape is discarded
#[derive(Debug, Clone, Copy, Default)]
pub struct TypedArrayCodec;

impl Codec for TypedArrayCodec {
    type Value = TypedArray;
    type Wire = WireRecord;

    fn decode(&self, wire: Option<WireRecord>) -> Result<Option<TypedArray>> {
        wire.map(|r| TypedArray::from_wire(r.dtype, r.buffer))
            .transpose()
    }

    fn encode(&self, value: Option<&TypedArray>, _owner: Option<&Model>) -> Result<Option<WireRecord>> {
        value.map(|a| flat_record(a, vec![a.len()])).transpose()
    }
}

/// `{array, shape}` pair without view machinery
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleArrayCodec;

impl Codec for SimpleArrayCodec {
    type Value = SimpleArray;
    type Wire = WireRecord;

    fn decode(&self, wire: Option<WireRecord>) -> Result<Option<SimpleArray>> {
        wire.map(|r| {
            Ok(SimpleArray {
                array: TypedArray::from_wire(r.dtype, r.buffer)?,
                shape: r.shape,
            })
        })
        .transpose()
    }

    fn encode(&self, value: Option<&SimpleArray>, _owner: Option<&Model>) -> Result<Option<WireRecord>> {
        value
            .map(|s| flat_record(&s.array, s.shape.clone()))
            .transpose()
    }
}

/// Flat typed buffer whose shape is known up front
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedShapeCodec {
    shape: Vec<usize>,
    len: usize,
}

impl FixedShapeCodec {
    /// Codec for `shape`; fails when the shape's element count overflows
    pub fn new(shape: Vec<usize>) -> Result<Self> {
        let len = element_count(&shape)?;
        Ok(Self { shape, len })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl Codec for FixedShapeCodec {
    type Value = TypedArray;
    type Wire = WireRecord;

    fn decode(&self, wire: Option<WireRecord>) -> Result<Option<TypedArray>> {
        let Some(record) = wire else {
            return Ok(None);
        };
        if record.shape != self.shape {
            return Err(DataError::ShapeMismatch {
                expected: self.shape.clone(),
                actual: record.shape,
            });
        }
        TypedArray::from_wire(record.dtype, record.buffer).map(Some)
    }

    fn encode(&self, value: Option<&TypedArray>, _owner: Option<&Model>) -> Result<Option<WireRecord>> {
        let Some(array) = value else {
            return Ok(None);
        };
        if array.len() != self.len {
            return Err(DataError::SizeMismatch {
                expected: self.len,
                actual: array.len(),
            });
        }
        flat_record(array, self.shape.clone()).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ByteBuffer, DataType};

    fn record(shape: Vec<usize>, values: &[i16]) -> WireRecord {
        let array = TypedArray::from_slice(values);
        WireRecord {
            shape,
            dtype: DataType::Int16,
            buffer: array.buffer().clone(),
        }
    }

    #[test]
    fn typed_array_discards_shape() {
        let decoded = TypedArrayCodec
            .decode(Some(record(vec![2, 2], &[1, 2, 3, 4])))
            .unwrap()
            .unwrap();
        assert_eq!(decoded.to_vec::<i16>().unwrap(), vec![1, 2, 3, 4]);

        let encoded = TypedArrayCodec.encode(Some(&decoded), None).unwrap().unwrap();
        assert_eq!(encoded.shape, vec![4]);
        assert_eq!(encoded.dtype, DataType::Int16);
        assert!(encoded.buffer.ptr_eq(decoded.buffer()));
    }

    #[test]
    fn simple_pair_keeps_shape() {
        let decoded = SimpleArrayCodec
            .decode(Some(record(vec![2, 2], &[1, 2, 3, 4])))
            .unwrap()
            .unwrap();
        assert_eq!(decoded.shape, vec![2, 2]);

        let encoded = SimpleArrayCodec.encode(Some(&decoded), None).unwrap().unwrap();
        assert_eq!(encoded, record(vec![2, 2], &[1, 2, 3, 4]));
    }

    #[test]
    fn fixed_shape_checks() {
        let codec = FixedShapeCodec::new(vec![3, 2]).unwrap();

        let err = codec
            .decode(Some(record(vec![2, 2], &[1, 2, 3, 4])))
            .unwrap_err();
        assert!(matches!(
            err,
            DataError::ShapeMismatch { ref expected, ref actual }
                if expected == &vec![3, 2] && actual == &vec![2, 2]
        ));

        let short = TypedArray::from_slice(&[1i16, 2, 3, 4]);
        assert!(matches!(
            codec.encode(Some(&short), None),
            Err(DataError::SizeMismatch {
                expected: 6,
                actual: 4
            })
        ));

        let full = TypedArray::from_slice(&[1i16, 2, 3, 4, 5, 6]);
        let encoded = codec.encode(Some(&full), None).unwrap().unwrap();
        assert_eq!(encoded.shape, vec![3, 2]);
        assert_eq!(
            codec.decode(Some(encoded)).unwrap().unwrap().to_f64_vec(),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );

        assert!(matches!(
            FixedShapeCodec::new(vec![usize::MAX, 2]),
            Err(DataError::ShapeOverflow(_))
        ));
    }

    #[test]
    fn misaligned_payload() {
        let bad = WireRecord {
            shape: vec![1],
            dtype: DataType::Float64,
            buffer: ByteBuffer::new(vec![0; 5]),
        };
        assert!(matches!(
            TypedArrayCodec.decode(Some(bad)),
            Err(DataError::MisalignedBuffer { .. })
        ));
    }
}
