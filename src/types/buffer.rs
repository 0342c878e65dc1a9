//! Shared byte storage and typed element buffers

use super::dtype::{DType, DataType, clamp_u8, ensure_serializable};
use crate::error::{DataError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

/// Shared, mutable little-endian byte storage.
///
/// Clones share the same allocation, so an array decoded from a wire record
/// and the record itself can point at one buffer. Equality compares content;
/// use [`ByteBuffer::ptr_eq`] for identity.
#[derive(Clone, Default)]
pub struct ByteBuffer(Rc<RefCell<Vec<u8>>>);

impl ByteBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Rc::new(RefCell::new(bytes)))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bytes(&self) -> Ref<'_, Vec<u8>> {
        self.0.borrow()
    }

    pub fn bytes_mut(&self) -> RefMut<'_, Vec<u8>> {
        self.0.borrow_mut()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.borrow().clone()
    }

    /// Whether both handles share one allocation
    pub fn ptr_eq(&self, other: &ByteBuffer) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ByteBuffer").field(&self.len()).finish()
    }
}

impl PartialEq for ByteBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.bytes() == *other.bytes()
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        ByteBuffer::new(bytes)
    }
}

impl Serialize for ByteBuffer {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.bytes())
    }
}

impl<'de> Deserialize<'de> for ByteBuffer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Vec::<u8>::deserialize(deserializer).map(ByteBuffer::new)
    }
}

/// Trait for primitive types that can be stored in a typed array
pub trait Element: Copy + 'static {
    const DTYPE: DType;

    fn write_le(self, out: &mut Vec<u8>);

    /// Decode from exactly `DTYPE.element_size()` bytes
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($($t:ty => $dtype:ident),* $(,)?) => {
        $(
            impl Element for $t {
                const DTYPE: DType = DType::$dtype;

                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Self {
                    let raw: [u8; std::mem::size_of::<$t>()] = std::array::from_fn(|i| bytes[i]);
                    <$t>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_element! {
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    f32 => Float32,
    f64 => Float64,
}

/// Flat buffer of fixed-width numeric elements
#[derive(Clone)]
pub struct TypedArray {
    dtype: DType,
    clamped: bool,
    buffer: ByteBuffer,
}

impl TypedArray {
    /// Wrap existing storage without copying
    pub fn from_buffer(dtype: DType, buffer: ByteBuffer) -> Result<Self> {
        let len = buffer.len();
        if len % dtype.element_size() != 0 {
            return Err(DataError::MisalignedBuffer { dtype, len });
        }
        Ok(Self {
            dtype,
            clamped: false,
            buffer,
        })
    }

    /// View over a wire buffer of kind `data_type`; `uint8_clamped` keeps
    /// saturating writes
    pub fn from_wire(data_type: DataType, buffer: ByteBuffer) -> Result<Self> {
        let mut array = Self::from_buffer(ensure_serializable(data_type)?, buffer)?;
        array.clamped = data_type == DataType::Uint8Clamped;
        Ok(array)
    }

    pub fn zeros(dtype: DType, len: usize) -> Self {
        Self {
            dtype,
            clamped: false,
            buffer: ByteBuffer::new(vec![0; len * dtype.element_size()]),
        }
    }

    pub fn from_slice<T: Element>(values: &[T]) -> Self {
        let mut bytes = Vec::with_capacity(values.len() * T::DTYPE.element_size());
        for v in values {
            v.write_le(&mut bytes);
        }
        Self {
            dtype: T::DTYPE,
            clamped: false,
            buffer: ByteBuffer::new(bytes),
        }
    }

    /// Build from f64 values, converting each into `dtype`
    pub fn from_f64(dtype: DType, values: &[f64]) -> Self {
        let array = Self::zeros(dtype, values.len());
        {
            let mut bytes = array.buffer.bytes_mut();
            for (i, v) in values.iter().enumerate() {
                dtype.write(&mut bytes, i, *v);
            }
        }
        array
    }

    /// Byte storage that saturates on write instead of wrapping
    pub fn clamped(bytes: Vec<u8>) -> Self {
        Self {
            dtype: DType::Uint8,
            clamped: true,
            buffer: ByteBuffer::new(bytes),
        }
    }

    /// Wire dtype of the storage; clamped bytes report `uint8`
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn data_type(&self) -> DataType {
        if self.clamped {
            DataType::Uint8Clamped
        } else {
            self.dtype.into()
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len() / self.dtype.element_size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn buffer(&self) -> &ByteBuffer {
        &self.buffer
    }

    pub fn get(&self, index: usize) -> f64 {
        self.dtype.read(&self.buffer.bytes(), index)
    }

    /// Store into shared storage; every clone observes the write
    pub fn set(&self, index: usize, value: f64) {
        let value = if self.clamped { clamp_u8(value) } else { value };
        self.dtype.write(&mut self.buffer.bytes_mut(), index, value);
    }

    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        if T::DTYPE != self.dtype {
            return Err(DataError::DTypeMismatch {
                expected: T::DTYPE,
                actual: self.dtype,
            });
        }
        Ok(self
            .buffer
            .bytes()
            .chunks_exact(self.dtype.element_size())
            .map(T::read_le)
            .collect())
    }

    pub fn to_f64_vec(&self) -> Vec<f64> {
        let bytes = self.buffer.bytes();
        (0..self.len()).map(|i| self.dtype.read(&bytes, i)).collect()
    }

    /// Copy into fresh storage of the same kind
    pub fn deep_copy(&self) -> Self {
        Self {
            dtype: self.dtype,
            clamped: self.clamped,
            buffer: ByteBuffer::new(self.buffer.to_vec()),
        }
    }

    /// Element-wise conversion into fresh storage of another dtype
    pub fn convert(&self, dtype: DType) -> Self {
        Self::from_f64(dtype, &self.to_f64_vec())
    }

    pub fn ptr_eq(&self, other: &TypedArray) -> bool {
        self.buffer.ptr_eq(&other.buffer)
    }
}

impl fmt::Debug for TypedArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedArray")
            .field("dtype", &self.data_type())
            .field("len", &self.len())
            .finish()
    }
}

impl PartialEq for TypedArray {
    fn eq(&self, other: &Self) -> bool {
        self.dtype == other.dtype && self.buffer == other.buffer
    }
}
