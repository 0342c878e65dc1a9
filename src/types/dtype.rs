//! Element types for typed arrays

use crate::error::{DataError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Serializable element type, the `dtype` of a wire record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Int8,
    Int16,
    Int32,
    Uint8,
    Uint16,
    Uint32,
    Float32,
    Float64,
}

impl DType {
    pub const ALL: [DType; 8] = [
        DType::Int8,
        DType::Int16,
        DType::Int32,
        DType::Uint8,
        DType::Uint16,
        DType::Uint32,
        DType::Float32,
        DType::Float64,
    ];

    /// Size in bytes of a single element
    pub fn element_size(self) -> usize {
        match self {
            DType::Int8 | DType::Uint8 => 1,
            DType::Int16 | DType::Uint16 => 2,
            DType::Int32 | DType::Uint32 | DType::Float32 => 4,
            DType::Float64 => 8,
        }
    }

    /// Wire name of the dtype
    pub fn name(self) -> &'static str {
        match self {
            DType::Int8 => "int8",
            DType::Int16 => "int16",
            DType::Int32 => "int32",
            DType::Uint8 => "uint8",
            DType::Uint16 => "uint16",
            DType::Uint32 => "uint32",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
        }
    }

    /// Look up a dtype by its wire name
    pub fn from_name(name: &str) -> Result<Self> {
        DataType::from_name(name).and_then(ensure_serializable)
    }

    /// Read element `index` of a little-endian buffer as f64
    pub fn read(self, bytes: &[u8], index: usize) -> f64 {
        let size = self.element_size();
        let b = &bytes[index * size..(index + 1) * size];
        match self {
            DType::Int8 => b[0] as i8 as f64,
            DType::Uint8 => b[0] as f64,
            DType::Int16 => i16::from_le_bytes([b[0], b[1]]) as f64,
            DType::Uint16 => u16::from_le_bytes([b[0], b[1]]) as f64,
            DType::Int32 => i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64,
            DType::Uint32 => u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64,
            DType::Float32 => f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64,
            DType::Float64 => f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]),
        }
    }

    /// Write `value` into element `index` of a little-endian buffer.
    ///
    /// Integer kinds truncate toward zero and wrap modulo their width,
    /// non-finite values store as 0. Floats narrow with rounding.
    pub fn write(self, bytes: &mut [u8], index: usize, value: f64) {
        let size = self.element_size();
        let b = &mut bytes[index * size..(index + 1) * size];
        match self {
            DType::Int8 => b.copy_from_slice(&(wrap_int(value) as i8).to_le_bytes()),
            DType::Uint8 => b.copy_from_slice(&(wrap_int(value) as u8).to_le_bytes()),
            DType::Int16 => b.copy_from_slice(&(wrap_int(value) as i16).to_le_bytes()),
            DType::Uint16 => b.copy_from_slice(&(wrap_int(value) as u16).to_le_bytes()),
            DType::Int32 => b.copy_from_slice(&(wrap_int(value) as i32).to_le_bytes()),
            DType::Uint32 => b.copy_from_slice(&(wrap_int(value) as u32).to_le_bytes()),
            DType::Float32 => b.copy_from_slice(&(value as f32).to_le_bytes()),
            DType::Float64 => b.copy_from_slice(&value.to_le_bytes()),
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

/// Truncate toward zero, then wrap modulo 2^64. Narrower kinds keep the low
/// bits of the result.
fn wrap_int(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    // |x % 2^64| < 2^64 is an exact integer, so the i128 cast is lossless
    (value.trunc() % TWO_POW_64) as i128 as u64 as i64
}

/// Saturating, round-half-even conversion used by clamped byte storage
pub(crate) fn clamp_u8(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 255.0).round_ties_even()
}

/// Element type tag of an in-memory array.
///
/// A superset of [`DType`]: clamped bytes are written as `uint8` but accepted
/// by name on the wire, and the untyped kinds cannot be serialized at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Int8,
    Int16,
    Int32,
    Uint8,
    Uint8Clamped,
    Uint16,
    Uint32,
    Float32,
    Float64,
    /// Plain list of numbers
    Array,
    /// Byte-buffer indirection
    Buffer,
    /// Arbitrary getter/setter storage
    Generic,
}

impl DataType {
    pub fn name(self) -> &'static str {
        match self {
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Uint8 => "uint8",
            DataType::Uint8Clamped => "uint8_clamped",
            DataType::Uint16 => "uint16",
            DataType::Uint32 => "uint32",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::Array => "array",
            DataType::Buffer => "buffer",
            DataType::Generic => "generic",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Ok(match name {
            "int8" => DataType::Int8,
            "int16" => DataType::Int16,
            "int32" => DataType::Int32,
            "uint8" => DataType::Uint8,
            "uint8_clamped" => DataType::Uint8Clamped,
            "uint16" => DataType::Uint16,
            "uint32" => DataType::Uint32,
            "float32" => DataType::Float32,
            "float64" => DataType::Float64,
            "array" => DataType::Array,
            "buffer" => DataType::Buffer,
            "generic" => DataType::Generic,
            other => return Err(DataError::UnknownDType(other.to_string())),
        })
    }

    /// Whether elements live in a fixed-width typed buffer
    pub fn is_typed(self) -> bool {
        !matches!(self, DataType::Array | DataType::Buffer | DataType::Generic)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<DType> for DataType {
    fn from(dtype: DType) -> Self {
        match dtype {
            DType::Int8 => DataType::Int8,
            DType::Int16 => DataType::Int16,
            DType::Int32 => DataType::Int32,
            DType::Uint8 => DataType::Uint8,
            DType::Uint16 => DataType::Uint16,
            DType::Uint32 => DataType::Uint32,
            DType::Float32 => DataType::Float32,
            DType::Float64 => DataType::Float64,
        }
    }
}

/// Map an array element type onto its wire dtype.
///
/// Clamped bytes serialize as `uint8`; the untyped kinds are rejected.
pub fn ensure_serializable(dtype: DataType) -> Result<DType> {
    Ok(match dtype {
        DataType::Int8 => DType::Int8,
        DataType::Int16 => DType::Int16,
        DataType::Int32 => DType::Int32,
        DataType::Uint8 | DataType::Uint8Clamped => DType::Uint8,
        DataType::Uint16 => DType::Uint16,
        DataType::Uint32 => DType::Uint32,
        DataType::Float32 => DType::Float32,
        DataType::Float64 => DType::Float64,
        DataType::Array | DataType::Buffer | DataType::Generic => {
            return Err(DataError::UnsupportedDType(dtype));
        }
    })
}
