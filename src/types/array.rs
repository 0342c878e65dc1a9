//! N-dimensional array views

use super::buffer::{Element, TypedArray};
use super::dtype::{DType, DataType, ensure_serializable};
use crate::error::{DataError, Result};
use std::cell::RefCell;
use std::rc::Rc;

/// Element storage behind an [`NdArray`]
#[derive(Debug, Clone)]
pub enum ArrayData {
    /// Fixed-width typed buffer
    Typed(TypedArray),
    /// Plain list of numbers (dtype `array`), not serializable
    Values(Rc<RefCell<Vec<f64>>>),
}

impl ArrayData {
    pub fn values(values: Vec<f64>) -> Self {
        ArrayData::Values(Rc::new(RefCell::new(values)))
    }

    /// Storage of kind `data_type` holding `values`, converted element-wise
    pub fn from_f64(data_type: DataType, values: &[f64]) -> Result<Self> {
        Ok(match data_type {
            DataType::Array => ArrayData::values(values.to_vec()),
            DataType::Uint8Clamped => {
                let array = TypedArray::clamped(vec![0; values.len()]);
                for (i, v) in values.iter().enumerate() {
                    array.set(i, *v);
                }
                ArrayData::Typed(array)
            }
            other => ArrayData::Typed(TypedArray::from_f64(ensure_serializable(other)?, values)),
        })
    }

    pub fn data_type(&self) -> DataType {
        match self {
            ArrayData::Typed(t) => t.data_type(),
            ArrayData::Values(_) => DataType::Array,
        }
    }

    /// Reverse dtype lookup from the concrete storage
    pub fn typed_dtype(&self) -> Result<DType> {
        match self {
            ArrayData::Typed(t) => Ok(t.dtype()),
            ArrayData::Values(_) => Err(DataError::UnknownBufferType(DataType::Array)),
        }
    }

    pub fn as_typed(&self) -> Option<&TypedArray> {
        match self {
            ArrayData::Typed(t) => Some(t),
            ArrayData::Values(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ArrayData::Typed(t) => t.len(),
            ArrayData::Values(v) => v.borrow().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> f64 {
        match self {
            ArrayData::Typed(t) => t.get(index),
            ArrayData::Values(v) => v.borrow()[index],
        }
    }

    pub fn set(&self, index: usize, value: f64) {
        match self {
            ArrayData::Typed(t) => t.set(index, value),
            ArrayData::Values(v) => v.borrow_mut()[index] = value,
        }
    }

    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            ArrayData::Typed(t) => t.to_f64_vec(),
            ArrayData::Values(v) => v.borrow().clone(),
        }
    }

    pub fn deep_copy(&self) -> Self {
        match self {
            ArrayData::Typed(t) => ArrayData::Typed(t.deep_copy()),
            ArrayData::Values(v) => ArrayData::values(v.borrow().clone()),
        }
    }

    pub fn ptr_eq(&self, other: &ArrayData) -> bool {
        match (self, other) {
            (ArrayData::Typed(a), ArrayData::Typed(b)) => a.ptr_eq(b),
            (ArrayData::Values(a), ArrayData::Values(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for ArrayData {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ArrayData::Typed(a), ArrayData::Typed(b)) => a == b,
            (ArrayData::Values(a), ArrayData::Values(b)) => *a.borrow() == *b.borrow(),
            _ => false,
        }
    }
}

impl From<TypedArray> for ArrayData {
    fn from(array: TypedArray) -> Self {
        ArrayData::Typed(array)
    }
}

/// N-dimensional view over a flat element buffer
#[derive(Debug, Clone)]
pub struct NdArray {
    data: ArrayData,
    shape: Vec<usize>,
    stride: Vec<isize>,
    offset: usize,
}

impl NdArray {
    /// Row-major view; the element count must match the shape
    pub fn new(data: impl Into<ArrayData>, shape: Vec<usize>) -> Result<Self> {
        let data = data.into();
        let expected = element_count(&shape)?;
        if data.len() != expected {
            return Err(DataError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        let stride = row_major_strides(&shape);
        Ok(Self {
            data,
            shape,
            stride,
            offset: 0,
        })
    }

    /// One-dimensional view over all of `data`
    pub fn vector(data: impl Into<ArrayData>) -> Self {
        let data = data.into();
        let shape = vec![data.len()];
        Self {
            stride: row_major_strides(&shape),
            data,
            shape,
            offset: 0,
        }
    }

    pub fn from_slice<T: Element>(values: &[T], shape: Vec<usize>) -> Result<Self> {
        Self::new(TypedArray::from_slice(values), shape)
    }

    /// View with an explicit layout. Not checked against the buffer length.
    pub fn with_layout(
        data: impl Into<ArrayData>,
        shape: Vec<usize>,
        stride: Vec<isize>,
        offset: usize,
    ) -> Self {
        Self {
            data: data.into(),
            shape,
            stride,
            offset,
        }
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn stride(&self) -> &[isize] {
        &self.stride
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn dtype(&self) -> DataType {
        self.data.data_type()
    }

    /// Total number of elements
    pub fn num_elements(&self) -> usize {
        self.shape.iter().fold(1usize, |acc, &d| acc.saturating_mul(d))
    }

    /// Whether the view covers its buffer in plain row-major order
    pub fn is_standard_layout(&self) -> bool {
        self.offset == 0 && self.stride == row_major_strides(&self.shape)
    }

    pub fn get(&self, index: &[usize]) -> f64 {
        self.data.get(self.flat_index(index))
    }

    pub fn set(&self, index: &[usize], value: f64) {
        self.data.set(self.flat_index(index), value)
    }

    /// Whether both views share storage and shape
    pub fn ptr_eq(&self, other: &NdArray) -> bool {
        self.data.ptr_eq(&other.data)
            && self.shape == other.shape
            && self.stride == other.stride
            && self.offset == other.offset
    }

    /// Copy of the view with its own storage and the same layout
    pub fn deep_copy(&self) -> Self {
        Self {
            data: self.data.deep_copy(),
            shape: self.shape.clone(),
            stride: self.stride.clone(),
            offset: self.offset,
        }
    }

    /// Elements in row-major logical order
    pub fn to_f64_vec(&self) -> Vec<f64> {
        if self.is_standard_layout() && self.data.len() == self.num_elements() {
            return self.data.to_f64_vec();
        }
        let mut out = Vec::with_capacity(self.num_elements());
        let mut index = vec![0usize; self.shape.len()];
        for _ in 0..self.num_elements() {
            out.push(self.get(&index));
            for axis in (0..index.len()).rev() {
                index[axis] += 1;
                if index[axis] < self.shape[axis] {
                    break;
                }
                index[axis] = 0;
            }
        }
        out
    }

    /// Fresh zero-filled row-major array with this shape and element kind
    pub fn zeros_like(&self) -> NdArray {
        let len = self.num_elements();
        let data = match &self.data {
            ArrayData::Typed(t) if t.data_type() == DataType::Uint8Clamped => {
                ArrayData::Typed(TypedArray::clamped(vec![0; len]))
            }
            ArrayData::Typed(t) => ArrayData::Typed(TypedArray::zeros(t.dtype(), len)),
            ArrayData::Values(_) => ArrayData::values(vec![0.0; len]),
        };
        Self {
            stride: row_major_strides(&self.shape),
            data,
            shape: self.shape.clone(),
            offset: 0,
        }
    }

    /// This view when already row-major over its whole buffer, otherwise a
    /// row-major copy of the same element kind
    pub fn to_standard_layout(&self) -> NdArray {
        if self.is_standard_layout() && self.data.len() == self.num_elements() {
            return self.clone();
        }
        let copy = self.zeros_like();
        for (i, v) in self.to_f64_vec().into_iter().enumerate() {
            copy.data.set(i, v);
        }
        copy
    }

    fn flat_index(&self, index: &[usize]) -> usize {
        let flat = index
            .iter()
            .zip(&self.stride)
            .fold(self.offset as isize, |acc, (&i, &s)| acc + i as isize * s);
        flat as usize
    }
}

impl PartialEq for NdArray {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape
            && self.stride == other.stride
            && self.offset == other.offset
            && self.data == other.data
    }
}

/// Number of elements covered by `shape`.
///
/// Fails when the extent of the non-empty axes does not fit in `isize`, the
/// range strides are expressed in.
pub fn element_count(shape: &[usize]) -> Result<usize> {
    let extent = shape
        .iter()
        .filter(|&&d| d != 0)
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .filter(|&n| isize::try_from(n).is_ok())
        .ok_or_else(|| DataError::ShapeOverflow(shape.to_vec()))?;
    Ok(if shape.contains(&0) { 0 } else { extent })
}

pub(crate) fn row_major_strides(shape: &[usize]) -> Vec<isize> {
    let mut stride = vec![0isize; shape.len()];
    let mut acc = 1isize;
    for (s, &dim) in stride.iter_mut().zip(shape).rev() {
        *s = acc;
        acc = acc.saturating_mul(isize::try_from(dim).unwrap_or(isize::MAX));
    }
    stride
}

/// Flat typed buffer paired with its shape, without view machinery
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleArray {
    pub array: TypedArray,
    pub shape: Vec<usize>,
}
