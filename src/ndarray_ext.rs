//! ndarray integration for array views
//!
//! Conversions between [`NdArray`] and ndarray's `ArrayD`. Enable with the
//! `ndarray` feature flag.

use crate::error::{DataError, Result};
use crate::types::{Element, NdArray, TypedArray};
use ndarray::{ArrayD, IxDyn};

impl NdArray {
    /// Copy an ndarray into a row-major typed array.
    ///
    /// Any memory layout is accepted; elements are taken in logical order.
    pub fn from_ndarray<T: Element>(array: ArrayD<T>) -> Self {
        let shape = array.shape().to_vec();
        let elements: Vec<T> = array.iter().copied().collect();
        NdArray::with_layout(
            TypedArray::from_slice(&elements),
            shape.clone(),
            crate::types::row_major_strides(&shape),
            0,
        )
    }

    /// Convert to an owned ndarray `ArrayD`
    pub fn to_ndarray<T: Element>(&self) -> Result<ArrayD<T>> {
        let standard = self.to_standard_layout();
        let data = standard
            .data()
            .as_typed()
            .ok_or(DataError::UnknownBufferType(standard.dtype()))?;
        let elements = data.to_vec::<T>()?;
        let actual = elements.len();
        ArrayD::from_shape_vec(IxDyn(standard.shape()), elements).map_err(|_| {
            DataError::SizeMismatch {
                expected: standard.num_elements(),
                actual,
            }
        })
    }
}
