//! Concrete array widgets

mod array;
mod scaled;

pub use array::NdArrayModel;
pub use scaled::{Recomputed, ScaledArrayModel, copy_array};
