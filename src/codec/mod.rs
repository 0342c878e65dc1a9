//! Serializers between in-memory arrays and wire records
//!
//! Every codec maps `None` to `None` in both directions. Encoding may consult
//! the owning model (for example its compression level).

mod array;
mod typed;

pub use array::{ArrayCodec, COMPRESSION_LEVEL, CompressedArrayCodec, decode_record, encode_record};
pub use typed::{FixedShapeCodec, SimpleArrayCodec, TypedArrayCodec};

use crate::error::Result;
use crate::model::Model;

/// A named deserialize/serialize pair
pub trait Codec {
    /// In-memory representation
    type Value;
    /// Serialized record
    type Wire;

    fn decode(&self, wire: Option<Self::Wire>) -> Result<Option<Self::Value>>;

    fn encode(&self, value: Option<&Self::Value>, owner: Option<&Model>)
    -> Result<Option<Self::Wire>>;
}
