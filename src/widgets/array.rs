//! Plain array model

use crate::codec::{COMPRESSION_LEVEL, Codec, CompressedArrayCodec};
use crate::compression::MAX_LEVEL;
use crate::error::{DataError, Result};
use crate::model::{DataSource, Model, SetOptions, Widget, WriteBack, get_array};
use crate::types::{ArrayData, CompressedWireRecord, NdArray, Value};
use std::rc::Rc;

/// Widget holding a single array under `array`
pub struct NdArrayModel {
    model: Model,
}

impl NdArrayModel {
    pub const MODEL_NAME: &'static str = "NDArrayModel";
    pub const ARRAY_KEY: &'static str = "array";

    /// New model; `None` starts out with an empty untyped array
    pub fn new(id: impl Into<String>, array: Option<NdArray>) -> Rc<Self> {
        let array = array.unwrap_or_else(|| NdArray::vector(ArrayData::values(Vec::new())));
        Rc::new(Self {
            model: Model::with_attributes(
                id,
                Self::MODEL_NAME,
                [
                    (Self::ARRAY_KEY, Value::from(array)),
                    (COMPRESSION_LEVEL, Value::from(0i64)),
                ],
            ),
        })
    }

    /// Model restored from serialized state
    pub fn from_state(
        id: impl Into<String>,
        wire: Option<CompressedWireRecord>,
        compression_level: u32,
    ) -> Result<Rc<Self>> {
        check_level(compression_level)?;
        let array = CompressedArrayCodec.decode(wire)?;
        Ok(Rc::new(Self {
            model: Model::with_attributes(
                id,
                Self::MODEL_NAME,
                [
                    (Self::ARRAY_KEY, Value::from(array)),
                    (COMPRESSION_LEVEL, Value::from(i64::from(compression_level))),
                ],
            ),
        }))
    }

    /// Serialized `array`, compressed per the model's own level
    pub fn state(&self) -> Result<Option<CompressedWireRecord>> {
        CompressedArrayCodec.encode(self.array().as_ref(), Some(&self.model))
    }

    pub fn array(&self) -> Option<NdArray> {
        self.model.get(Self::ARRAY_KEY).as_array().cloned()
    }

    pub fn set_array(&self, array: Option<NdArray>) {
        self.model.set(Self::ARRAY_KEY, array);
    }

    pub fn compression_level(&self) -> u32 {
        self.model
            .get(COMPRESSION_LEVEL)
            .as_int()
            .map_or(0, |level| level.clamp(0, i64::from(MAX_LEVEL)) as u32)
    }

    pub fn set_compression_level(&self, level: u32) -> Result<()> {
        check_level(level)?;
        self.model.set(COMPRESSION_LEVEL, i64::from(level));
        Ok(())
    }
}

fn check_level(level: u32) -> Result<()> {
    if level > MAX_LEVEL {
        return Err(DataError::InvalidCompressionLevel(level));
    }
    Ok(())
}

impl DataSource for NdArrayModel {
    fn get_ndarray(&self, key: Option<&str>) -> Option<NdArray> {
        get_array(&self.model.get(key.unwrap_or(Self::ARRAY_KEY)), None)
    }
}

impl WriteBack for NdArrayModel {
    fn can_write_back(&self, _key: Option<&str>) -> bool {
        true
    }

    fn set_ndarray(
        &self,
        value: Option<NdArray>,
        key: Option<&str>,
        options: SetOptions,
    ) -> Result<()> {
        self.model
            .set_with(key.unwrap_or(Self::ARRAY_KEY), value, options);
        Ok(())
    }
}

impl Widget for NdArrayModel {
    fn model(&self) -> &Model {
        &self.model
    }

    fn as_data_source(&self) -> Option<&dyn DataSource> {
        Some(self)
    }

    fn as_write_back(&self) -> Option<&dyn WriteBack> {
        Some(self)
    }
}
