//! Attribute values held by widget models

use super::NdArray;
use crate::model::WidgetRef;
use crate::scale::ScaleRef;
use crate::union::{DataUnion, Union};
use std::fmt;
use std::rc::Rc;

/// Value type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueTag {
    Null,
    Bool,
    Int,
    Float,
    String,
    Array,
    Widget,
    Scale,
}

/// Model attribute value
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(NdArray),
    /// Reference to another shared model
    Widget(WidgetRef),
    Scale(ScaleRef),
}

impl Value {
    /// Get the tag for this value
    pub fn tag(&self) -> ValueTag {
        match self {
            Value::Null => ValueTag::Null,
            Value::Bool(_) => ValueTag::Bool,
            Value::Int(_) => ValueTag::Int,
            Value::Float(_) => ValueTag::Float,
            Value::String(_) => ValueTag::String,
            Value::Array(_) => ValueTag::Array,
            Value::Widget(_) => ValueTag::Widget,
            Value::Scale(_) => ValueTag::Scale,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_widget(&self) -> bool {
        matches!(self, Value::Widget(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&NdArray> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_widget(&self) -> Option<&WidgetRef> {
        match self {
            Value::Widget(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_scale(&self) -> Option<&ScaleRef> {
        match self {
            Value::Scale(s) => Some(s),
            _ => None,
        }
    }

    /// View an array or widget value as a data union
    pub fn to_union(&self) -> Option<DataUnion> {
        match self {
            Value::Array(a) => Some(Union::Inline(a.clone())),
            Value::Widget(w) => Some(Union::Reference(w.clone())),
            _ => None,
        }
    }

    /// Identity comparison used for change detection.
    ///
    /// Arrays, widgets and scales compare by the object they point at, so
    /// writing an equal-content copy still counts as a change.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Widget(a), Value::Widget(b)) => Rc::ptr_eq(a, b),
            (Value::Scale(a), Value::Scale(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Value::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Array(a) => f.debug_tuple("Array").field(a).finish(),
            Value::Widget(w) => f.debug_tuple("Widget").field(&w.model().id()).finish(),
            Value::Scale(_) => f.write_str("Scale"),
        }
    }
}

// Convenience From impls for Value
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<NdArray> for Value {
    fn from(v: NdArray) -> Self {
        Value::Array(v)
    }
}

impl From<WidgetRef> for Value {
    fn from(v: WidgetRef) -> Self {
        Value::Widget(v)
    }
}

impl From<ScaleRef> for Value {
    fn from(v: ScaleRef) -> Self {
        Value::Scale(v)
    }
}

impl From<DataUnion> for Value {
    fn from(v: DataUnion) -> Self {
        match v {
            Union::Inline(a) => Value::Array(a),
            Union::Reference(w) => Value::Widget(w),
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
