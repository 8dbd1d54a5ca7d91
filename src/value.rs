//! Runtime values for encoding/decoding (message representation).

use crate::bitmap::{ExtendableBitmap, FixedBitmap};
use crate::mti::MessageTypeIndicator;

/// A single decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Binary(Vec<u8>),
    Number(u64),
    Bitmap(FixedBitmap),
    ExtendableBitmap(ExtendableBitmap),
    Mti(MessageTypeIndicator),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bitmap(&self) -> Option<&FixedBitmap> {
        match self {
            Value::Bitmap(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_extendable_bitmap(&self) -> Option<&ExtendableBitmap> {
        match self {
            Value::ExtendableBitmap(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_mti(&self) -> Option<&MessageTypeIndicator> {
        match self {
            Value::Mti(m) => Some(m),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// Conversion between a codec's typed value and [`Value`].
pub trait FieldValue: Sized {
    fn into_value(self) -> Value;

    fn from_value(value: &Value) -> Option<Self>;
}

impl FieldValue for Value {
    fn into_value(self) -> Value {
        self
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FieldValue for String {
    fn into_value(self) -> Value {
        Value::Text(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FieldValue for Vec<u8> {
    fn into_value(self) -> Value {
        Value::Binary(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bytes().map(<[u8]>::to_vec)
    }
}

impl FieldValue for u64 {
    fn into_value(self) -> Value {
        Value::Number(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_u64()
    }
}

impl FieldValue for FixedBitmap {
    fn into_value(self) -> Value {
        Value::Bitmap(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bitmap().cloned()
    }
}

impl FieldValue for ExtendableBitmap {
    fn into_value(self) -> Value {
        Value::ExtendableBitmap(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_extendable_bitmap().cloned()
    }
}

impl FieldValue for MessageTypeIndicator {
    fn into_value(self) -> Value {
        Value::Mti(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_mti().cloned()
    }
}
