//! Host values exchanged with codecs.
use bytes::Bytes;
use std::{
    fmt,
    hash::{Hash, Hasher},
};

use crate::{
    codec::{DecodeError, EncodeError},
    common::ByteStr,
};

/// A host value, either decoded from a column or bound as parameter.
///
/// Floats are compared and hashed by their bit pattern, so `0.0` and `-0.0`
/// are different values while `NaN` equals itself.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    String(ByteStr),
    Bytes(Bytes),
    #[cfg(feature = "time")]
    Date(time::Date),
    #[cfg(feature = "time")]
    DateTime(time::PrimitiveDateTime),
    #[cfg(feature = "json")]
    Json(serde_json::Value),
}

/// Tag of [`Value`] variants, used to request a decoded kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U64,
    F32,
    F64,
    String,
    Bytes,
    #[cfg(feature = "time")]
    Date,
    #[cfg(feature = "time")]
    DateTime,
    #[cfg(feature = "json")]
    Json,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::I8(_) => ValueKind::I8,
            Value::I16(_) => ValueKind::I16,
            Value::I32(_) => ValueKind::I32,
            Value::I64(_) => ValueKind::I64,
            Value::U64(_) => ValueKind::U64,
            Value::F32(_) => ValueKind::F32,
            Value::F64(_) => ValueKind::F64,
            Value::String(_) => ValueKind::String,
            Value::Bytes(_) => ValueKind::Bytes,
            #[cfg(feature = "time")]
            Value::Date(_) => ValueKind::Date,
            #[cfg(feature = "time")]
            Value::DateTime(_) => ValueKind::DateTime,
            #[cfg(feature = "json")]
            Value::Json(_) => ValueKind::Json,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a.to_bits() == b.to_bits(),
            (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            #[cfg(feature = "time")]
            (Value::Date(a), Value::Date(b)) => a == b,
            #[cfg(feature = "time")]
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            #[cfg(feature = "json")]
            (Value::Json(a), Value::Json(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value { }

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match self {
            Value::Null => { }
            Value::Bool(v) => v.hash(state),
            Value::I8(v) => v.hash(state),
            Value::I16(v) => v.hash(state),
            Value::I32(v) => v.hash(state),
            Value::I64(v) => v.hash(state),
            Value::U64(v) => v.hash(state),
            Value::F32(v) => v.to_bits().hash(state),
            Value::F64(v) => v.to_bits().hash(state),
            Value::String(v) => v.hash(state),
            Value::Bytes(v) => v.hash(state),
            #[cfg(feature = "time")]
            Value::Date(v) => v.hash(state),
            #[cfg(feature = "time")]
            Value::DateTime(v) => v.hash(state),
            // serialized json is deterministic for equal values
            #[cfg(feature = "json")]
            Value::Json(v) => v.to_string().hash(state),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => fmt::Debug::fmt(v, f),
            Value::I8(v) => fmt::Debug::fmt(v, f),
            Value::I16(v) => fmt::Debug::fmt(v, f),
            Value::I32(v) => fmt::Debug::fmt(v, f),
            Value::I64(v) => fmt::Debug::fmt(v, f),
            Value::U64(v) => fmt::Debug::fmt(v, f),
            Value::F32(v) => fmt::Debug::fmt(v, f),
            Value::F64(v) => fmt::Debug::fmt(v, f),
            Value::String(v) => fmt::Debug::fmt(v, f),
            Value::Bytes(v) => fmt::Debug::fmt(v, f),
            #[cfg(feature = "time")]
            Value::Date(v) => fmt::Debug::fmt(v, f),
            #[cfg(feature = "time")]
            Value::DateTime(v) => fmt::Debug::fmt(v, f),
            #[cfg(feature = "json")]
            Value::Json(v) => fmt::Debug::fmt(v, f),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A rust type that can be converted from and into [`Value`].
pub trait HostType: Sized {
    /// The kind requested when decoding this type.
    const KIND: ValueKind;

    fn from_value(value: Value) -> Result<Self, DecodeError>;

    fn into_value(self) -> Result<Value, EncodeError>;
}

macro_rules! host {
    ($ty:ty, $variant:ident) => {
        impl HostType for $ty {
            const KIND: ValueKind = ValueKind::$variant;

            fn from_value(value: Value) -> Result<Self, DecodeError> {
                match value {
                    Value::$variant(v) => Ok(v.into()),
                    Value::Null => Err(DecodeError::Null),
                    found => Err(DecodeError::KindMismatch { expect: Self::KIND, found: found.kind() }),
                }
            }

            fn into_value(self) -> Result<Value, EncodeError> {
                Ok(Value::$variant(self.into()))
            }
        }
    };
}

host!(bool, Bool);
host!(i8, I8);
host!(i16, I16);
host!(i32, I32);
host!(i64, I64);
host!(u64, U64);
host!(f32, F32);
host!(f64, F64);
host!(ByteStr, String);
host!(String, String);
host!(Bytes, Bytes);
#[cfg(feature = "time")]
host!(time::Date, Date);
#[cfg(feature = "time")]
host!(time::PrimitiveDateTime, DateTime);
#[cfg(feature = "json")]
host!(serde_json::Value, Json);

impl HostType for Vec<u8> {
    const KIND: ValueKind = ValueKind::Bytes;

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        Bytes::from_value(value).map(Vec::from)
    }

    fn into_value(self) -> Result<Value, EncodeError> {
        Ok(Value::Bytes(self.into()))
    }
}

impl<T: HostType> HostType for Option<T> {
    const KIND: ValueKind = T::KIND;

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Null => Ok(None),
            value => T::from_value(value).map(Some),
        }
    }

    fn into_value(self) -> Result<Value, EncodeError> {
        match self {
            Some(value) => value.into_value(),
            None => Ok(Value::Null),
        }
    }
}
