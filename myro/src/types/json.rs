use bytes::Bytes;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    codec::{Codec, CodecContext, DecodeError, EncodeError, bind},
    field::FieldInfo,
    mysql::{Format, types::{JSON, VARCHAR}},
    parameter::Parameter,
    value::{HostType, Value, ValueKind},
};

/// [`serde_json::Value`] codec, `JSON`.
///
/// JSON is text in both protocols. Parameters are sent as `VARCHAR`, the
/// server converts them on assignment to a `JSON` column.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn kind(&self) -> ValueKind {
        ValueKind::Json
    }

    fn can_decode(&self, field: &FieldInfo) -> bool {
        field.ty() == JSON
    }

    fn decode(&self, value: Bytes, _: &FieldInfo, _: Format, _: &CodecContext) -> Result<Value, DecodeError> {
        Ok(Value::Json(serde_json::from_slice(&value)?))
    }

    fn encode(&self, value: Value, _: &CodecContext) -> Result<Parameter, EncodeError> {
        bind(value, ValueKind::Json, VARCHAR)
    }
}

/// Decode and encode any serde type as json value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> HostType for Json<T>
where
    T: Serialize + DeserializeOwned,
{
    const KIND: ValueKind = ValueKind::Json;

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        let json = <serde_json::Value as HostType>::from_value(value)?;
        Ok(Self(serde_json::from_value(json)?))
    }

    fn into_value(self) -> Result<Value, EncodeError> {
        Ok(Value::Json(serde_json::to_value(self.0)?))
    }
}

impl<T: Serialize> Serialize for Json<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Json<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(Self(T::deserialize(deserializer)?))
    }
}
