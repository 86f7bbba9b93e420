use bytes::Bytes;

use super::{Codec, CodecContext, DecodeError, EncodeError, bind};
use crate::{
    field::FieldInfo,
    mysql::{Format, types::{BIT, TINY}},
    parameter::Parameter,
    value::{Value, ValueKind},
};

/// `bool` codec, `BIT(1)` and `BOOLEAN` which is an alias of `TINYINT(1)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolCodec;

impl Codec for BoolCodec {
    fn kind(&self) -> ValueKind {
        ValueKind::Bool
    }

    fn can_decode(&self, field: &FieldInfo) -> bool {
        matches!(field.ty(), BIT | TINY) && field.size() == 1
    }

    fn decode(&self, value: Bytes, field: &FieldInfo, format: Format, _: &CodecContext) -> Result<Value, DecodeError> {
        let Some(&first) = value.first() else {
            return Err(DecodeError::malformed(field.ty(), "empty boolean"));
        };
        let value = match (field.ty(), format) {
            (TINY, Format::Text) => first != b'0',
            // BIT is raw bytes in both protocols
            _ => first != 0,
        };
        Ok(Value::Bool(value))
    }

    fn encode(&self, value: Value, _: &CodecContext) -> Result<Parameter, EncodeError> {
        bind(value, ValueKind::Bool, TINY)
    }
}
