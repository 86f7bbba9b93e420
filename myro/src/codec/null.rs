use bytes::Bytes;

use super::{Codec, CodecContext, DecodeError, EncodeError, bind};
use crate::{
    field::FieldInfo,
    mysql::{Format, types::NULL},
    parameter::Parameter,
    value::{Value, ValueKind},
};

/// Bind `NULL` parameter.
///
/// Column values which are NULL never reach a codec, so this codec only
/// encodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCodec;

impl Codec for NullCodec {
    fn kind(&self) -> ValueKind {
        ValueKind::Null
    }

    fn can_decode(&self, _: &FieldInfo) -> bool {
        false
    }

    fn decode(&self, _: Bytes, field: &FieldInfo, _: Format, _: &CodecContext) -> Result<Value, DecodeError> {
        Err(DecodeError::NoCodecFound { ty: field.ty(), kind: ValueKind::Null })
    }

    fn encode(&self, value: Value, _: &CodecContext) -> Result<Parameter, EncodeError> {
        bind(value, ValueKind::Null, NULL)
    }
}
