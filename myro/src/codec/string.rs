use bytes::Bytes;

use super::{Codec, CodecContext, DecodeError, EncodeError, bind};
use crate::{
    common::ByteStr,
    field::FieldInfo,
    mysql::{
        Format,
        types::{ENUM, JSON, SET, VARCHAR, is_blob, is_decimal, is_string},
    },
    parameter::Parameter,
    value::{Value, ValueKind},
};

/// `String` codec.
///
/// Decodes character strings and text blobs. Binary strings, which share the
/// type codes but have binary collation, are left to [`BlobCodec`][super::BlobCodec].
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl Codec for StringCodec {
    fn kind(&self) -> ValueKind {
        ValueKind::String
    }

    fn can_decode(&self, field: &FieldInfo) -> bool {
        let ty = field.ty();
        matches!(ty, ENUM | SET | JSON)
            || is_decimal(ty)
            || ((is_string(ty) || is_blob(ty)) && !field.is_binary())
    }

    fn decode(&self, value: Bytes, _: &FieldInfo, _: Format, _: &CodecContext) -> Result<Value, DecodeError> {
        Ok(Value::String(ByteStr::from_utf8(value)?))
    }

    fn encode(&self, value: Value, _: &CodecContext) -> Result<Parameter, EncodeError> {
        bind(value, ValueKind::String, VARCHAR)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mysql::{
        collations::UTF8MB4_GENERAL_CI,
        types::{BLOB, NEWDECIMAL, VAR_STRING},
    };

    #[test]
    fn can_decode() {
        let text = |ty| FieldInfo::new(ty, 255).with_collation(UTF8MB4_GENERAL_CI);
        assert!(StringCodec.can_decode(&text(VAR_STRING)));
        assert!(StringCodec.can_decode(&text(BLOB)));
        assert!(StringCodec.can_decode(&FieldInfo::new(NEWDECIMAL, 10)));
        assert!(StringCodec.can_decode(&FieldInfo::new(JSON, 0)));
        assert!(!StringCodec.can_decode(&FieldInfo::new(VAR_STRING, 255)));
        assert!(!StringCodec.can_decode(&FieldInfo::new(BLOB, 255)));
    }

    #[test]
    fn decode() {
        let ctx = CodecContext::default();
        let field = FieldInfo::new(VAR_STRING, 255).with_collation(UTF8MB4_GENERAL_CI);
        let value = StringCodec.decode(Bytes::from_static("héllo".as_bytes()), &field, Format::Binary, &ctx).unwrap();
        assert_eq!(value, Value::String("héllo".into()));
        let err = StringCodec.decode(Bytes::from_static(&[0xFF, 0xFE]), &field, Format::Text, &ctx).unwrap_err();
        assert!(matches!(err, DecodeError::Utf8(_)));
    }
}
