use bytes::Bytes;

use super::{Codec, CodecContext, DecodeError, EncodeError, bind};
use crate::{
    field::FieldInfo,
    mysql::{
        Format,
        types::{BIT, BLOB, GEOMETRY, is_blob, is_string},
    },
    parameter::Parameter,
    value::{Value, ValueKind},
};

/// Raw bytes codec.
///
/// Decodes blobs, binary strings, `BIT` and `GEOMETRY` as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlobCodec;

impl Codec for BlobCodec {
    fn kind(&self) -> ValueKind {
        ValueKind::Bytes
    }

    fn can_decode(&self, field: &FieldInfo) -> bool {
        let ty = field.ty();
        is_blob(ty) || matches!(ty, BIT | GEOMETRY) || (is_string(ty) && field.is_binary())
    }

    fn decode(&self, value: Bytes, _: &FieldInfo, _: Format, _: &CodecContext) -> Result<Value, DecodeError> {
        Ok(Value::Bytes(value))
    }

    fn encode(&self, value: Value, _: &CodecContext) -> Result<Parameter, EncodeError> {
        bind(value, ValueKind::Bytes, BLOB)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mysql::{
        collations::UTF8MB4_GENERAL_CI,
        types::{LONG, VAR_STRING},
    };

    #[test]
    fn can_decode() {
        assert!(BlobCodec.can_decode(&FieldInfo::new(BLOB, 65535)));
        assert!(BlobCodec.can_decode(&FieldInfo::new(VAR_STRING, 16)));
        assert!(BlobCodec.can_decode(&FieldInfo::new(BIT, 8)));
        assert!(!BlobCodec.can_decode(&FieldInfo::new(VAR_STRING, 16).with_collation(UTF8MB4_GENERAL_CI)));
        assert!(!BlobCodec.can_decode(&FieldInfo::new(LONG, 11)));
    }
}
