use bytes::Bytes;
use std::{fmt, sync::Arc};

use super::{
    BlobCodec, BoolCodec, ByteCodec, Codec, CodecContext, DecodeError, DoubleCodec, EncodeError,
    FloatCodec, IntCodec, LongCodec, NullCodec, ShortCodec, StringCodec, UnsignedLongCodec,
};
use crate::{
    common::verbose,
    field::FieldInfo,
    mysql::Format,
    parameter::Parameter,
    value::{HostType, Value, ValueKind},
};

/// Ordered collection of [`Codec`].
///
/// Resolution scans codecs in registration order and the first match wins.
/// The registry is immutable once built, cloning is cheap and shares the
/// same codecs.
#[derive(Clone)]
pub struct Codecs {
    codecs: Arc<[Box<dyn Codec>]>,
}

impl Codecs {
    /// Create empty [`CodecsBuilder`].
    pub fn builder() -> CodecsBuilder {
        CodecsBuilder { codecs: Vec::new() }
    }

    /// Find the codec which decodes `field` into `kind`.
    pub fn resolve_decode(
        &self,
        field: &FieldInfo,
        kind: ValueKind,
        #[cfg_attr(not(feature = "verbose"), allow(unused_variables))] format: Format,
    ) -> Result<&dyn Codec, DecodeError> {
        verbose!(ty = field.ty(), %kind, ?format, "resolve decode");
        self.codecs
            .iter()
            .find(|codec| codec.kind() == kind && codec.can_decode(field))
            .map(Box::as_ref)
            .ok_or(DecodeError::NoCodecFound { ty: field.ty(), kind })
    }

    /// Find the codec which accepts `value`.
    pub fn resolve_encode(&self, value: &Value) -> Result<&dyn Codec, EncodeError> {
        self.codecs
            .iter()
            .find(|codec| codec.can_encode(value))
            .map(Box::as_ref)
            .ok_or(EncodeError::UnsupportedType { kind: value.kind() })
    }

    /// Decode a non NULL column value into `kind`.
    pub fn decode_value(
        &self,
        value: Bytes,
        field: &FieldInfo,
        kind: ValueKind,
        format: Format,
        ctx: &CodecContext,
    ) -> Result<Value, DecodeError> {
        self.resolve_decode(field, kind, format)?.decode(value, field, format, ctx)
    }

    /// Decode a column value into host type, `None` is a NULL column.
    pub fn decode<T: HostType>(
        &self,
        value: Option<Bytes>,
        field: &FieldInfo,
        format: Format,
        ctx: &CodecContext,
    ) -> Result<T, DecodeError> {
        match value {
            Some(value) => T::from_value(self.decode_value(value, field, T::KIND, format, ctx)?),
            None => T::from_value(Value::Null),
        }
    }

    /// Create a parameter from value.
    pub fn encode(&self, value: Value, ctx: &CodecContext) -> Result<Parameter, EncodeError> {
        self.resolve_encode(&value)?.encode(value, ctx)
    }

    /// Create a parameter from host type.
    pub fn bind<T: HostType>(&self, value: T, ctx: &CodecContext) -> Result<Parameter, EncodeError> {
        self.encode(value.into_value()?, ctx)
    }

    /// Returns the number of registered codecs.
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

impl Default for Codecs {
    /// Registry with all built-in codecs.
    fn default() -> Self {
        Self::builder().defaults().build()
    }
}

impl fmt::Debug for Codecs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.codecs.iter().map(|codec| codec.kind()))
            .finish()
    }
}

/// Builder for [`Codecs`].
pub struct CodecsBuilder {
    codecs: Vec<Box<dyn Codec>>,
}

impl CodecsBuilder {
    /// Append a codec, it takes priority over every codec appended after.
    pub fn codec(mut self, codec: impl Codec) -> Self {
        self.codecs.push(Box::new(codec));
        self
    }

    /// Append all built-in codecs.
    pub fn defaults(self) -> Self {
        let me = self
            .codec(NullCodec)
            .codec(BoolCodec)
            .codec(ByteCodec)
            .codec(ShortCodec)
            .codec(IntCodec)
            .codec(LongCodec)
            .codec(UnsignedLongCodec)
            .codec(FloatCodec)
            .codec(DoubleCodec)
            .codec(StringCodec)
            .codec(BlobCodec);

        #[cfg(feature = "time")]
        let me = me.codec(super::DateCodec).codec(super::DateTimeCodec);
        #[cfg(feature = "json")]
        let me = me.codec(super::JsonCodec);

        me
    }

    pub fn build(self) -> Codecs {
        Codecs { codecs: self.codecs.into() }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mysql::types::{DECIMAL, DOUBLE, FLOAT, LONG, NEWDECIMAL};

    fn ctx() -> CodecContext {
        CodecContext::default()
    }

    #[test]
    fn registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() { }
        assert_send_sync::<Codecs>();
    }

    #[test]
    fn resolve_decode() {
        let codecs = Codecs::default();
        let codec = codecs.resolve_decode(&FieldInfo::new(FLOAT, 12), ValueKind::F32, Format::Binary).unwrap();
        assert_eq!(codec.kind(), ValueKind::F32);

        let err = codecs
            .resolve_decode(&FieldInfo::new(DOUBLE, 22), ValueKind::F32, Format::Binary)
            .err()
            .unwrap();
        assert!(matches!(err, DecodeError::NoCodecFound { ty: DOUBLE, kind: ValueKind::F32 }));

        let err = codecs
            .resolve_decode(&FieldInfo::new(DECIMAL, 7), ValueKind::F32, Format::Text)
            .err()
            .unwrap();
        assert!(matches!(err, DecodeError::NoCodecFound { ty: DECIMAL, .. }));
    }

    #[test]
    fn resolve_encode() {
        let codecs = Codecs::default();
        assert_eq!(codecs.resolve_encode(&Value::F64(1.0)).unwrap().kind(), ValueKind::F64);

        let empty = Codecs::builder().build();
        assert!(empty.is_empty());
        assert!(matches!(
            empty.encode(Value::I32(1), &ctx()),
            Err(EncodeError::UnsupportedType { kind: ValueKind::I32 })
        ));
    }

    /// Decode every decimal as zero.
    struct ZeroDecimal;

    impl Codec for ZeroDecimal {
        fn kind(&self) -> ValueKind {
            ValueKind::F32
        }

        fn can_decode(&self, field: &FieldInfo) -> bool {
            field.is_decimal()
        }

        fn decode(&self, _: Bytes, _: &FieldInfo, _: Format, _: &CodecContext) -> Result<Value, DecodeError> {
            Ok(Value::F32(0.0))
        }

        fn encode(&self, value: Value, ctx: &CodecContext) -> Result<Parameter, EncodeError> {
            FloatCodec.encode(value, ctx)
        }
    }

    #[test]
    fn priority_order() {
        let field = FieldInfo::new(NEWDECIMAL, 4);
        let value = || Some(Bytes::from_static(b"1.5"));

        let custom_first = Codecs::builder().codec(ZeroDecimal).defaults().build();
        let decoded: f32 = custom_first.decode(value(), &field, Format::Text, &ctx()).unwrap();
        assert_eq!(decoded, 0.0);

        let custom_last = Codecs::builder().defaults().codec(ZeroDecimal).build();
        let decoded: f32 = custom_last.decode(value(), &field, Format::Text, &ctx()).unwrap();
        assert_eq!(decoded, 1.5);

        // wider decimal only matches the custom codec
        let field = FieldInfo::new(NEWDECIMAL, 20);
        let decoded: f32 = custom_last.decode(value(), &field, Format::Text, &ctx()).unwrap();
        assert_eq!(decoded, 0.0);
    }

    #[test]
    fn decode_host_type() {
        let codecs = Codecs::default();
        let field = FieldInfo::new(LONG, 11);

        let value: i64 = codecs.decode(Some(Bytes::from_static(b"42")), &field, Format::Text, &ctx()).unwrap();
        assert_eq!(value, 42);

        let value: Option<i32> = codecs.decode(None, &field, Format::Text, &ctx()).unwrap();
        assert_eq!(value, None);

        let err = codecs.decode::<i32>(None, &field, Format::Text, &ctx()).unwrap_err();
        assert!(matches!(err, DecodeError::Null));
    }

    #[test]
    fn bind_host_type() {
        let codecs = Codecs::default();
        let param = codecs.bind(1.0f32, &ctx()).unwrap();
        assert_eq!(param.type_code(), FLOAT);
        assert_eq!(param, FloatCodec.encode(Value::F32(1.0), &ctx()).unwrap());

        let param = codecs.bind(None::<String>, &ctx()).unwrap();
        assert!(param.is_null());
    }
}
