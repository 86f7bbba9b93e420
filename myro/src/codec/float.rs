use bytes::Bytes;

use super::{Codec, CodecContext, DecodeError, EncodeError, bind, fixed, parse_text};
use crate::{
    field::FieldInfo,
    mysql::{Format, types::{DOUBLE, FLOAT, is_decimal}},
    parameter::Parameter,
    value::{Value, ValueKind},
};

/// Declared `DECIMAL` size below which the value fits `f32` without loss
/// of the significant digits.
pub const FLOAT_DECIMAL_SIZE_LIMIT: u64 = 7;

/// `f32` codec.
///
/// Decodes `FLOAT` columns, and `DECIMAL` columns narrower than
/// [`FLOAT_DECIMAL_SIZE_LIMIT`]. Never reads `DOUBLE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatCodec;

impl Codec for FloatCodec {
    fn kind(&self) -> ValueKind {
        ValueKind::F32
    }

    fn can_decode(&self, field: &FieldInfo) -> bool {
        field.ty() == FLOAT || (field.is_decimal() && field.size() < FLOAT_DECIMAL_SIZE_LIMIT)
    }

    fn decode(&self, value: Bytes, field: &FieldInfo, format: Format, _: &CodecContext) -> Result<Value, DecodeError> {
        let value = match format.is_binary() && field.ty() == FLOAT {
            true => f32::from_le_bytes(fixed(&value, field)?),
            // decimal is text even in the binary protocol
            false => parse_text(&value, field, "invalid float text")?,
        };
        Ok(Value::F32(value))
    }

    fn encode(&self, value: Value, _: &CodecContext) -> Result<Parameter, EncodeError> {
        bind(value, ValueKind::F32, FLOAT)
    }
}

/// `f64` codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleCodec;

impl Codec for DoubleCodec {
    fn kind(&self) -> ValueKind {
        ValueKind::F64
    }

    fn can_decode(&self, field: &FieldInfo) -> bool {
        matches!(field.ty(), DOUBLE | FLOAT) || is_decimal(field.ty())
    }

    fn decode(&self, value: Bytes, field: &FieldInfo, format: Format, _: &CodecContext) -> Result<Value, DecodeError> {
        let value = match (format, field.ty()) {
            (Format::Binary, DOUBLE) => f64::from_le_bytes(fixed(&value, field)?),
            (Format::Binary, FLOAT) => f32::from_le_bytes(fixed(&value, field)?).into(),
            _ => parse_text(&value, field, "invalid double text")?,
        };
        Ok(Value::F64(value))
    }

    fn encode(&self, value: Value, _: &CodecContext) -> Result<Parameter, EncodeError> {
        bind(value, ValueKind::F64, DOUBLE)
    }
}

#[cfg(test)]
mod test {
    use bytes::BytesMut;

    use super::*;
    use crate::{
        mysql::types::{DECIMAL, LONG, NEWDECIMAL},
        parameter::ParameterWriter,
    };

    fn ctx() -> CodecContext {
        CodecContext::default()
    }

    fn binary_round_trip(v: f32) -> f32 {
        let param = FloatCodec.encode(Value::F32(v), &ctx()).unwrap();
        assert_eq!(param.type_code(), FLOAT);
        let mut buf = BytesMut::new();
        param.write_binary(&mut buf);
        let field = FieldInfo::new(FLOAT, 12);
        match FloatCodec.decode(buf.freeze(), &field, Format::Binary, &ctx()).unwrap() {
            Value::F32(v) => v,
            v => panic!("expected f32, found {v:?}"),
        }
    }

    #[test]
    fn binary_round_trip_is_bit_identical() {
        for v in [0.0, -0.0, 1.0, -1.5, f32::MIN_POSITIVE, f32::MAX, f32::INFINITY, f32::NEG_INFINITY, f32::NAN] {
            assert_eq!(binary_round_trip(v).to_bits(), v.to_bits(), "{v}");
        }
    }

    #[test]
    fn text_round_trip() {
        for v in [0.0, -0.0, 3.25, -1e-7, 1e20, f32::MAX, f32::INFINITY, f32::NEG_INFINITY] {
            let param = FloatCodec.encode(Value::F32(v), &ctx()).unwrap();
            let mut writer = ParameterWriter::new();
            param.publish_text(&mut writer);
            let text = Bytes::from(writer.into_string());
            let field = FieldInfo::new(FLOAT, 12);
            let decoded = FloatCodec.decode(text, &field, Format::Text, &ctx()).unwrap();
            assert_eq!(decoded, Value::F32(v), "{v}");
        }
    }

    #[test]
    fn decode_binary_one() {
        let field = FieldInfo::new(FLOAT, 12);
        let value = Bytes::from_static(&[0x00, 0x00, 0x80, 0x3F]);
        assert_eq!(FloatCodec.decode(value, &field, Format::Binary, &ctx()).unwrap(), Value::F32(1.0));
    }

    #[test]
    fn decode_decimal_as_text() {
        let field = FieldInfo::new(NEWDECIMAL, 6);
        let value = Bytes::from_static(b"12.50");
        // decimal stays text in the binary protocol
        assert_eq!(FloatCodec.decode(value, &field, Format::Binary, &ctx()).unwrap(), Value::F32(12.5));
    }

    #[test]
    fn can_decode() {
        assert!(FloatCodec.can_decode(&FieldInfo::new(FLOAT, 12)));
        assert!(FloatCodec.can_decode(&FieldInfo::new(DECIMAL, 6)));
        assert!(FloatCodec.can_decode(&FieldInfo::new(NEWDECIMAL, 6)));
        assert!(!FloatCodec.can_decode(&FieldInfo::new(DECIMAL, 7)));
        assert!(!FloatCodec.can_decode(&FieldInfo::new(NEWDECIMAL, 12)));
        assert!(!FloatCodec.can_decode(&FieldInfo::new(DOUBLE, 22)));
        assert!(!FloatCodec.can_decode(&FieldInfo::new(LONG, 4)));
    }

    #[test]
    fn malformed() {
        let field = FieldInfo::new(FLOAT, 12);
        let err = FloatCodec.decode(Bytes::from_static(&[0, 0]), &field, Format::Binary, &ctx()).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { ty: FLOAT, .. }));
        let err = FloatCodec.decode(Bytes::from_static(b"1.2.3"), &field, Format::Text, &ctx()).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { ty: FLOAT, .. }));
    }

    #[test]
    fn encode_exact_kind_only() {
        assert!(FloatCodec.can_encode(&Value::F32(1.0)));
        assert!(!FloatCodec.can_encode(&Value::F64(1.0)));
        assert!(matches!(
            FloatCodec.encode(Value::F64(1.0), &ctx()),
            Err(EncodeError::UnsupportedType { kind: ValueKind::F64 })
        ));
    }

    #[test]
    fn double_widens_float_column() {
        let field = FieldInfo::new(FLOAT, 12);
        let value = Bytes::from_static(&[0x00, 0x00, 0x80, 0x3F]);
        assert_eq!(DoubleCodec.decode(value, &field, Format::Binary, &ctx()).unwrap(), Value::F64(1.0));

        let field = FieldInfo::new(DOUBLE, 22);
        let value = Bytes::copy_from_slice(&2.5f64.to_le_bytes());
        assert_eq!(DoubleCodec.decode(value, &field, Format::Binary, &ctx()).unwrap(), Value::F64(2.5));
        assert!(DoubleCodec.can_decode(&FieldInfo::new(NEWDECIMAL, 30)));
    }
}
