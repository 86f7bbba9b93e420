use bytes::Bytes;

use super::{Codec, CodecContext, DecodeError, EncodeError, bind, fixed, parse_text};
use crate::{
    field::FieldInfo,
    mysql::{
        Format, TypeCode,
        types::{INT24, LONG, LONGLONG, SHORT, TINY, YEAR, is_integer},
    },
    parameter::Parameter,
    value::{Value, ValueKind},
};

/// Integer read from the wire before narrowing into the host type.
enum Integer {
    Signed(i64),
    Unsigned(u64),
}

fn read_integer(value: &[u8], field: &FieldInfo, format: Format) -> Result<Integer, DecodeError> {
    let unsigned = field.is_unsigned();

    if !format.is_binary() {
        return match unsigned {
            true => parse_text(value, field, "invalid unsigned integer text").map(Integer::Unsigned),
            false => parse_text(value, field, "invalid integer text").map(Integer::Signed),
        };
    }

    let int = match (field.ty(), unsigned) {
        (TINY, false) => Integer::Signed(i8::from_le_bytes(fixed(value, field)?).into()),
        (TINY, true) => Integer::Unsigned(u8::from_le_bytes(fixed(value, field)?).into()),
        (SHORT, false) => Integer::Signed(i16::from_le_bytes(fixed(value, field)?).into()),
        // YEAR is unsigned regardless of flags
        (SHORT, true) | (YEAR, _) => Integer::Unsigned(u16::from_le_bytes(fixed(value, field)?).into()),
        // INT24 is sent in 4 bytes
        (INT24 | LONG, false) => Integer::Signed(i32::from_le_bytes(fixed(value, field)?).into()),
        (INT24 | LONG, true) => Integer::Unsigned(u32::from_le_bytes(fixed(value, field)?).into()),
        (LONGLONG, false) => Integer::Signed(i64::from_le_bytes(fixed(value, field)?)),
        (LONGLONG, true) => Integer::Unsigned(u64::from_le_bytes(fixed(value, field)?)),
        _ => return Err(DecodeError::malformed(field.ty(), "not an integer type")),
    };

    Ok(int)
}

fn narrow<T>(int: Integer, field: &FieldInfo) -> Result<T, DecodeError>
where
    T: TryFrom<i64> + TryFrom<u64>,
{
    let narrowed = match int {
        Integer::Signed(v) => <T as TryFrom<i64>>::try_from(v).ok(),
        Integer::Unsigned(v) => <T as TryFrom<u64>>::try_from(v).ok(),
    };
    narrowed.ok_or_else(|| DecodeError::malformed(field.ty(), "integer out of range"))
}

fn rank(ty: TypeCode) -> u8 {
    match ty {
        TINY => 0,
        SHORT | YEAR => 1,
        INT24 | LONG => 2,
        _ => 3,
    }
}

/// Returns `true` if every value of the column fits in signed host type of `ty`.
fn fits_signed(field: &FieldInfo, ty: TypeCode) -> bool {
    let (column, host) = (rank(field.ty()), rank(ty));
    // YEAR is flagged unsigned but fits SMALLINT
    match field.is_unsigned() && field.ty() != YEAR {
        true => column < host,
        false => column <= host,
    }
}

macro_rules! integer_codec {
    ($(
        $(#[$doc:meta])*
        $name:ident, $ty:ty, $kind:ident, $wire:ident, |$field:ident| $can_decode:expr;
    )*) => {$(
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Codec for $name {
            fn kind(&self) -> ValueKind {
                ValueKind::$kind
            }

            fn can_decode(&self, $field: &FieldInfo) -> bool {
                is_integer($field.ty()) && $can_decode
            }

            fn decode(&self, value: Bytes, field: &FieldInfo, format: Format, _: &CodecContext) -> Result<Value, DecodeError> {
                let int = read_integer(&value, field, format)?;
                narrow::<$ty>(int, field).map(Value::$kind)
            }

            fn encode(&self, value: Value, _: &CodecContext) -> Result<Parameter, EncodeError> {
                bind(value, ValueKind::$kind, $wire)
            }
        }
    )*};
}

integer_codec! {
    /// `i8` codec, `TINYINT`.
    ByteCodec, i8, I8, TINY, |field| fits_signed(field, TINY);
    /// `i16` codec, `SMALLINT`.
    ShortCodec, i16, I16, SHORT, |field| fits_signed(field, SHORT);
    /// `i32` codec, `INT`.
    IntCodec, i32, I32, LONG, |field| fits_signed(field, LONG);
    /// `i64` codec, `BIGINT`.
    LongCodec, i64, I64, LONGLONG, |field| fits_signed(field, LONGLONG);
    /// `u64` codec, `BIGINT UNSIGNED`.
    UnsignedLongCodec, u64, U64, LONGLONG, |field| field.is_unsigned() || field.ty() == YEAR;
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::field::ColumnFlags;

    fn ctx() -> CodecContext {
        CodecContext::default()
    }

    fn unsigned(ty: TypeCode, size: u64) -> FieldInfo {
        FieldInfo::new(ty, size).with_flags(ColumnFlags::UNSIGNED)
    }

    #[test]
    fn can_decode() {
        assert!(ByteCodec.can_decode(&FieldInfo::new(TINY, 4)));
        assert!(!ByteCodec.can_decode(&unsigned(TINY, 3)));
        assert!(!ByteCodec.can_decode(&FieldInfo::new(SHORT, 6)));

        assert!(ShortCodec.can_decode(&unsigned(TINY, 3)));
        assert!(ShortCodec.can_decode(&FieldInfo::new(YEAR, 4)));
        assert!(!ShortCodec.can_decode(&unsigned(SHORT, 5)));

        assert!(IntCodec.can_decode(&FieldInfo::new(INT24, 9)));
        assert!(IntCodec.can_decode(&unsigned(SHORT, 5)));
        assert!(!IntCodec.can_decode(&unsigned(LONG, 10)));

        assert!(LongCodec.can_decode(&unsigned(LONG, 10)));
        assert!(!LongCodec.can_decode(&unsigned(LONGLONG, 20)));

        assert!(UnsignedLongCodec.can_decode(&unsigned(LONGLONG, 20)));
        assert!(UnsignedLongCodec.can_decode(&unsigned(TINY, 3)));
        assert!(!UnsignedLongCodec.can_decode(&FieldInfo::new(LONG, 11)));
    }

    #[test]
    fn decode_binary_by_wire_type() {
        let field = FieldInfo::new(TINY, 4);
        let value = LongCodec.decode(Bytes::from_static(&[0xFF]), &field, Format::Binary, &ctx()).unwrap();
        assert_eq!(value, Value::I64(-1));

        let field = unsigned(TINY, 3);
        let value = LongCodec.decode(Bytes::from_static(&[0xFF]), &field, Format::Binary, &ctx()).unwrap();
        assert_eq!(value, Value::I64(255));

        let field = FieldInfo::new(INT24, 9);
        let value = IntCodec.decode(Bytes::from_static(&[0x00, 0x00, 0x80, 0xFF]), &field, Format::Binary, &ctx()).unwrap();
        assert_eq!(value, Value::I32(-8_388_608));

        let field = unsigned(LONGLONG, 20);
        let value = UnsignedLongCodec.decode(Bytes::from_static(&[0xFF; 8]), &field, Format::Binary, &ctx()).unwrap();
        assert_eq!(value, Value::U64(u64::MAX));
    }

    #[test]
    fn decode_text() {
        let field = FieldInfo::new(LONG, 11);
        let value = IntCodec.decode(Bytes::from_static(b"-42"), &field, Format::Text, &ctx()).unwrap();
        assert_eq!(value, Value::I32(-42));

        let field = FieldInfo::new(YEAR, 4);
        let value = ShortCodec.decode(Bytes::from_static(b"2024"), &field, Format::Text, &ctx()).unwrap();
        assert_eq!(value, Value::I16(2024));
    }

    #[test]
    fn out_of_range() {
        let field = FieldInfo::new(LONGLONG, 20);
        let err = ByteCodec.decode(Bytes::from_static(b"300"), &field, Format::Text, &ctx()).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { ty: LONGLONG, reason: "integer out of range" }));

        let field = FieldInfo::new(LONG, 11);
        let err = IntCodec.decode(Bytes::from_static(&[1, 2]), &field, Format::Binary, &ctx()).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { ty: LONG, .. }));
    }

    #[test]
    fn encode() {
        let param = UnsignedLongCodec.encode(Value::U64(7), &ctx()).unwrap();
        assert_eq!(param.type_code(), LONGLONG);
        assert!(param.is_unsigned());

        let param = ShortCodec.encode(Value::I16(7), &ctx()).unwrap();
        assert_eq!(param.type_code(), SHORT);
        assert!(!param.is_unsigned());

        assert!(IntCodec.encode(Value::I64(7), &ctx()).is_err());
    }
}
