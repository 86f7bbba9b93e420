use bytes::{Buf, Bytes};
use time::{
    Date, Month, PrimitiveDateTime, Time,
    format_description::BorrowedFormatItem,
    macros::format_description,
};

use crate::{
    codec::{Codec, CodecContext, DecodeError, EncodeError, bind},
    field::FieldInfo,
    mysql::{Format, types::{DATE, DATETIME, TIMESTAMP}},
    parameter::Parameter,
    value::{Value, ValueKind},
};

const DATE_TEXT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

const DATETIME_TEXT: &[BorrowedFormatItem<'_>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"
);

/// [`Date`] codec, `DATE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateCodec;

impl Codec for DateCodec {
    fn kind(&self) -> ValueKind {
        ValueKind::Date
    }

    fn can_decode(&self, field: &FieldInfo) -> bool {
        field.ty() == DATE
    }

    fn decode(&self, value: Bytes, field: &FieldInfo, format: Format, _: &CodecContext) -> Result<Value, DecodeError> {
        let date = match format {
            Format::Binary => read_binary(value, field)?.date(),
            Format::Text => {
                let text = std::str::from_utf8(&value)?;
                Date::parse(text, DATE_TEXT).map_err(|_| DecodeError::malformed(field.ty(), "invalid date text"))?
            }
        };
        Ok(Value::Date(date))
    }

    fn encode(&self, value: Value, _: &CodecContext) -> Result<Parameter, EncodeError> {
        if let Value::Date(date) = &value {
            check_year(date.year(), ValueKind::Date)?;
        }
        bind(value, ValueKind::Date, DATE)
    }
}

/// [`PrimitiveDateTime`] codec, `DATETIME` and `TIMESTAMP`.
///
/// `TIMESTAMP` is returned in the session time zone, no offset is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeCodec;

impl Codec for DateTimeCodec {
    fn kind(&self) -> ValueKind {
        ValueKind::DateTime
    }

    fn can_decode(&self, field: &FieldInfo) -> bool {
        matches!(field.ty(), DATETIME | TIMESTAMP)
    }

    fn decode(&self, value: Bytes, field: &FieldInfo, format: Format, _: &CodecContext) -> Result<Value, DecodeError> {
        let datetime = match format {
            Format::Binary => read_binary(value, field)?,
            Format::Text => {
                let text = std::str::from_utf8(&value)?;
                PrimitiveDateTime::parse(text, DATETIME_TEXT)
                    .map_err(|_| DecodeError::malformed(field.ty(), "invalid datetime text"))?
            }
        };
        Ok(Value::DateTime(datetime))
    }

    fn encode(&self, value: Value, _: &CodecContext) -> Result<Parameter, EncodeError> {
        if let Value::DateTime(datetime) = &value {
            check_year(datetime.year(), ValueKind::DateTime)?;
        }
        bind(value, ValueKind::DateTime, DATETIME)
    }
}

/// Binary year is u16 and text year is 4 digits.
fn check_year(year: i32, kind: ValueKind) -> Result<(), EncodeError> {
    match year {
        0..=9999 => Ok(()),
        _ => Err(EncodeError::OutOfRange { kind, reason: "year must be within 0 to 9999" }),
    }
}

/// Read length prefixed binary temporal value.
///
/// ```text
/// len | year u16 | month | day | hour | minute | second | micros u32
/// ```
///
/// The length is 4, 7 or 11, trailing parts omitted are zero. Zero length is
/// the zero date, which has no representation.
fn read_binary(mut value: Bytes, field: &FieldInfo) -> Result<PrimitiveDateTime, DecodeError> {
    let malformed = |reason| DecodeError::malformed(field.ty(), reason);

    if value.is_empty() {
        return Err(malformed("missing temporal length"));
    }

    let len = usize::from(value.get_u8());
    if value.len() != len {
        return Err(malformed("unexpected value length"));
    }

    let (year, month, day) = match len {
        0 => return Err(malformed("zero date")),
        4 | 7 | 11 => (value.get_u16_le(), value.get_u8(), value.get_u8()),
        _ => return Err(malformed("invalid temporal length")),
    };

    let (hour, minute, second) = match len {
        7 | 11 => (value.get_u8(), value.get_u8(), value.get_u8()),
        _ => (0, 0, 0),
    };

    let micro = match len {
        11 => value.get_u32_le(),
        _ => 0,
    };

    let month = Month::try_from(month).map_err(|_| malformed("month out of range"))?;
    let date = Date::from_calendar_date(year.into(), month, day).map_err(|_| malformed("date out of range"))?;
    let time = Time::from_hms_micro(hour, minute, second, micro).map_err(|_| malformed("time out of range"))?;

    Ok(PrimitiveDateTime::new(date, time))
}

#[cfg(test)]
mod test {
    use bytes::BytesMut;
    use time::macros::{date, datetime};

    use super::*;
    use crate::mysql::types::VARCHAR;

    fn ctx() -> CodecContext {
        CodecContext::default()
    }

    fn binary(value: Value) -> Bytes {
        let param = Parameter::new(value, VARCHAR);
        let mut buf = BytesMut::new();
        param.write_binary(&mut buf);
        buf.freeze()
    }

    #[test]
    fn date_binary() {
        let field = FieldInfo::new(DATE, 10);
        let value = binary(Value::Date(date!(2024 - 02 - 29)));
        assert_eq!(&value[..], &[4, 0xE8, 0x07, 2, 29]);
        let decoded = DateCodec.decode(value, &field, Format::Binary, &ctx()).unwrap();
        assert_eq!(decoded, Value::Date(date!(2024 - 02 - 29)));
    }

    #[test]
    fn date_text() {
        let field = FieldInfo::new(DATE, 10);
        let decoded = DateCodec.decode(Bytes::from_static(b"1999-12-31"), &field, Format::Text, &ctx()).unwrap();
        assert_eq!(decoded, Value::Date(date!(1999 - 12 - 31)));
    }

    #[test]
    fn datetime_binary() {
        let field = FieldInfo::new(DATETIME, 26);
        for dt in [datetime!(2024-01-02 03:04:05), datetime!(2024-01-02 03:04:05.000123)] {
            let value = binary(Value::DateTime(dt));
            let decoded = DateTimeCodec.decode(value, &field, Format::Binary, &ctx()).unwrap();
            assert_eq!(decoded, Value::DateTime(dt));
        }

        let midnight = Bytes::from_static(&[4, 0xE8, 0x07, 1, 2]);
        let decoded = DateTimeCodec.decode(midnight, &field, Format::Binary, &ctx()).unwrap();
        assert_eq!(decoded, Value::DateTime(datetime!(2024-01-02 00:00:00)));
    }

    #[test]
    fn datetime_text() {
        let field = FieldInfo::new(TIMESTAMP, 19);
        let decoded = DateTimeCodec
            .decode(Bytes::from_static(b"2024-01-02 03:04:05"), &field, Format::Text, &ctx())
            .unwrap();
        assert_eq!(decoded, Value::DateTime(datetime!(2024-01-02 03:04:05)));

        let decoded = DateTimeCodec
            .decode(Bytes::from_static(b"2024-01-02 03:04:05.250"), &field, Format::Text, &ctx())
            .unwrap();
        assert_eq!(decoded, Value::DateTime(datetime!(2024-01-02 03:04:05.25)));
    }

    #[test]
    fn malformed() {
        let field = FieldInfo::new(DATE, 10);
        let cases: [&[u8]; 5] = [&[], &[0], &[4, 0xE8, 0x07, 2], &[4, 0xE8, 0x07, 13, 1], &[5, 0, 0, 0, 0, 0]];
        for value in cases {
            let err = DateCodec.decode(Bytes::copy_from_slice(value), &field, Format::Binary, &ctx()).unwrap_err();
            assert!(matches!(err, DecodeError::Malformed { ty: DATE, .. }), "{value:?}");
        }
        let err = DateCodec.decode(Bytes::from_static(b"0000-00-00"), &field, Format::Text, &ctx()).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { ty: DATE, .. }));
    }

    #[test]
    fn encode() {
        let param = DateCodec.encode(Value::Date(date!(2024 - 01 - 01)), &ctx()).unwrap();
        assert_eq!(param.type_code(), DATE);
        let param = DateTimeCodec.encode(Value::DateTime(datetime!(2024-01-01 0:00)), &ctx()).unwrap();
        assert_eq!(param.type_code(), DATETIME);
        assert!(DateCodec.encode(Value::I32(1), &ctx()).is_err());
    }

    #[test]
    fn encode_year_out_of_range() {
        let bc = Date::from_calendar_date(-1, Month::January, 1).unwrap();
        let err = DateCodec.encode(Value::Date(bc), &ctx()).unwrap_err();
        assert!(matches!(err, EncodeError::OutOfRange { kind: ValueKind::Date, .. }));

        let err = DateTimeCodec.encode(Value::DateTime(bc.midnight()), &ctx()).unwrap_err();
        assert!(matches!(err, EncodeError::OutOfRange { kind: ValueKind::DateTime, .. }));

        let year_zero = Date::from_calendar_date(0, Month::January, 1).unwrap();
        let param = DateCodec.encode(Value::Date(year_zero), &ctx()).unwrap();
        assert_eq!(&binary(param.into_value())[..], &[4, 0, 0, 1, 1]);
    }
}
