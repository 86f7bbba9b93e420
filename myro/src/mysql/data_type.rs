//! <https://dev.mysql.com/doc/dev/mysql-server/latest/field__types_8h.html>

/// MySQL column type code.
///
/// The type code is transmitted as a single byte in column definitions and in
/// the parameter types of `COM_STMT_EXECUTE`.
pub type TypeCode = u8;

/// A type that have corresponding MySQL type code when bound as parameter.
pub trait MySqlType {
    const TYPE: TypeCode;
}

pub const DECIMAL: TypeCode = 0;
pub const TINY: TypeCode = 1;
pub const SHORT: TypeCode = 2;
pub const LONG: TypeCode = 3;
pub const FLOAT: TypeCode = 4;
pub const DOUBLE: TypeCode = 5;
pub const NULL: TypeCode = 6;
pub const TIMESTAMP: TypeCode = 7;
pub const LONGLONG: TypeCode = 8;
pub const INT24: TypeCode = 9;
pub const DATE: TypeCode = 10;
pub const TIME: TypeCode = 11;
pub const DATETIME: TypeCode = 12;
pub const YEAR: TypeCode = 13;
pub const VARCHAR: TypeCode = 15;
pub const BIT: TypeCode = 16;
pub const JSON: TypeCode = 245;
pub const NEWDECIMAL: TypeCode = 246;
pub const ENUM: TypeCode = 247;
pub const SET: TypeCode = 248;
pub const TINY_BLOB: TypeCode = 249;
pub const MEDIUM_BLOB: TypeCode = 250;
pub const LONG_BLOB: TypeCode = 251;
pub const BLOB: TypeCode = 252;
pub const VAR_STRING: TypeCode = 253;
pub const STRING: TypeCode = 254;
pub const GEOMETRY: TypeCode = 255;

/// Fixed point types, always transmitted as text even in the binary protocol.
pub const fn is_decimal(ty: TypeCode) -> bool {
    matches!(ty, DECIMAL | NEWDECIMAL)
}

/// Integer types, including `YEAR`.
pub const fn is_integer(ty: TypeCode) -> bool {
    matches!(ty, TINY | SHORT | INT24 | LONG | LONGLONG | YEAR)
}

/// Blob types, text columns are reported as blobs with a non binary collation.
pub const fn is_blob(ty: TypeCode) -> bool {
    matches!(ty, TINY_BLOB | MEDIUM_BLOB | LONG_BLOB | BLOB)
}

/// Character string types, binary strings share these codes.
pub const fn is_string(ty: TypeCode) -> bool {
    matches!(ty, VARCHAR | VAR_STRING | STRING | ENUM | SET)
}

/// Returns type name for display, `"UNKNOWN"` for unknown type code.
pub const fn type_name(ty: TypeCode) -> &'static str {
    match ty {
        DECIMAL => "DECIMAL",
        TINY => "TINYINT",
        SHORT => "SMALLINT",
        LONG => "INT",
        FLOAT => "FLOAT",
        DOUBLE => "DOUBLE",
        NULL => "NULL",
        TIMESTAMP => "TIMESTAMP",
        LONGLONG => "BIGINT",
        INT24 => "MEDIUMINT",
        DATE => "DATE",
        TIME => "TIME",
        DATETIME => "DATETIME",
        YEAR => "YEAR",
        VARCHAR => "VARCHAR",
        BIT => "BIT",
        JSON => "JSON",
        NEWDECIMAL => "NEWDECIMAL",
        ENUM => "ENUM",
        SET => "SET",
        TINY_BLOB => "TINYBLOB",
        MEDIUM_BLOB => "MEDIUMBLOB",
        LONG_BLOB => "LONGBLOB",
        BLOB => "BLOB",
        VAR_STRING => "VAR_STRING",
        STRING => "STRING",
        GEOMETRY => "GEOMETRY",
        _ => "UNKNOWN",
    }
}

macro_rules! ty {
    ($ty:ty, $code:ident $(, $doc:literal)? ) => {
        impl MySqlType for $ty {
            $(#[doc = $doc])?
            const TYPE: TypeCode = $code;
        }
    };
}

ty!((), NULL);
ty!(bool, TINY, "`BOOLEAN` is an alias of `TINYINT(1)`");
ty!(i8, TINY, "`TINYINT` 1-byte storage");
ty!(i16, SHORT, "`SMALLINT` 2-byte storage");
ty!(i32, LONG, "`INT` 4-byte storage");
ty!(i64, LONGLONG, "`BIGINT` 8-byte storage");
ty!(u64, LONGLONG, "`BIGINT UNSIGNED` 8-byte storage");
ty!(f32, FLOAT, "`FLOAT` single-precision floating point number, 4-byte storage");
ty!(f64, DOUBLE, "`DOUBLE` double-precision floating point number, 8-byte storage");
ty!(str, VARCHAR);
ty!(String, VARCHAR);
ty!([u8], BLOB);
ty!(bytes::Bytes, BLOB);
