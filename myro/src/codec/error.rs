use std::{fmt, io, str::Utf8Error};

use crate::{
    mysql::{TypeCode, types::type_name},
    value::ValueKind,
};

macro_rules! from {
    (<$ty:ty>$pat:pat => $body:expr) => {
        impl From<$ty> for DecodeError {
            fn from($pat: $ty) -> Self {
                $body
            }
        }
    };
}

/// An error when decoding column value.
pub enum DecodeError {
    /// No registered codec can produce the requested kind from the column.
    NoCodecFound {
        ty: TypeCode,
        kind: ValueKind,
    },
    /// Column value does not match its declared type.
    Malformed {
        ty: TypeCode,
        reason: &'static str,
    },
    /// Decoded value kind is not the requested kind.
    KindMismatch {
        expect: ValueKind,
        found: ValueKind,
    },
    /// Server returns non utf8 string.
    Utf8(Utf8Error),
    /// Column is NULL but the host type is not nullable.
    Null,
    /// Failed to deserialize using `serde_json`.
    #[cfg(feature = "json")]
    Json(serde_json::Error),
}

impl DecodeError {
    pub(crate) fn malformed(ty: TypeCode, reason: &'static str) -> DecodeError {
        Self::Malformed { ty, reason }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to decode value, ")?;
        match self {
            Self::NoCodecFound { ty, kind } => {
                write!(f, "no codec can decode `{}` into `{kind}`", type_name(*ty))
            },
            Self::Malformed { ty, reason } => write!(f, "malformed `{}`: {reason}", type_name(*ty)),
            Self::KindMismatch { expect, found } => write!(f, "expected `{expect}` found `{found}`"),
            Self::Utf8(e) => write!(f, "{e}"),
            Self::Null => f.write_str("unexpected NULL value"),
            #[cfg(feature = "json")]
            Self::Json(e) => write!(f, "{e}"),
        }
    }
}

from!(<Utf8Error>e => Self::Utf8(e));
#[cfg(feature = "json")]
from!(<serde_json::Error>e => Self::Json(e));

impl std::error::Error for DecodeError { }

impl fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// An error when encoding parameter.
pub enum EncodeError {
    /// No registered codec accepts the value.
    UnsupportedType {
        kind: ValueKind,
    },
    /// Buffer allocator failed.
    Alloc(io::Error),
    /// Buffer allocator returns smaller buffer than requested.
    Undersized {
        required: usize,
        capacity: usize,
    },
    /// Parameter wrote different amount of bytes than its binary length.
    SizeMismatch {
        expect: usize,
        written: usize,
    },
    /// Value has no wire representation.
    OutOfRange {
        kind: ValueKind,
        reason: &'static str,
    },
    /// Failed to serialize using `serde_json`.
    #[cfg(feature = "json")]
    Json(serde_json::Error),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to encode value, ")?;
        match self {
            Self::UnsupportedType { kind } => write!(f, "no codec accepts `{kind}`"),
            Self::Alloc(e) => write!(f, "buffer allocation failed: {e}"),
            Self::Undersized { required, capacity } => {
                write!(f, "allocated buffer of {capacity} bytes, required {required}")
            },
            Self::SizeMismatch { expect, written } => {
                write!(f, "expected {expect} bytes, written {written}")
            },
            Self::OutOfRange { kind, reason } => write!(f, "`{kind}` out of range: {reason}"),
            #[cfg(feature = "json")]
            Self::Json(e) => write!(f, "{e}"),
        }
    }
}

impl From<io::Error> for EncodeError {
    fn from(value: io::Error) -> Self {
        Self::Alloc(value)
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for EncodeError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl std::error::Error for EncodeError { }

impl fmt::Debug for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
