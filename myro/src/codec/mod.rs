//! Conversion between host values and their wire representation.
//!
//! Every [`Codec`] handles one host [`ValueKind`]. A [`Codecs`] registry holds
//! codecs in priority order and selects the first one able to handle a column
//! or a value.
//!
//! Available codecs:
//!
//! | codec | kind | decodes from |
//! |---|---|---|
//! | [`NullCodec`] | `Null` | nothing, encode only |
//! | [`BoolCodec`] | `Bool` | `BIT(1)`, `TINYINT(1)` |
//! | [`ByteCodec`] | `I8` | signed `TINYINT` |
//! | [`ShortCodec`] | `I16` | integers up to signed `SMALLINT`, `YEAR` |
//! | [`IntCodec`] | `I32` | integers up to signed `INT` |
//! | [`LongCodec`] | `I64` | integers except unsigned `BIGINT` |
//! | [`UnsignedLongCodec`] | `U64` | unsigned integers |
//! | [`FloatCodec`] | `F32` | `FLOAT`, narrow `DECIMAL` |
//! | [`DoubleCodec`] | `F64` | `DOUBLE`, `FLOAT`, `DECIMAL` |
//! | [`StringCodec`] | `String` | character strings, `DECIMAL`, `JSON` |
//! | [`BlobCodec`] | `Bytes` | blobs, binary strings, `BIT`, `GEOMETRY` |
//!
//! With `time` feature, `DateCodec` and `DateTimeCodec`. With `json` feature,
//! `JsonCodec`.
use bytes::Bytes;

use crate::{
    common::ByteStr,
    field::FieldInfo,
    mysql::{CollationId, Format, TypeCode, collations::UTF8MB4_GENERAL_CI},
    parameter::Parameter,
    value::{Value, ValueKind},
};

mod registry;
mod null;
mod boolean;
mod numeric;
mod float;
mod string;
mod blob;
mod error;

pub use registry::{Codecs, CodecsBuilder};
pub use null::NullCodec;
pub use boolean::BoolCodec;
pub use numeric::{ByteCodec, IntCodec, LongCodec, ShortCodec, UnsignedLongCodec};
pub use float::{DoubleCodec, FLOAT_DECIMAL_SIZE_LIMIT, FloatCodec};
pub use string::StringCodec;
pub use blob::BlobCodec;
pub use error::{DecodeError, EncodeError};

#[cfg(feature = "time")]
pub use crate::types::{DateCodec, DateTimeCodec};
#[cfg(feature = "json")]
pub use crate::types::JsonCodec;

/// Convert a single host value kind from and into the wire.
///
/// Codecs are stateless, predicates must be pure.
pub trait Codec: Send + Sync + 'static {
    /// The host value kind this codec produces and accepts.
    fn kind(&self) -> ValueKind;

    /// Returns `true` if this codec can decode the column into [`kind`][Codec::kind].
    fn can_decode(&self, field: &FieldInfo) -> bool;

    /// Decode a column value.
    ///
    /// Caller must ensure [`can_decode`][Codec::can_decode] returns `true` for
    /// the `field`.
    fn decode(&self, value: Bytes, field: &FieldInfo, format: Format, ctx: &CodecContext) -> Result<Value, DecodeError>;

    /// Returns `true` if this codec accepts the value.
    ///
    /// Only the exact kind is accepted, values are never widened.
    fn can_encode(&self, value: &Value) -> bool {
        value.kind() == self.kind()
    }

    /// Create a parameter from the value, no bytes are produced yet.
    fn encode(&self, value: Value, ctx: &CodecContext) -> Result<Parameter, EncodeError>;
}

/// Connection scoped information available to codecs.
#[derive(Debug, Clone)]
pub struct CodecContext {
    collation: CollationId,
    server_version: ByteStr,
}

impl CodecContext {
    pub fn new(collation: CollationId, server_version: ByteStr) -> Self {
        Self { collation, server_version }
    }

    /// Negotiated connection collation.
    pub fn collation(&self) -> CollationId {
        self.collation
    }

    pub fn server_version(&self) -> &str {
        &self.server_version
    }
}

impl Default for CodecContext {
    fn default() -> Self {
        Self { collation: UTF8MB4_GENERAL_CI, server_version: ByteStr::default() }
    }
}

/// Tag `value` with wire type `ty` when it is of `kind`.
pub(crate) fn bind(value: Value, kind: ValueKind, ty: TypeCode) -> Result<Parameter, EncodeError> {
    match value.kind() == kind {
        true => Ok(Parameter::new(value, ty)),
        false => Err(EncodeError::UnsupportedType { kind: value.kind() }),
    }
}

/// Parse text protocol value.
pub(crate) fn parse_text<T: std::str::FromStr>(value: &[u8], field: &FieldInfo, reason: &'static str) -> Result<T, DecodeError> {
    std::str::from_utf8(value)?
        .trim()
        .parse()
        .map_err(|_| DecodeError::malformed(field.ty(), reason))
}

/// Take exactly `N` bytes of binary protocol value.
pub(crate) fn fixed<const N: usize>(value: &[u8], field: &FieldInfo) -> Result<[u8; N], DecodeError> {
    value
        .try_into()
        .map_err(|_| DecodeError::malformed(field.ty(), "unexpected value length"))
}
