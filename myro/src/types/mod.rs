//! Codecs for external types.
//!
//! Available for:
//!
//! - [`time`][::time]'s [`Date`][td] and [`PrimitiveDateTime`][tp], requires `time` feature
//! - [`serde_json`]'s [`Value`][jv], and any [`serde`] type via [`Json`], requires `json` feature
//!
//! All of them are registered in [`Codecs::default`][crate::codec::Codecs].
//!
//! [td]: ::time::Date
//! [tp]: ::time::PrimitiveDateTime
//! [jv]: serde_json::Value

#[cfg(feature = "json")]
mod json;
#[cfg(feature = "json")]
pub use json::{Json, JsonCodec};

#[cfg(feature = "time")]
mod time;
#[cfg(feature = "time")]
pub use time::{DateCodec, DateTimeCodec};
