//! MySQL Wire Protocol Core
//!
//! Building blocks of an asynchronous MySQL driver: packet framing, the
//! connection phase with capability negotiation and SSL upgrade, and a codec
//! registry converting between host values and their wire representation.
//!
//! # Examples
//!
//! Connecting:
//!
//! ```no_run
//! use myro::Connection;
//!
//! # async fn app() -> myro::Result<()> {
//! let mut conn = Connection::connect("mysql://root@localhost/shop").await?;
//!
//! println!("connected to {}", conn.session().server_version());
//! conn.ping().await?;
//! conn.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Decoding and binding values:
//!
//! ```
//! use myro::{Codecs, codec::CodecContext, field::FieldInfo, mysql::{Format, types}, parameter::ParameterWriter};
//!
//! # fn main() -> myro::Result<()> {
//! let codecs = Codecs::default();
//! let field = FieldInfo::new(types::FLOAT, 12);
//! let ctx = CodecContext::default();
//!
//! let value: f32 = codecs.decode(Some(bytes::Bytes::from_static(b"1.5")), &field, Format::Text, &ctx)?;
//! assert_eq!(value, 1.5);
//!
//! let param = codecs.bind(1.5f32, &ctx)?;
//! let mut writer = ParameterWriter::new();
//! param.publish_text(&mut writer);
//! assert_eq!(writer.as_str(), "1.5");
//! # Ok(())
//! # }
//! ```

pub mod common;
mod io;
pub mod net;
mod ext;

// Protocol
pub mod mysql;

// Encoding
pub mod field;
pub mod value;
pub mod codec;
pub mod alloc;
pub mod parameter;
pub mod types;

// Connection
pub mod handshake;
pub mod transport;
pub mod stream;
pub mod connection;

mod error;

pub use codec::{Codec, Codecs};
pub use value::{HostType, Value, ValueKind};
pub use parameter::Parameter;
pub use transport::{Transport, TransportExt};
pub use connection::{Config, Connection};
pub use error::{Error, ErrorKind, Result};
