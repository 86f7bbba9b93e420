//! MySQL Client/Server Protocol
//!
//! ## Packets
//!
//! Both sides communicate in packets. Each packet is prefixed by an envelope
//! of a 3 bytes little endian payload length and a 1 byte sequence id.
//!
//! ```text
//! ┏━━━━━━━━━━━━━━┳━━━━━┳━━━━━━━━━┓
//! ┃    Length    ┃ Seq ┃ Payload ┃
//! ┣━━━━━━━━━━━━━━╋━━━━━╋━━━━━━━━━┫
//! ┃   u24 (LE)   ┃ u8  ┃  [u8]   ┃
//! ┣━━━━━━━━━━━━━━╋━━━━━╋━━━━━━━━━┫
//! ┃ 20 | 00 | 00 ┃ 01  ┃   ..    ┃
//! ┗━━━━━━━━━━━━━━┻━━━━━┻━━━━━━━━━┛
//! ```
//!
//! The sequence id is incremented with each packet and may wrap around. It
//! starts at 0 and is reset to 0 when a new command begins.
//!
//! ## [`Format`] and the two sub-protocols
//!
//! Values of a simple query travel in the text protocol, where every value is
//! its human readable representation. Values bound to and returned from a
//! prepared statement travel in the binary protocol, where fixed width values
//! use little endian layout.
//!
//! <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_basic_packets.html>

mod capability;
mod collation;
mod data_type;
mod format;

pub mod client;
pub mod server;

mod error;

pub use capability::Capabilities;
pub use collation::CollationId;
pub use data_type::{MySqlType, TypeCode};
pub use format::Format;

pub use client::ClientMessage;
pub use server::{ServerMessage, ServerError};
pub use error::{PreconditionViolation, ProtocolError};

/// Data type codes and predicates.
pub mod types {
    pub use super::data_type::*;
}

/// Well known collations.
pub mod collations {
    pub use super::collation::*;
}

/// Largest payload a single packet can carry, `2^24 - 1`.
pub const MAX_PAYLOAD_SIZE: u32 = 0xFF_FFFF;

/// Maximum packet size announced in the handshake response.
///
/// One more than [`MAX_PAYLOAD_SIZE`] so the envelope sequence id fits.
pub const MAX_PACKET_SIZE: u32 = MAX_PAYLOAD_SIZE + 1;
