//! MySQL Server Messages
//!
//! <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_basic_response_packets.html>
use bytes::{Buf, Bytes, BytesMut};
use std::fmt;

use super::{Capabilities, CollationId, ProtocolError, TypeCode};
use crate::{
    common::ByteStr,
    ext::{BytesExt, FmtExt},
    field::{ColumnFlags, FieldInfo},
};

/// A type that can be decoded from a server packet payload.
pub trait ServerMessage: Sized {
    fn decode(body: Bytes) -> Result<Self, ProtocolError>;
}

const OK: u8 = 0x00;
const AUTH_MORE_DATA: u8 = 0x01;
const HANDSHAKE_V10: u8 = 0x0A;
const EOF: u8 = 0xFE;
const ERR: u8 = 0xFF;

/// Get packet name from its header byte.
///
/// Returns `"Unknown"` for unknown header.
pub(crate) fn packet_name(header: u8) -> &'static str {
    match header {
        OK => "OK",
        AUTH_MORE_DATA => "AuthMoreData",
        HANDSHAKE_V10 => "HandshakeV10",
        EOF => "AuthSwitchRequest",
        ERR => "ERR",
        _ => "Unknown",
    }
}

/// Returns `true` if the payload is an ERR packet.
pub fn is_err_packet(body: &[u8]) -> bool {
    body.first() == Some(&ERR)
}

macro_rules! assert_header {
    ($body:ident, $($header:ident)|*, $name:literal) => {
        match $body.try_get_u8()? {
            $($header)|* => { }
            found => return Err(ProtocolError::unexpected($name, found)),
        }
    };
}

/// Initial packet sent by the server.
///
/// <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_connection_phase_packets_protocol_handshake_v10.html>
#[derive(Debug)]
pub struct ServerGreeting {
    pub protocol_version: u8,
    /// Human readable server version.
    pub server_version: ByteStr,
    pub connection_id: u32,
    /// Scramble for the auth plugin, both parts concatenated.
    pub auth_plugin_data: Bytes,
    pub capabilities: Capabilities,
    /// Server default collation, only the low 8 bits.
    pub collation: CollationId,
    pub status_flags: u16,
    pub auth_plugin_name: Option<ByteStr>,
}

impl ServerGreeting {
    pub const PROTOCOL_VERSION: u8 = 10;

    /// Scramble part 1 is always 8 bytes.
    const SCRAMBLE_1: usize = 8;
    /// Scramble part 2 is at least 13 bytes, including trailing nul.
    const SCRAMBLE_2_MIN: usize = 13;
}

impl ServerMessage for ServerGreeting {
    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        let protocol_version = body.try_get_u8()?;
        if protocol_version == ERR {
            return Err(ProtocolError::unexpected("HandshakeV10", ERR));
        }
        if protocol_version != Self::PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion { version: protocol_version });
        }

        let server_version = body.get_nul_bytestr()?;
        let connection_id = body.try_get_u32_le()?;
        let scramble_1 = body.try_split_to(Self::SCRAMBLE_1)?;
        body.try_get_u8()?; // filler
        let caps_lower = body.try_get_u16_le()?;

        let mut greeting = ServerGreeting {
            protocol_version,
            server_version,
            connection_id,
            auth_plugin_data: scramble_1.clone(),
            capabilities: Capabilities::from_bits(caps_lower.into()),
            collation: 0,
            status_flags: 0,
            auth_plugin_name: None,
        };

        // pre 4.1 server ends here
        if !body.has_remaining() {
            return Ok(greeting);
        }

        greeting.collation = body.try_get_u8()?.into();
        greeting.status_flags = body.try_get_u16_le()?;
        let caps_upper = body.try_get_u16_le()?;
        let capabilities = Capabilities::from_bits(u32::from(caps_upper) << 16 | u32::from(caps_lower));
        greeting.capabilities = capabilities;

        let auth_data_len = body.try_get_u8()?;
        body.try_split_to(10)?; // reserved

        if capabilities.contains(Capabilities::SECURE_CONNECTION) {
            let len = Self::SCRAMBLE_2_MIN.max(usize::from(auth_data_len).saturating_sub(Self::SCRAMBLE_1));
            let mut scramble_2 = body.try_split_to(len.min(body.remaining()))?;
            if scramble_2.last() == Some(&0) {
                scramble_2.truncate(scramble_2.len() - 1);
            }
            let mut data = BytesMut::with_capacity(scramble_1.len() + scramble_2.len());
            data.extend_from_slice(&scramble_1);
            data.extend_from_slice(&scramble_2);
            greeting.auth_plugin_data = data.freeze();
        }

        if capabilities.contains(Capabilities::PLUGIN_AUTH) {
            // some servers omit the nul terminator
            let name = match body.iter().position(|b| *b == 0) {
                Some(_) => body.get_nul_bytestr()?,
                None => ByteStr::from_utf8(body.split_off(0))?,
            };
            greeting.auth_plugin_name = Some(name);
        }

        Ok(greeting)
    }
}

/// Signals successful completion of a command.
///
/// <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_basic_ok_packet.html>
#[derive(Debug)]
pub struct OkPacket {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status_flags: u16,
    pub warnings: u16,
    /// Human readable status information.
    pub info: Bytes,
}

impl ServerMessage for OkPacket {
    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_header!(body, OK | EOF, "OK");
        Ok(Self {
            affected_rows: body.get_lenenc_int()?,
            last_insert_id: body.get_lenenc_int()?,
            status_flags: body.try_get_u16_le()?,
            warnings: body.try_get_u16_le()?,
            info: body,
        })
    }
}

/// Error reported by the server.
///
/// <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_basic_err_packet.html>
#[derive(Clone)]
pub struct ServerError {
    code: u16,
    sql_state: Option<ByteStr>,
    message: String,
}

impl ServerError {
    const SQL_STATE_MARKER: u8 = b'#';
    const SQL_STATE_LEN: usize = 5;

    /// Server error code.
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Five characters SQLSTATE, absent in errors sent before the handshake.
    pub fn sql_state(&self) -> Option<&str> {
        self.sql_state.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl ServerMessage for ServerError {
    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_header!(body, ERR, "ERR");
        let code = body.try_get_u16_le()?;
        let sql_state = if body.first() == Some(&Self::SQL_STATE_MARKER) {
            body.advance(1);
            Some(ByteStr::from_utf8(body.try_split_to(Self::SQL_STATE_LEN)?)?)
        } else {
            None
        };
        Ok(Self {
            code,
            sql_state,
            message: body.lossy().to_string(),
        })
    }
}

impl std::error::Error for ServerError { }

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sql_state {
            Some(state) => write!(f, "ERROR {} ({state}): {}", self.code, self.message),
            None => write!(f, "ERROR {}: {}", self.code, self.message),
        }
    }
}

impl fmt::Debug for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// Server reply to the handshake response.
#[derive(Debug)]
pub enum AuthResult {
    /// Authentication succeeded.
    Ok(OkPacket),
    /// Authentication failed.
    Err(ServerError),
    /// Server asks to continue with another auth plugin.
    Switch {
        plugin: ByteStr,
        data: Bytes,
    },
    /// Extra data for the current auth plugin.
    MoreData(Bytes),
}

impl ServerMessage for AuthResult {
    fn decode(body: Bytes) -> Result<Self, ProtocolError> {
        let Some(&header) = body.first() else {
            return Err(ProtocolError::malformed("empty packet"));
        };
        let result = match header {
            OK => Self::Ok(OkPacket::decode(body)?),
            ERR => Self::Err(ServerError::decode(body)?),
            EOF => {
                let mut body = body;
                body.advance(1);
                Self::Switch {
                    plugin: body.get_nul_bytestr()?,
                    data: body,
                }
            },
            AUTH_MORE_DATA => Self::MoreData(body.slice(1..)),
            found => return Err(ProtocolError::unexpected("OK", found)),
        };
        Ok(result)
    }
}

/// Describes a column in a result set or a statement parameter.
///
/// <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_com_query_response_text_resultset_column_definition.html>
#[derive(Debug)]
pub struct ColumnDefinition {
    pub schema: ByteStr,
    /// Virtual table name.
    pub table: ByteStr,
    /// Physical table name.
    pub org_table: ByteStr,
    /// Virtual column name.
    pub name: ByteStr,
    /// Physical column name.
    pub org_name: ByteStr,
    pub collation: CollationId,
    pub column_length: u32,
    pub ty: TypeCode,
    pub flags: ColumnFlags,
    pub decimals: u8,
}

impl ColumnDefinition {
    const CATALOG: &'static [u8] = b"def";
    const FIXED_FIELDS_LEN: u64 = 0x0C;

    /// Returns codec facing field metadata.
    pub fn field_info(&self) -> FieldInfo {
        FieldInfo::new(self.ty, self.column_length.into())
            .with_flags(self.flags)
            .with_collation(self.collation)
            .with_decimals(self.decimals)
    }
}

impl ServerMessage for ColumnDefinition {
    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        if body.get_lenenc_bytes()? != Self::CATALOG {
            return Err(ProtocolError::malformed("column catalog is not `def`"));
        }
        let schema = body.get_lenenc_bytestr()?;
        let table = body.get_lenenc_bytestr()?;
        let org_table = body.get_lenenc_bytestr()?;
        let name = body.get_lenenc_bytestr()?;
        let org_name = body.get_lenenc_bytestr()?;
        if body.get_lenenc_int()? != Self::FIXED_FIELDS_LEN {
            return Err(ProtocolError::malformed("invalid column fixed fields length"));
        }
        Ok(Self {
            schema,
            table,
            org_table,
            name,
            org_name,
            collation: body.try_get_u16_le()?,
            column_length: body.try_get_u32_le()?,
            ty: body.try_get_u8()?,
            flags: ColumnFlags::from_bits(body.try_get_u16_le()?),
            decimals: body.try_get_u8()?,
        })
    }
}

/// Server packet builders for tests.
#[cfg(test)]
pub(crate) mod fixture {
    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::ext::BufMutExt;

    pub const SCRAMBLE: &[u8; 20] = b"abcdefghijklmnopqrst";

    pub fn greeting(capabilities: Capabilities, collation: u8) -> BytesMut {
        let caps = capabilities.bits();
        let mut buf = BytesMut::new();
        buf.put_u8(10);
        buf.put_nul_string("8.0.36");
        buf.put_u32_le(42);
        buf.put_slice(&SCRAMBLE[..8]);
        buf.put_u8(0);
        buf.put_u16_le(caps as u16);
        buf.put_u8(collation);
        buf.put_u16_le(0x0002);
        buf.put_u16_le((caps >> 16) as u16);
        buf.put_u8(21);
        buf.put_bytes(0, 10);
        buf.put_slice(&SCRAMBLE[8..]);
        buf.put_u8(0);
        buf.put_nul_string("mysql_native_password");
        buf
    }

    pub fn ok() -> BytesMut {
        BytesMut::from(&[0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00][..])
    }

    pub fn err(code: u16, state: &str, message: &str) -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put_u8(0xFF);
        buf.put_u16_le(code);
        buf.put_u8(b'#');
        buf.put_slice(state.as_bytes());
        buf.put_slice(message.as_bytes());
        buf
    }
}

#[cfg(test)]
mod test {
    use bytes::BufMut;

    use super::*;
    use crate::{ext::BufMutExt, mysql::types};

    #[test]
    fn greeting() {
        let caps = Capabilities::CLIENT_DEFAULT | Capabilities::SSL;
        let greeting = ServerGreeting::decode(fixture::greeting(caps, 255).freeze()).unwrap();
        assert_eq!(greeting.protocol_version, 10);
        assert_eq!(greeting.server_version, "8.0.36");
        assert_eq!(greeting.connection_id, 42);
        assert_eq!(&greeting.auth_plugin_data[..], &fixture::SCRAMBLE[..]);
        assert_eq!(greeting.capabilities, caps);
        assert_eq!(greeting.collation, 255);
        assert_eq!(greeting.auth_plugin_name.as_deref(), Some("mysql_native_password"));
    }

    #[test]
    fn greeting_version() {
        let mut body = fixture::greeting(Capabilities::CLIENT_DEFAULT, 45);
        body[0] = 9;
        let err = ServerGreeting::decode(body.freeze()).unwrap_err();
        assert!(matches!(err, ProtocolError::UnsupportedVersion { version: 9 }));
    }

    #[test]
    fn greeting_truncated() {
        let body = fixture::greeting(Capabilities::CLIENT_DEFAULT, 45).freeze();
        assert!(ServerGreeting::decode(body.slice(..12)).is_err());

        // cut inside fixed size integers
        for len in [1, 9, 11, 21, 24, 27, 29, 30] {
            let err = ServerGreeting::decode(body.slice(..len)).unwrap_err();
            assert!(matches!(err, ProtocolError::Malformed { .. }), "{len}: {err}");
        }
    }

    #[test]
    fn server_error() {
        let err = ServerError::decode(fixture::err(1045, "28000", "Access denied").freeze()).unwrap();
        assert_eq!(err.code(), 1045);
        assert_eq!(err.sql_state(), Some("28000"));
        assert_eq!(err.message(), "Access denied");
        assert_eq!(err.to_string(), "ERROR 1045 (28000): Access denied");

        // errors before handshake have no sql state
        let body = Bytes::from_static(b"\xFF\x69\x04Host blocked");
        let err = ServerError::decode(body).unwrap();
        assert_eq!(err.code(), 1129);
        assert_eq!(err.sql_state(), None);
        assert_eq!(err.message(), "Host blocked");
    }

    #[test]
    fn auth_result() {
        assert!(matches!(AuthResult::decode(fixture::ok().freeze()).unwrap(), AuthResult::Ok(_)));
        assert!(matches!(
            AuthResult::decode(fixture::err(1045, "28000", "denied").freeze()).unwrap(),
            AuthResult::Err(_)
        ));

        let switch = Bytes::from_static(b"\xFEcaching_sha2_password\0salt");
        let AuthResult::Switch { plugin, data } = AuthResult::decode(switch).unwrap() else {
            panic!("expected auth switch")
        };
        assert_eq!(plugin, "caching_sha2_password");
        assert_eq!(&data[..], b"salt");

        let err = AuthResult::decode(Bytes::from_static(&[0x0A])).unwrap_err();
        assert_eq!(err.to_string(), "expected packet `OK` found `HandshakeV10`");
    }

    #[test]
    fn column_definition() {
        let mut buf = bytes::BytesMut::new();
        for s in ["def", "app", "t", "t", "price", "price"] {
            buf.put_lenenc_bytes(s.as_bytes());
        }
        buf.put_u8(0x0C);
        buf.put_u16_le(63);
        buf.put_u32_le(12);
        buf.put_u8(types::FLOAT);
        buf.put_u16_le(0x20);
        buf.put_u8(31);
        buf.put_u16_le(0);

        let column = ColumnDefinition::decode(buf.freeze()).unwrap();
        assert_eq!(column.name, "price");
        let field = column.field_info();
        assert_eq!(field.ty(), types::FLOAT);
        assert_eq!(field.size(), 12);
        assert!(field.is_unsigned());
        assert!(field.is_binary());
        assert_eq!(field.decimals(), 31);
    }

    #[test]
    fn column_definition_truncated() {
        let mut buf = bytes::BytesMut::new();
        for s in ["def", "app", "t", "t", "price", "price"] {
            buf.put_lenenc_bytes(s.as_bytes());
        }
        buf.put_u8(0x0C);
        buf.put_u16_le(63);
        buf.put_u32_le(12);
        let body = buf.freeze();

        for len in [2, body.len() - 5, body.len() - 1, body.len()] {
            let err = ColumnDefinition::decode(body.slice(..len)).unwrap_err();
            assert!(matches!(err, ProtocolError::Malformed { .. }), "{len}: {err}");
        }
    }
}
