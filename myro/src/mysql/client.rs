//! MySQL Client Messages
//!
//! <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_connection_phase_packets.html>
use bytes::{BufMut, Bytes, BytesMut};

use super::{
    Capabilities, CollationId, MAX_PACKET_SIZE, MAX_PAYLOAD_SIZE, PreconditionViolation,
    ProtocolError,
};
use crate::{
    common::{span, verbose},
    ext::{BufMutExt, StrExt, UsizeExt, lenenc_int_len},
    parameter::Parameter,
};

/// Packet envelope, 3 bytes payload length and 1 byte sequence id.
pub const HEADER_SIZE: usize = 3 + 1;

/// Write a client message with its envelope to `buf`.
///
/// If the message writes different amount of bytes than its
/// [`size_hint`][ClientMessage::size_hint], the partially written packet is
/// removed from `buf` and [`ProtocolError::FrameSizeMismatch`] is returned,
/// so a corrupted packet is never flushed.
pub fn write<C: ClientMessage>(msg: C, sequence_id: u8, buf: &mut BytesMut) -> Result<(), ProtocolError> {
    span!("write", sequence_id);
    let size_hint = msg.size_hint();

    // a payload of exactly `MAX_PAYLOAD_SIZE` must be followed by an empty
    // packet, splitting is not supported
    if size_hint >= MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::FrameTooLarge { size: size_hint });
    }

    buf.reserve(HEADER_SIZE + size_hint as usize);

    let offset = buf.len();
    buf.put_u24_le(size_hint);
    buf.put_u8(sequence_id);

    msg.encode(&mut *buf);

    let written = buf.len() - offset - HEADER_SIZE;
    if written != size_hint as usize {
        buf.truncate(offset);
        return Err(ProtocolError::FrameSizeMismatch { declared: size_hint, written });
    }

    verbose!(sequence_id, size = size_hint, "client message written");

    Ok(())
}

/// A type which can be encoded into MySQL client message.
pub trait ClientMessage {
    /// Size of the payload.
    ///
    /// Note that this is **only** the size of payload, excluding the packet
    /// envelope.
    fn size_hint(&self) -> u32;

    /// Write the payload of the message.
    ///
    /// The length of payload written must be equal to the
    /// length returned by [`size_hint`][ClientMessage::size_hint].
    fn encode(self, buf: impl BufMut);
}

/// Reserved zero bytes after the collation in the handshake response.
const FILLER_SIZE: usize = 23;

/// Shared prefix of [`SslRequest`] and [`HandshakeResponse41`].
const PREFIX_SIZE: u32 = 4 + 4 + 1 + FILLER_SIZE as u32;

fn put_prefix(buf: &mut impl BufMut, capabilities: Capabilities, collation: CollationId) {
    buf.put_u32_le(capabilities.bits());
    buf.put_u32_le(MAX_PACKET_SIZE);
    // only the low 8 bits are transmitted
    buf.put_u8(collation as u8);
    buf.put_bytes(0, FILLER_SIZE);
}

fn check_collation(collation: CollationId) -> Result<(), PreconditionViolation> {
    match collation {
        0 => Err(PreconditionViolation::new("collation id must be a positive integer")),
        _ => Ok(()),
    }
}

/// Request the server to switch the connection to SSL.
///
/// Sent instead of [`HandshakeResponse41`] when both sides have
/// [`Capabilities::SSL`], the payload is byte identical to the first
/// 32 bytes of the later [`HandshakeResponse41`].
///
/// <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_connection_phase_packets_protocol_ssl_request.html>
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SslRequest {
    capabilities: Capabilities,
    collation: CollationId,
}

impl SslRequest {
    /// Payload size, always 32 bytes.
    pub const SIZE: u32 = PREFIX_SIZE;

    /// Create new request.
    ///
    /// Returns [`PreconditionViolation`] if `capabilities` does not contain
    /// [`Capabilities::SSL`] or `collation` is zero.
    pub fn new(capabilities: Capabilities, collation: CollationId) -> Result<Self, PreconditionViolation> {
        if !capabilities.contains(Capabilities::SSL) {
            return Err(PreconditionViolation::new("client capabilities must enable SSL"));
        }
        check_collation(collation)?;
        Ok(Self { capabilities, collation })
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn collation(&self) -> CollationId {
        self.collation
    }
}

impl ClientMessage for SslRequest {
    fn size_hint(&self) -> u32 {
        Self::SIZE
    }

    fn encode(self, mut buf: impl BufMut) {
        put_prefix(&mut buf, self.capabilities, self.collation);
    }
}

/// Handshake response for protocol 41.
///
/// <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_connection_phase_packets_protocol_handshake_response.html>
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct HandshakeResponse41<'a> {
    capabilities: Capabilities,
    collation: CollationId,
    /// The database user name to connect as.
    user: &'a str,
    /// Opaque authentication response data generated by the auth plugin.
    auth_response: &'a [u8],
    /// Initial database, sent when [`Capabilities::CONNECT_WITH_DB`] is set.
    database: Option<&'a str>,
    /// Auth plugin used for `auth_response`, sent when [`Capabilities::PLUGIN_AUTH`] is set.
    auth_plugin: Option<&'a str>,
    /// Connection attributes, sent when [`Capabilities::CONNECT_ATTRS`] is set.
    attributes: &'a [(&'a str, &'a str)],
}

impl<'a> HandshakeResponse41<'a> {
    /// Create new handshake response.
    ///
    /// Returns [`PreconditionViolation`] if `capabilities` does not contain
    /// [`Capabilities::PROTOCOL_41`], `collation` is zero, or `auth_response`
    /// is longer than 255 bytes without
    /// [`Capabilities::PLUGIN_AUTH_LENENC_CLIENT_DATA`].
    pub fn new(
        capabilities: Capabilities,
        collation: CollationId,
        user: &'a str,
        auth_response: &'a [u8],
    ) -> Result<Self, PreconditionViolation> {
        if !capabilities.contains(Capabilities::PROTOCOL_41) {
            return Err(PreconditionViolation::new("client capabilities must enable PROTOCOL_41"));
        }
        check_collation(collation)?;
        if !capabilities.contains(Capabilities::PLUGIN_AUTH_LENENC_CLIENT_DATA)
            && auth_response.len() > u8::MAX as usize
        {
            return Err(PreconditionViolation::new("auth response too long without length-encoded client data"));
        }
        Ok(Self {
            capabilities,
            collation,
            user,
            auth_response,
            database: None,
            auth_plugin: None,
            attributes: &[],
        })
    }

    /// Set the initial database.
    pub fn database(mut self, database: &'a str) -> Self {
        self.database = Some(database);
        self
    }

    /// Set the auth plugin name.
    pub fn auth_plugin(mut self, auth_plugin: &'a str) -> Self {
        self.auth_plugin = Some(auth_plugin);
        self
    }

    /// Set connection attributes.
    pub fn attributes(mut self, attributes: &'a [(&'a str, &'a str)]) -> Self {
        self.attributes = attributes;
        self
    }

    fn has(&self, capability: Capabilities) -> bool {
        self.capabilities.contains(capability)
    }

    fn attributes_len(&self) -> u32 {
        self.attributes
            .iter()
            .map(|(k, v)| k.lenenc_string_len() + v.lenenc_string_len())
            .sum()
    }
}

impl ClientMessage for HandshakeResponse41<'_> {
    fn size_hint(&self) -> u32 {
        let auth_len = self.auth_response.len().to_u32();
        let auth = if self.has(Capabilities::PLUGIN_AUTH_LENENC_CLIENT_DATA) {
            lenenc_int_len(auth_len.into()) + auth_len
        } else if self.has(Capabilities::SECURE_CONNECTION) {
            1 + auth_len
        } else {
            auth_len + 1/* nul */
        };

        let mut size = PREFIX_SIZE + self.user.nul_string_len() + auth;

        if self.has(Capabilities::CONNECT_WITH_DB) {
            size += self.database.unwrap_or_default().nul_string_len();
        }
        if self.has(Capabilities::PLUGIN_AUTH) {
            size += self.auth_plugin.unwrap_or_default().nul_string_len();
        }
        if self.has(Capabilities::CONNECT_ATTRS) {
            let attrs = self.attributes_len();
            size += lenenc_int_len(attrs.into()) + attrs;
        }
        size
    }

    fn encode(self, mut buf: impl BufMut) {
        put_prefix(&mut buf, self.capabilities, self.collation);

        buf.put_nul_string(self.user);

        if self.has(Capabilities::PLUGIN_AUTH_LENENC_CLIENT_DATA) {
            buf.put_lenenc_bytes(self.auth_response);
        } else if self.has(Capabilities::SECURE_CONNECTION) {
            buf.put_u8(self.auth_response.len() as u8);
            buf.put_slice(self.auth_response);
        } else {
            buf.put_slice(self.auth_response);
            buf.put_u8(b'\0');
        }

        if self.has(Capabilities::CONNECT_WITH_DB) {
            buf.put_nul_string(self.database.unwrap_or_default());
        }
        if self.has(Capabilities::PLUGIN_AUTH) {
            buf.put_nul_string(self.auth_plugin.unwrap_or_default());
        }
        if self.has(Capabilities::CONNECT_ATTRS) {
            buf.put_lenenc_int(self.attributes_len().into());
            for (key, value) in self.attributes {
                buf.put_lenenc_bytes(key.as_bytes());
                buf.put_lenenc_bytes(value.as_bytes());
            }
        }
    }
}

/// Execute a prepared statement with bound parameters.
///
/// `values` are the binary forms produced by
/// [`Parameter::publish_binary`], in the same order as `params`.
///
/// <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_com_stmt_execute.html>
#[derive(Debug)]
pub struct StmtExecute<'a> {
    statement_id: u32,
    params: &'a [Parameter],
    values: &'a [Bytes],
}

impl<'a> StmtExecute<'a> {
    const COMMAND: u8 = 0x17;
    const CURSOR_TYPE_NO_CURSOR: u8 = 0;
    const UNSIGNED_FLAG: u8 = 0x80;

    /// Create new execute command.
    ///
    /// Returns [`PreconditionViolation`] if `params` and `values` length differ.
    pub fn new(statement_id: u32, params: &'a [Parameter], values: &'a [Bytes]) -> Result<Self, PreconditionViolation> {
        if params.len() != values.len() {
            return Err(PreconditionViolation::new("every parameter requires its produced value"));
        }
        if params.len() > u16::MAX as usize {
            return Err(PreconditionViolation::new("too many parameters"));
        }
        Ok(Self { statement_id, params, values })
    }

    fn null_bitmap_len(&self) -> usize {
        self.params.len().div_ceil(8)
    }
}

impl ClientMessage for StmtExecute<'_> {
    fn size_hint(&self) -> u32 {
        // command, statement id, flags, iteration count
        let mut size = 1 + 4 + 1 + 4;
        if !self.params.is_empty() {
            // null bitmap, new params bound flag, type and flag per parameter
            size += self.null_bitmap_len().to_u32() + 1 + 2 * self.params.len().to_u32();
            size += self
                .params
                .iter()
                .zip(self.values)
                .filter(|(param, _)| !param.is_null())
                .map(|(_, value)| value.len().to_u32())
                .sum::<u32>();
        }
        size
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_u8(Self::COMMAND);
        buf.put_u32_le(self.statement_id);
        buf.put_u8(Self::CURSOR_TYPE_NO_CURSOR);
        // iteration count, always 1
        buf.put_u32_le(1);

        if self.params.is_empty() {
            return;
        }

        let mut bitmap = vec![0u8; self.null_bitmap_len()];
        for (i, param) in self.params.iter().enumerate() {
            if param.is_null() {
                bitmap[i / 8] |= 1 << (i % 8);
            }
        }
        buf.put_slice(&bitmap);

        // new params bound
        buf.put_u8(1);
        for param in self.params {
            buf.put_u8(param.type_code());
            buf.put_u8(if param.is_unsigned() { Self::UNSIGNED_FLAG } else { 0 });
        }

        for (param, value) in self.params.iter().zip(self.values) {
            if !param.is_null() {
                buf.put_slice(value);
            }
        }
    }
}

/// Check if the server is alive.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Ping;

impl ClientMessage for Ping {
    fn size_hint(&self) -> u32 { 1 }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_u8(0x0E);
    }
}

/// Tell the server to close the connection.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Quit;

impl ClientMessage for Quit {
    fn size_hint(&self) -> u32 { 1 }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_u8(0x01);
    }
}

#[cfg(test)]
mod test {
    use std::hash::{BuildHasher, RandomState};

    use super::*;
    use crate::{codec::Codecs, value::Value};

    fn payload<C: ClientMessage>(msg: C) -> BytesMut {
        let mut buf = BytesMut::new();
        write(msg, 1, &mut buf).unwrap();
        buf.split_off(HEADER_SIZE)
    }

    #[test]
    fn ssl_request_layout() {
        let caps = Capabilities::PROTOCOL_41 | Capabilities::SSL;
        let msg = SslRequest::new(caps, 5).unwrap();
        assert_eq!(msg.size_hint(), 32);

        let mut buf = BytesMut::new();
        write(msg, 1, &mut buf).unwrap();

        assert_eq!(&buf[..HEADER_SIZE], &[32, 0, 0, 1]);
        let payload = &buf[HEADER_SIZE..];
        assert_eq!(payload.len(), 32);
        assert_eq!(&payload[..4], &caps.bits().to_le_bytes());
        assert_eq!(&payload[4..8], &16_777_216u32.to_le_bytes());
        assert_eq!(payload[8], 0x05);
        assert!(payload[9..].iter().all(|b| *b == 0));
    }

    #[test]
    fn ssl_request_size_is_constant() {
        for (caps, collation) in [(0x800, 1), (u32::MAX, 255), (0xA00, 0xFFFF)] {
            let msg = SslRequest::new(Capabilities::from_bits(caps), collation).unwrap();
            assert_eq!(msg.size_hint(), 32);
            assert_eq!(payload(msg).len(), 32);
        }
    }

    #[test]
    fn ssl_request_truncates_collation() {
        let msg = SslRequest::new(Capabilities::SSL, 0x01FF).unwrap();
        assert_eq!(payload(msg)[8], 0xFF);
    }

    #[test]
    fn ssl_request_preconditions() {
        assert!(SslRequest::new(Capabilities::PROTOCOL_41, 45).is_err());
        assert!(SslRequest::new(Capabilities::empty(), 45).is_err());
        assert!(SslRequest::new(Capabilities::SSL, 0).is_err());
        assert!(SslRequest::new(Capabilities::SSL, 45).is_ok());
    }

    #[test]
    fn ssl_request_equality() {
        let hasher = RandomState::new();
        let a = SslRequest::new(Capabilities::SSL, 45).unwrap();
        let b = SslRequest::new(Capabilities::SSL, 45).unwrap();
        assert_eq!(a, b);
        assert_eq!(hasher.hash_one(&a), hasher.hash_one(&b));
        assert_ne!(a, SslRequest::new(Capabilities::SSL, 46).unwrap());
    }

    #[test]
    fn handshake_response_prefix_matches_ssl_request() {
        let caps = Capabilities::CLIENT_DEFAULT | Capabilities::SSL | Capabilities::CONNECT_WITH_DB;
        let ssl = payload(SslRequest::new(caps, 45).unwrap());
        let response = HandshakeResponse41::new(caps, 45, "root", b"secret")
            .unwrap()
            .database("app")
            .auth_plugin("mysql_clear_password");
        let response = payload(response);

        assert_eq!(&response[..32], &ssl[..]);

        let mut rest = &response[32..];
        assert_eq!(&rest[..5], b"root\0");
        rest = &rest[5..];
        assert_eq!(rest[0], 6);
        assert_eq!(&rest[1..7], b"secret");
        rest = &rest[7..];
        assert_eq!(&rest[..4], b"app\0");
        assert_eq!(&rest[4..], b"mysql_clear_password\0");
    }

    #[test]
    fn handshake_response_attributes() {
        let attrs = [("_client_name", "myro")];
        let caps = Capabilities::CLIENT_DEFAULT | Capabilities::CONNECT_ATTRS;
        let msg = HandshakeResponse41::new(caps, 45, "u", b"")
            .unwrap()
            .attributes(&attrs);
        let size = msg.size_hint();
        let buf = payload(msg);
        assert_eq!(buf.len() as u32, size);
        assert!(buf.ends_with(b"\x12\x0c_client_name\x04myro"));
    }

    #[test]
    fn handshake_response_preconditions() {
        assert!(HandshakeResponse41::new(Capabilities::SSL, 45, "u", b"").is_err());
        assert!(HandshakeResponse41::new(Capabilities::PROTOCOL_41, 0, "u", b"").is_err());

        let long = [0u8; 300];
        let caps = Capabilities::PROTOCOL_41 | Capabilities::SECURE_CONNECTION;
        assert!(HandshakeResponse41::new(caps, 45, "u", &long).is_err());
        let caps = caps | Capabilities::PLUGIN_AUTH_LENENC_CLIENT_DATA;
        assert!(HandshakeResponse41::new(caps, 45, "u", &long).is_ok());
    }

    struct Liar;

    impl ClientMessage for Liar {
        fn size_hint(&self) -> u32 { 4 }

        fn encode(self, mut buf: impl BufMut) {
            buf.put_u16_le(1);
        }
    }

    #[test]
    fn frame_size_mismatch_is_detected() {
        let mut buf = BytesMut::new();
        write(Ping, 0, &mut buf).unwrap();
        let before = buf.clone();

        let err = write(Liar, 1, &mut buf).unwrap_err();
        assert!(matches!(err, ProtocolError::FrameSizeMismatch { declared: 4, written: 2 }));
        // previous packet untouched, corrupted one removed
        assert_eq!(buf, before);
    }

    #[test]
    fn stmt_execute_layout() {
        let codecs = Codecs::default();
        let ctx = Default::default();
        let params = [
            codecs.encode(Value::F32(1.0), &ctx).unwrap(),
            codecs.encode(Value::Null, &ctx).unwrap(),
            codecs.encode(Value::U64(7), &ctx).unwrap(),
        ];
        let values = [
            Bytes::from_static(&[0x00, 0x00, 0x80, 0x3F]),
            Bytes::new(),
            Bytes::from_static(&[7, 0, 0, 0, 0, 0, 0, 0]),
        ];
        let msg = StmtExecute::new(9, &params, &values).unwrap();
        let size = msg.size_hint();
        let buf = payload(msg);
        assert_eq!(buf.len() as u32, size);

        assert_eq!(buf[0], 0x17);
        assert_eq!(&buf[1..5], &9u32.to_le_bytes());
        assert_eq!(buf[5], 0);
        assert_eq!(&buf[6..10], &1u32.to_le_bytes());
        // null bitmap, second parameter
        assert_eq!(buf[10], 0b010);
        assert_eq!(buf[11], 1);
        assert_eq!(&buf[12..18], &[4, 0, 6, 0, 8, 0x80]);
        assert_eq!(&buf[18..22], &[0x00, 0x00, 0x80, 0x3F]);
        assert_eq!(&buf[22..], &[7, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn stmt_execute_requires_all_values() {
        let params = [Codecs::default().encode(Value::I32(1), &Default::default()).unwrap()];
        assert!(StmtExecute::new(1, &params, &[]).is_err());
    }

    #[test]
    fn commands() {
        assert_eq!(&payload(Ping)[..], &[0x0E]);
        assert_eq!(&payload(Quit)[..], &[0x01]);
    }
}
