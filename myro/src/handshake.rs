//! Connection phase state machine.
//!
//! [`Handshake`] performs no io, it only validates server packets and
//! produces client messages in the right order. The caller owns the
//! transport, see [`Connection`][crate::Connection] for a driver.
//!
//! ```text
//! AwaitingGreeting ── on_greeting ──> Negotiating ── response ──> Authenticating ── on_auth_result ──> Completed
//!                                       │      ^
//!                           ssl_request │      │ upgraded
//!                                       v      │
//!                                     SecureUpgrade
//! ```
//!
//! Any error moves the machine to [`HandshakeState::Failed`], which rejects
//! every further call.
//!
//! <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_connection_phase.html>
use std::fmt;

use crate::{
    Result,
    codec::CodecContext,
    common::{ByteStr, verbose},
    mysql::{
        Capabilities, CollationId, PreconditionViolation, ProtocolError,
        client::{HandshakeResponse41, SslRequest},
        server::{AuthResult, ServerGreeting},
    },
};

/// Whether to upgrade the connection to SSL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SslMode {
    /// Never upgrade.
    Disabled,
    /// Upgrade when the server supports it.
    #[default]
    Preferred,
    /// Upgrade, fails when the server does not support it.
    Required,
}

/// Current step of [`Handshake`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    AwaitingGreeting,
    Negotiating,
    SecureUpgrade,
    Authenticating,
    Completed,
    Failed,
}

impl HandshakeState {
    fn name(self) -> &'static str {
        match self {
            HandshakeState::AwaitingGreeting => "awaiting greeting",
            HandshakeState::Negotiating => "negotiating",
            HandshakeState::SecureUpgrade => "secure upgrade",
            HandshakeState::Authenticating => "authenticating",
            HandshakeState::Completed => "completed",
            HandshakeState::Failed => "failed",
        }
    }
}

/// Produce the auth response sent in [`HandshakeResponse41`].
pub trait AuthPlugin {
    /// Plugin name announced to the server.
    fn name(&self) -> &'static str;

    /// Create the auth response from the password and the server scramble.
    fn auth_response(&self, password: &str, scramble: &[u8]) -> Vec<u8>;

    /// Returns `true` if the auth response reveals the password, the
    /// handshake then refuses to send it over an insecure transport.
    fn requires_secure(&self) -> bool {
        false
    }
}

/// `mysql_clear_password`, the password is sent as is.
///
/// Refused over an insecure transport unless the password is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClearPassword;

impl AuthPlugin for ClearPassword {
    fn name(&self) -> &'static str {
        "mysql_clear_password"
    }

    fn requires_secure(&self) -> bool {
        true
    }

    fn auth_response(&self, password: &str, _: &[u8]) -> Vec<u8> {
        let mut response = Vec::with_capacity(password.len() + 1);
        response.extend_from_slice(password.as_bytes());
        response.push(b'\0');
        response
    }
}

/// Server asks for an auth method this client does not implement.
pub struct UnsupportedAuth {
    plugin: ByteStr,
}

impl UnsupportedAuth {
    /// Name of the auth plugin requested by the server.
    pub fn plugin(&self) -> &str {
        &self.plugin
    }
}

impl std::error::Error for UnsupportedAuth { }

impl fmt::Display for UnsupportedAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported auth plugin `{}`", self.plugin)
    }
}

impl fmt::Debug for UnsupportedAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// Negotiated connection parameters, fixed once the handshake completes.
#[derive(Debug, Clone)]
pub struct Session {
    capabilities: Capabilities,
    collation: CollationId,
    server_version: ByteStr,
    connection_id: u32,
    status_flags: u16,
    secure: bool,
}

impl Session {
    /// Capabilities in effect, both sides support all of them.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn collation(&self) -> CollationId {
        self.collation
    }

    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    /// Server side thread id.
    pub fn connection_id(&self) -> u32 {
        self.connection_id
    }

    /// Status flags from the final OK packet.
    pub fn status_flags(&self) -> u16 {
        self.status_flags
    }

    /// Returns `true` if the transport was upgraded to SSL.
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Create codec context for this session.
    pub fn codec_context(&self) -> CodecContext {
        CodecContext::new(self.collation, self.server_version.clone())
    }
}

/// Information retained from [`ServerGreeting`].
#[derive(Debug)]
struct Greeting {
    server_version: ByteStr,
    connection_id: u32,
    scramble: bytes::Bytes,
}

/// Connection phase state machine.
#[derive(Debug)]
pub struct Handshake {
    state: HandshakeState,
    ssl_mode: SslMode,
    desired: Capabilities,
    collation: Option<CollationId>,
    connect_with_db: bool,
    capabilities: Capabilities,
    negotiated_collation: CollationId,
    greeting: Option<Greeting>,
    secure: bool,
    auth_response: Vec<u8>,
    plugin: &'static str,
}

impl Handshake {
    /// Create new handshake requesting [`Capabilities::CLIENT_DEFAULT`].
    pub fn new(ssl_mode: SslMode) -> Handshake {
        Handshake {
            state: HandshakeState::AwaitingGreeting,
            ssl_mode,
            desired: Capabilities::CLIENT_DEFAULT,
            collation: None,
            connect_with_db: false,
            capabilities: Capabilities::empty(),
            negotiated_collation: 0,
            greeting: None,
            secure: false,
            auth_response: Vec::new(),
            plugin: "",
        }
    }

    /// Override requested capabilities.
    ///
    /// [`Capabilities::SSL`] and [`Capabilities::CONNECT_WITH_DB`] are managed
    /// by the handshake and ignored here.
    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.desired = capabilities;
        self
    }

    /// Request a connection collation, defaults to the server collation.
    pub fn collation(mut self, collation: CollationId) -> Self {
        self.collation = Some(collation);
        self
    }

    /// Select an initial database in the handshake response.
    pub fn connect_with_db(mut self, enabled: bool) -> Self {
        self.connect_with_db = enabled;
        self
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Negotiated capabilities, empty before the greeting.
    pub fn negotiated(&self) -> Capabilities {
        self.capabilities
    }

    /// Returns `true` if an [`SslRequest`] must be sent.
    pub fn is_ssl(&self) -> bool {
        self.capabilities.contains(Capabilities::SSL)
    }

    /// Validate the server greeting and negotiate capabilities.
    pub fn on_greeting(&mut self, greeting: ServerGreeting) -> Result<()> {
        self.expect(HandshakeState::AwaitingGreeting, "receive greeting")?;
        let result = self.negotiate(greeting);
        self.advance(result, HandshakeState::Negotiating)
    }

    fn negotiate(&mut self, greeting: ServerGreeting) -> Result<()> {
        if greeting.protocol_version != ServerGreeting::PROTOCOL_VERSION {
            Err(ProtocolError::UnsupportedVersion { version: greeting.protocol_version })?
        }

        let server = greeting.capabilities;
        if !server.contains(Capabilities::PROTOCOL_41) {
            Err(ProtocolError::MissingCapability { capability: Capabilities::PROTOCOL_41 })?
        }

        let mut desired = self.desired | Capabilities::PROTOCOL_41;
        desired.remove(Capabilities::SSL | Capabilities::CONNECT_WITH_DB);
        if self.connect_with_db {
            desired.insert(Capabilities::CONNECT_WITH_DB);
        }

        let server_ssl = server.contains(Capabilities::SSL);
        match (self.ssl_mode, server_ssl) {
            (SslMode::Disabled, _) => { }
            (SslMode::Preferred | SslMode::Required, true) => desired.insert(Capabilities::SSL),
            (SslMode::Preferred, false) => {
                #[cfg(feature = "log")]
                log::warn!("server does not support SSL, continue without it");
            },
            (SslMode::Required, false) => Err(ProtocolError::TlsUnavailable)?,
        }

        let collation = self.collation.unwrap_or(greeting.collation);
        if collation == 0 {
            Err(PreconditionViolation::new("server did not provide a collation, configure one explicitly"))?
        }

        self.capabilities = desired.intersection(server);
        self.negotiated_collation = collation;

        verbose!(
            server_version = %greeting.server_version,
            capabilities = ?self.capabilities,
            collation,
            "greeting received"
        );

        self.greeting = Some(Greeting {
            server_version: greeting.server_version,
            connection_id: greeting.connection_id,
            scramble: greeting.auth_plugin_data,
        });

        Ok(())
    }

    /// Returns the request to upgrade the connection, or `None` when SSL is
    /// not negotiated.
    ///
    /// After sending the request, secure the transport then call
    /// [`upgraded`][Handshake::upgraded].
    pub fn ssl_request(&mut self) -> Result<Option<SslRequest>> {
        self.expect(HandshakeState::Negotiating, "request ssl")?;
        if !self.is_ssl() || self.secure {
            return Ok(None);
        }
        let result = SslRequest::new(self.capabilities, self.negotiated_collation).map_err(Into::into);
        self.advance(result, HandshakeState::SecureUpgrade).map(Some)
    }

    /// Mark the transport as secured.
    pub fn upgraded(&mut self) -> Result<()> {
        self.expect(HandshakeState::SecureUpgrade, "mark upgraded")?;
        self.secure = true;
        self.state = HandshakeState::Negotiating;
        Ok(())
    }

    /// Create the handshake response.
    ///
    /// `database` is sent only when configured with
    /// [`connect_with_db`][Handshake::connect_with_db].
    pub fn response<'a>(
        &'a mut self,
        user: &'a str,
        password: &str,
        database: Option<&'a str>,
        plugin: &dyn AuthPlugin,
    ) -> Result<HandshakeResponse41<'a>> {
        self.expect(HandshakeState::Negotiating, "send handshake response")?;
        if self.is_ssl() && !self.secure {
            self.state = HandshakeState::Failed;
            Err(ProtocolError::invalid_phase("negotiating", "send handshake response before ssl upgrade"))?
        }
        if plugin.requires_secure() && !self.secure && !password.is_empty() {
            self.state = HandshakeState::Failed;
            Err(PreconditionViolation::new("auth plugin would send the password over an insecure connection"))?
        }

        let scramble = self.greeting.as_ref().map(|g| &g.scramble[..]).unwrap_or_default();
        self.auth_response = plugin.auth_response(password, scramble);
        self.plugin = plugin.name();

        let Self { state, capabilities, negotiated_collation, auth_response, .. } = self;
        let auth_response: &'a [u8] = auth_response;

        let response = match HandshakeResponse41::new(*capabilities, *negotiated_collation, user, auth_response) {
            Ok(ok) => ok.auth_plugin(plugin.name()),
            Err(err) => {
                *state = HandshakeState::Failed;
                return Err(err.into());
            },
        };

        *state = HandshakeState::Authenticating;

        Ok(match database {
            Some(database) => response.database(database),
            None => response,
        })
    }

    /// Handle the server reply to the handshake response.
    pub fn on_auth_result(&mut self, result: AuthResult) -> Result<Session> {
        self.expect(HandshakeState::Authenticating, "receive auth result")?;

        let ok = match result {
            AuthResult::Ok(ok) => ok,
            AuthResult::Err(err) => return self.advance(Err(err.into()), HandshakeState::Failed),
            AuthResult::Switch { plugin, .. } => {
                return self.advance(Err(UnsupportedAuth { plugin }.into()), HandshakeState::Failed)
            },
            // the plugin wants another round trip
            AuthResult::MoreData(_) => {
                let plugin = ByteStr::from_static(self.plugin);
                return self.advance(Err(UnsupportedAuth { plugin }.into()), HandshakeState::Failed)
            },
        };

        let Some(greeting) = self.greeting.take() else {
            return self.advance(Err(ProtocolError::invalid_phase("authenticating", "complete").into()), HandshakeState::Failed);
        };

        self.state = HandshakeState::Completed;
        verbose!(connection_id = greeting.connection_id, "handshake completed");

        Ok(Session {
            capabilities: self.capabilities,
            collation: self.negotiated_collation,
            server_version: greeting.server_version,
            connection_id: greeting.connection_id,
            status_flags: ok.status_flags,
            secure: self.secure,
        })
    }

    fn expect(&mut self, state: HandshakeState, operation: &'static str) -> Result<()> {
        if self.state == state {
            return Ok(());
        }
        let phase = self.state.name();
        self.state = HandshakeState::Failed;
        Err(ProtocolError::invalid_phase(phase, operation).into())
    }

    fn advance<T>(&mut self, result: Result<T>, next: HandshakeState) -> Result<T> {
        self.state = match result {
            Ok(_) => next,
            Err(_) => HandshakeState::Failed,
        };
        result
    }
}
