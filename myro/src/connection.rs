//! MySQL connection.
use bytes::Bytes;
use std::{
    io,
    task::{Context, Poll},
};

use crate::{
    Error, Result,
    codec::CodecContext,
    common::verbose,
    handshake::{AuthPlugin, ClearPassword, Handshake, Session},
    mysql::{
        ClientMessage, ProtocolError, ServerMessage,
        client::{Ping, Quit},
        server::{AuthResult, OkPacket, ServerGreeting},
    },
    net::{NoUpgrade, Upgrade},
    stream::MyStream,
    transport::{Transport, TransportExt},
};

mod config;

pub use config::{Config, ParseError, SslMode};

/// A single connection to MySQL, ready to run commands.
#[derive(Debug)]
pub struct Connection {
    stream: MyStream,
    session: Session,
}

impl Connection {
    /// Connect using url.
    ///
    /// SSL is never used, see [`connect_with_upgrade`][Connection::connect_with_upgrade].
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with(Config::parse(url)?).await
    }

    /// Connect using config from environment variable, see [`Config::from_env`].
    pub async fn connect_env() -> Result<Self> {
        Self::connect_with(Config::from_env()).await
    }

    /// Connect without SSL.
    ///
    /// [`SslMode::Preferred`] is treated as disabled, [`SslMode::Required`]
    /// returns error. A non empty password is refused, [`ClearPassword`]
    /// never sends it over an insecure connection.
    pub async fn connect_with(config: Config) -> Result<Self> {
        let stream = MyStream::connect(&config).await?;
        Self::handshake(stream, &config, None::<&NoUpgrade>, &ClearPassword).await
    }

    /// Connect and secure the connection with `upgrade` when negotiated.
    pub async fn connect_with_upgrade<U: Upgrade + ?Sized>(config: Config, upgrade: &U) -> Result<Self> {
        let stream = MyStream::connect(&config).await?;
        Self::handshake(stream, &config, Some(upgrade), &ClearPassword).await
    }

    /// Perform the connection phase over an established stream.
    pub async fn handshake<U: Upgrade + ?Sized>(
        mut stream: MyStream,
        config: &Config,
        upgrade: Option<&U>,
        plugin: &dyn AuthPlugin,
    ) -> Result<Self> {
        let ssl_mode = match (config.ssl_mode(), upgrade) {
            (SslMode::Required, None) => {
                return Err(Error::from(ProtocolError::TlsUnavailable).context("no ssl upgrade configured"))
            },
            (SslMode::Preferred, None) => SslMode::Disabled,
            (mode, _) => mode,
        };

        let mut handshake = Handshake::new(ssl_mode).connect_with_db(config.dbname().is_some());
        if let Some(collation) = config.collation() {
            handshake = handshake.collation(collation);
        }

        stream.reset_sequence();
        let greeting = stream.recv::<ServerGreeting>().await?;
        handshake.on_greeting(greeting)?;

        match (handshake.ssl_request()?, upgrade) {
            (Some(request), Some(upgrade)) => {
                stream.send(request)?;
                stream.upgrade(upgrade, config.host()).await?;
                handshake.upgraded()?;
            },
            (Some(_), None) => Err(ProtocolError::TlsUnavailable)?,
            (None, _) => { },
        }

        let response = handshake.response(config.user(), config.password(), config.dbname(), plugin)?;
        stream.send(response)?;

        // ERR is part of the auth result, do not let `recv` intercept it
        let body = stream.recv_packet().await?;
        let session = handshake.on_auth_result(AuthResult::decode(body)?)?;

        verbose!(
            connection_id = session.connection_id(),
            secure = session.is_secure(),
            "connected"
        );

        Ok(Self { stream, session })
    }

    /// Parameters negotiated in the handshake.
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn codec_context(&self) -> CodecContext {
        self.session.codec_context()
    }

    /// Check if the server is alive.
    pub async fn ping(&mut self) -> Result<()> {
        self.stream.reset_sequence();
        self.stream.send(Ping)?;
        self.stream.flush().await?;
        self.stream.recv::<OkPacket>().await?;
        Ok(())
    }

    /// Gracefully close the connection.
    pub async fn close(mut self) -> Result<()> {
        self.stream.reset_sequence();
        self.stream.send(Quit)?;
        self.stream.flush().await?;
        self.stream.shutdown().await?;
        Ok(())
    }
}

impl Transport for Connection {
    fn poll_flush(&mut self, cx: &mut Context) -> Poll<io::Result<()>> {
        self.stream.poll_flush(cx)
    }

    fn poll_recv_packet(&mut self, cx: &mut Context) -> Poll<Result<Bytes>> {
        self.stream.poll_recv_packet(cx)
    }

    fn poll_shutdown(&mut self, cx: &mut Context) -> Poll<io::Result<()>> {
        self.stream.poll_shutdown(cx)
    }

    fn send<C: ClientMessage>(&mut self, message: C) -> Result<()> {
        self.stream.send(message)
    }

    fn reset_sequence(&mut self) {
        self.stream.reset_sequence();
    }
}
