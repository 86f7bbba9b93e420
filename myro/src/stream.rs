use bytes::{Buf, Bytes, BytesMut};
use std::{
    io,
    task::{Context, Poll, ready},
};

use crate::{
    Result,
    common::verbose,
    connection::Config,
    io::{poll_flush, poll_read, poll_shutdown, poll_write_all},
    mysql::{
        ClientMessage, MAX_PAYLOAD_SIZE, ProtocolError,
        client::{self, HEADER_SIZE},
    },
    net::{Socket, Upgrade},
    transport::{Transport, TransportExt},
};

const DEFAULT_BUF_CAPACITY: usize = 1024;

/// Buffered connection to MySQL, tracking the packet sequence id.
#[derive(Debug)]
pub struct MyStream {
    socket: Socket,
    read_buf: BytesMut,
    write_buf: BytesMut,
    sequence_id: u8,
}

impl MyStream {
    /// Connect to the unix socket if configured, otherwise tcp.
    pub async fn connect(config: &Config) -> Result<Self> {
        let socket = match config.socket() {
            Some(path) => Socket::connect_socket(path).await?,
            None => Socket::connect_tcp(config.host(), config.port()).await?,
        };
        Ok(Self::new(socket))
    }

    pub fn new(socket: Socket) -> Self {
        Self {
            socket,
            read_buf: BytesMut::with_capacity(DEFAULT_BUF_CAPACITY),
            write_buf: BytesMut::with_capacity(DEFAULT_BUF_CAPACITY),
            sequence_id: 0,
        }
    }

    /// Sequence id of the next packet.
    pub fn sequence_id(&self) -> u8 {
        self.sequence_id
    }

    /// Flush pending messages then replace the socket with the upgraded one.
    ///
    /// Sequence id keeps counting across the upgrade.
    pub async fn upgrade<U: Upgrade + ?Sized>(&mut self, upgrade: &U, host: &str) -> Result<()> {
        if !self.read_buf.is_empty() {
            Err(ProtocolError::malformed("unexpected data before ssl upgrade"))?
        }

        self.flush().await?;

        let socket = self.socket.take();
        self.socket = upgrade.upgrade(socket, host).await?;

        verbose!(host, "connection upgraded");

        Ok(())
    }

    fn try_split_packet(&mut self) -> Result<Option<Bytes>> {
        let Some(mut header) = self.read_buf.get(..HEADER_SIZE) else {
            return Ok(None);
        };

        let len = header.get_uint_le(3) as usize;
        let sequence_id = header.get_u8();

        if sequence_id != self.sequence_id {
            Err(ProtocolError::SequenceMismatch { expect: self.sequence_id, found: sequence_id })?
        }

        // continuation packets are not supported
        if len >= MAX_PAYLOAD_SIZE as usize {
            Err(ProtocolError::malformed("split packet is not supported"))?
        }

        if self.read_buf.len() - HEADER_SIZE < len {
            self.read_buf.reserve(HEADER_SIZE + len - self.read_buf.len());
            return Ok(None);
        }

        self.read_buf.advance(HEADER_SIZE);
        let body = self.read_buf.split_to(len).freeze();
        self.sequence_id = sequence_id.wrapping_add(1);

        verbose!(sequence_id, len, "packet received");

        Ok(Some(body))
    }
}

impl Transport for MyStream {
    fn poll_flush(&mut self, cx: &mut Context) -> Poll<io::Result<()>> {
        ready!(poll_write_all(&mut self.socket, &mut self.write_buf, cx))?;
        poll_flush(&mut self.socket, cx)
    }

    fn poll_recv_packet(&mut self, cx: &mut Context) -> Poll<Result<Bytes>> {
        if !self.write_buf.is_empty() {
            ready!(self.poll_flush(cx))?;
        }

        loop {
            if let Some(body) = self.try_split_packet()? {
                return Poll::Ready(Ok(body));
            }

            if self.read_buf.capacity() == self.read_buf.len() {
                self.read_buf.reserve(DEFAULT_BUF_CAPACITY);
            }

            let n = ready!(poll_read(&mut self.socket, &mut self.read_buf, cx))?;
            if n == 0 {
                return Poll::Ready(Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()));
            }
        }
    }

    fn poll_shutdown(&mut self, cx: &mut Context) -> Poll<io::Result<()>> {
        poll_shutdown(&mut self.socket, cx)
    }

    fn send<C: ClientMessage>(&mut self, message: C) -> Result<()> {
        client::write(message, self.sequence_id, &mut self.write_buf)?;
        self.sequence_id = self.sequence_id.wrapping_add(1);
        Ok(())
    }

    fn reset_sequence(&mut self) {
        self.sequence_id = 0;
    }
}
