//! Socket and transport upgrade.
use std::io;

#[cfg(feature = "tokio")]
use tokio::io::{AsyncRead, AsyncWrite};

/// Either tcp, unix socket, or any other io such as a secured stream.
///
/// Implement `AsyncRead` and `AsyncWrite` transparently.
///
/// Requires `tokio` feature, otherwise panic at runtime.
pub struct Socket {
    kind: Kind,
}

enum Kind {
    #[cfg(feature = "tokio")]
    Tcp(tokio::net::TcpStream),
    #[cfg(all(feature = "tokio", unix))]
    Unix(tokio::net::UnixStream),
    #[cfg(feature = "tokio")]
    Boxed(Box<dyn AsyncIo>),
    /// Moved out during upgrade.
    Closed,
}

/// Any io that can carry the protocol.
#[cfg(feature = "tokio")]
pub trait AsyncIo: AsyncRead + AsyncWrite + Unpin + Send + 'static { }

#[cfg(feature = "tokio")]
impl<T> AsyncIo for T where T: AsyncRead + AsyncWrite + Unpin + Send + 'static { }

impl Socket {
    pub async fn connect_tcp(host: &str, port: u16) -> io::Result<Socket> {
        #[cfg(feature = "tokio")]
        {
            let socket = tokio::net::TcpStream::connect((host, port)).await?;
            socket.set_nodelay(true)?;
            Ok(Socket { kind: Kind::Tcp(socket) })
        }

        #[cfg(not(feature = "tokio"))]
        {
            let _ = (host, port);
            panic!("runtime disabled")
        }
    }

    pub async fn connect_socket(path: &str) -> io::Result<Socket> {
        #[cfg(all(feature = "tokio", unix))]
        {
            let socket = tokio::net::UnixStream::connect(path).await?;
            Ok(Socket { kind: Kind::Unix(socket) })
        }

        #[cfg(not(all(feature = "tokio", unix)))]
        {
            let _ = path;
            panic!("runtime disabled")
        }
    }

    /// Wrap any io, for example a TLS stream over a previous [`Socket`].
    #[cfg(feature = "tokio")]
    pub fn new(io: impl AsyncIo) -> Socket {
        Socket { kind: Kind::Boxed(Box::new(io)) }
    }

    /// Take the socket, leaving a closed one behind.
    pub(crate) fn take(&mut self) -> Socket {
        std::mem::replace(self, Socket { kind: Kind::Closed })
    }
}

/// Secure a [`Socket`] in place of the original one.
///
/// Used after the server accepted an `SslRequest`, the returned socket
/// carries the rest of the connection.
pub trait Upgrade {
    /// Upgrade `socket`, `host` is the server name to verify against.
    fn upgrade(&self, socket: Socket, host: &str) -> impl Future<Output = io::Result<Socket>>;
}

/// Upgrade that is never constructed, used when SSL is not configured.
///
/// ```no_run
/// # use myro::{Config, Connection, handshake::ClearPassword, net::{NoUpgrade, Socket}, stream::MyStream};
/// # async fn app(socket: Socket, config: Config) -> myro::Result<()> {
/// let _conn = Connection::handshake(MyStream::new(socket), &config, None::<&NoUpgrade>, &ClearPassword).await?;
/// # Ok(())
/// # }
/// ```
pub enum NoUpgrade { }

impl Upgrade for NoUpgrade {
    async fn upgrade(&self, _: Socket, _: &str) -> io::Result<Socket> {
        match *self { }
    }
}

#[cfg(feature = "tokio")]
fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "socket closed during upgrade")
}

#[cfg(feature = "tokio")]
impl AsyncRead for Socket {
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        use std::{pin::Pin, task::Poll};
        match &mut self.kind {
            Kind::Tcp(t) => Pin::new(t).poll_read(cx, buf),
            #[cfg(unix)]
            Kind::Unix(u) => Pin::new(u).poll_read(cx, buf),
            Kind::Boxed(b) => Pin::new(b).poll_read(cx, buf),
            Kind::Closed => Poll::Ready(Err(closed())),
        }
    }
}

#[cfg(feature = "tokio")]
impl AsyncWrite for Socket {
    fn poll_write(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<io::Result<usize>> {
        use std::{pin::Pin, task::Poll};
        match &mut self.kind {
            Kind::Tcp(t) => Pin::new(t).poll_write(cx, buf),
            #[cfg(unix)]
            Kind::Unix(u) => Pin::new(u).poll_write(cx, buf),
            Kind::Boxed(b) => Pin::new(b).poll_write(cx, buf),
            Kind::Closed => Poll::Ready(Err(closed())),
        }
    }

    fn poll_flush(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        use std::{pin::Pin, task::Poll};
        match &mut self.kind {
            Kind::Tcp(t) => Pin::new(t).poll_flush(cx),
            #[cfg(unix)]
            Kind::Unix(u) => Pin::new(u).poll_flush(cx),
            Kind::Boxed(b) => Pin::new(b).poll_flush(cx),
            Kind::Closed => Poll::Ready(Err(closed())),
        }
    }

    fn poll_shutdown(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        use std::{pin::Pin, task::Poll};
        match &mut self.kind {
            Kind::Tcp(t) => Pin::new(t).poll_shutdown(cx),
            #[cfg(unix)]
            Kind::Unix(u) => Pin::new(u).poll_shutdown(cx),
            Kind::Boxed(b) => Pin::new(b).poll_shutdown(cx),
            Kind::Closed => Poll::Ready(Ok(())),
        }
    }
}

impl std::fmt::Debug for Socket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            #[cfg(feature = "tokio")]
            Kind::Tcp(ref tcp) => std::fmt::Debug::fmt(tcp, f),
            #[cfg(all(feature = "tokio", unix))]
            Kind::Unix(ref unix) => std::fmt::Debug::fmt(unix, f),
            #[cfg(feature = "tokio")]
            Kind::Boxed(_) => f.write_str("Socket(..)"),
            Kind::Closed => f.write_str("Socket(closed)"),
        }
    }
}
