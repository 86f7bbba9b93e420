//! The [`Transport`] trait.
use bytes::Bytes;
use std::{
    io,
    marker::PhantomData,
    pin::Pin,
    task::{Context, Poll, ready},
};

use crate::{
    Result,
    mysql::{
        ClientMessage, ServerError, ServerMessage,
        server::is_err_packet,
    },
};

/// A buffered stream which can send and receive MySQL packets.
pub trait Transport: Unpin {
    /// Poll to flush buffered messages to the underlying io.
    fn poll_flush(&mut self, cx: &mut Context) -> Poll<io::Result<()>>;

    /// Poll to receive a single packet payload.
    ///
    /// Implementor must check and advance the sequence id.
    fn poll_recv_packet(&mut self, cx: &mut Context) -> Poll<Result<Bytes>>;

    /// Poll to shutdown the underlying io.
    fn poll_shutdown(&mut self, cx: &mut Context) -> Poll<io::Result<()>>;

    /// Send message with the next sequence id.
    ///
    /// Note that this send is buffered, caller must also call
    /// [`poll_flush`][1] or [`flush`][2] afterwards.
    ///
    /// [1]: Transport::poll_flush
    /// [2]: TransportExt::flush
    fn send<C: ClientMessage>(&mut self, message: C) -> Result<()>;

    /// Reset sequence id, called before starting a new command.
    fn reset_sequence(&mut self);
}

impl<P> Transport for &mut P where P: Transport {
    fn poll_flush(&mut self, cx: &mut Context) -> Poll<io::Result<()>> {
        P::poll_flush(self, cx)
    }

    fn poll_recv_packet(&mut self, cx: &mut Context) -> Poll<Result<Bytes>> {
        P::poll_recv_packet(self, cx)
    }

    fn poll_shutdown(&mut self, cx: &mut Context) -> Poll<io::Result<()>> {
        P::poll_shutdown(self, cx)
    }

    fn send<C: ClientMessage>(&mut self, message: C) -> Result<()> {
        P::send(self, message)
    }

    fn reset_sequence(&mut self) {
        P::reset_sequence(self);
    }
}

/// An extension trait to provide `Future` API for [`Transport`].
pub trait TransportExt: Transport {
    /// Flush the underlying io.
    fn flush(&mut self) -> impl Future<Output = io::Result<()>> {
        std::future::poll_fn(|cx|self.poll_flush(cx))
    }

    /// Receive a packet payload as is, ERR packet included.
    fn recv_packet(&mut self) -> impl Future<Output = Result<Bytes>> {
        std::future::poll_fn(|cx|self.poll_recv_packet(cx))
    }

    /// Receive a server message, ERR packet is returned as [`ServerError`].
    fn recv<M: ServerMessage>(&mut self) -> Recv<'_, Self, M> {
        Recv { transport: self, _p: PhantomData }
    }

    /// Shutdown the underlying io.
    fn shutdown(&mut self) -> impl Future<Output = io::Result<()>> {
        std::future::poll_fn(|cx|self.poll_shutdown(cx))
    }
}

impl<T> TransportExt for T where T: Transport { }

/// Future returned from [`TransportExt::recv`].
#[derive(Debug)]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Recv<'a, T: ?Sized, M> {
    transport: &'a mut T,
    _p: PhantomData<fn() -> M>,
}

impl<T, M> Future for Recv<'_, T, M>
where
    T: Transport + ?Sized,
    M: ServerMessage,
{
    type Output = Result<M>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let me = self.get_mut();
        let body = ready!(me.transport.poll_recv_packet(cx))?;
        if is_err_packet(&body) {
            return Poll::Ready(Err(ServerError::decode(body)?.into()));
        }
        Poll::Ready(Ok(M::decode(body)?))
    }
}
