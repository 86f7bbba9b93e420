//! Buffer acquisition for parameter production.
use bytes::{Bytes, BytesMut};
use std::{
    io,
    task::{Context, Poll},
};

/// Provides buffers to write binary parameter values into.
///
/// Buffer acquisition is the only point where producing a parameter may
/// suspend, an allocator backed by a bounded pool can return
/// [`Poll::Pending`] until a buffer is released.
pub trait BufAllocator {
    /// Poll for an empty buffer with at least `capacity` bytes of capacity.
    fn poll_allocate(&self, cx: &mut Context, capacity: usize) -> Poll<io::Result<BytesMut>>;

    /// Return a buffer that will not be handed to the caller.
    fn release(&self, buf: BytesMut);
}

impl<A: BufAllocator + ?Sized> BufAllocator for &A {
    fn poll_allocate(&self, cx: &mut Context, capacity: usize) -> Poll<io::Result<BytesMut>> {
        A::poll_allocate(self, cx, capacity)
    }

    fn release(&self, buf: BytesMut) {
        A::release(self, buf);
    }
}

/// Allocate every buffer from the global heap.
#[derive(Debug, Clone, Copy, Default)]
pub struct Heap;

impl BufAllocator for Heap {
    fn poll_allocate(&self, _: &mut Context, capacity: usize) -> Poll<io::Result<BytesMut>> {
        Poll::Ready(Ok(BytesMut::with_capacity(capacity)))
    }

    fn release(&self, buf: BytesMut) {
        drop(buf);
    }
}

/// An acquired buffer which is released back to its allocator when dropped.
///
/// Use [`Lease::into_bytes`] to keep the buffer.
pub struct Lease<'a, A: BufAllocator + ?Sized> {
    alloc: &'a A,
    buf: Option<BytesMut>,
}

impl<'a, A: BufAllocator + ?Sized> Lease<'a, A> {
    pub fn new(alloc: &'a A, buf: BytesMut) -> Self {
        Self { alloc, buf: Some(buf) }
    }

    pub fn capacity(&self) -> usize {
        self.buf.as_ref().map(BytesMut::capacity).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.buf.as_ref().map(BytesMut::len).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the leased buffer.
    pub fn buf_mut(&mut self) -> &mut BytesMut {
        self.buf.get_or_insert_with(BytesMut::new)
    }

    /// Take ownership of the written bytes, the buffer is not released.
    pub fn into_bytes(mut self) -> Bytes {
        self.buf.take().map(BytesMut::freeze).unwrap_or_default()
    }
}

impl<A: BufAllocator + ?Sized> Drop for Lease<'_, A> {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.alloc.release(buf);
        }
    }
}


#[cfg(test)]
mod test {
    use super::{fixture::Counting, *};

    #[test]
    fn lease_release_on_drop() {
        let alloc = Counting::default();
        let lease = Lease::new(&alloc, BytesMut::with_capacity(4));
        assert_eq!(lease.capacity(), 4);
        drop(lease);
        assert_eq!(alloc.released.get(), 1);
    }

    #[test]
    fn lease_into_bytes_keeps_buffer() {
        let alloc = Counting::default();
        let mut lease = Lease::new(&alloc, BytesMut::with_capacity(4));
        lease.buf_mut().extend_from_slice(b"abcd");
        let bytes = lease.into_bytes();
        assert_eq!(&bytes[..], b"abcd");
        assert_eq!(alloc.released.get(), 0);
    }
}
