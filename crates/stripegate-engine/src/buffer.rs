//! Pooled read buffers.
//!
//! A [`ReadBuffer`] is the chunk a backend read delivers: contiguous bytes
//! plus the pool lease that accounts for them. The value is affine: the
//! action may slice it in place (drop leading bytes, cut the tail) and then
//! must either release it into the transport or drop it, either of which
//! returns the lease exactly once.

use bytes::{Buf, Bytes};

use crate::pool::PoolLease;

/// A contiguous chunk of object data delivered by a backend read.
#[derive(Debug)]
pub struct ReadBuffer {
    data: Bytes,
    lease: PoolLease,
}

impl ReadBuffer {
    /// Wrap freshly read bytes with the lease that accounts for them.
    #[must_use]
    pub fn new(data: Bytes, lease: PoolLease) -> Self {
        Self { data, lease }
    }

    /// Bytes currently in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Discard the first `n` bytes. Discarding more than the buffer holds
    /// empties it.
    pub fn drain_front(&mut self, n: usize) {
        self.data.advance(n.min(self.data.len()));
    }

    /// Keep only the first `n` bytes.
    pub fn trim_to(&mut self, n: usize) {
        self.data.truncate(n);
    }

    /// Give up ownership: the bytes and the lease move to the caller (the
    /// transport), which returns the lease once the bytes are written out.
    #[must_use]
    pub fn release(self) -> (Bytes, PoolLease) {
        (self.data, self.lease)
    }
}

#[cfg(test)]
mod tests {
    use crate::pool::MemoryPool;

    use super::*;

    fn buffer_of(pool_capacity: u64, data: &'static [u8]) -> (std::sync::Arc<MemoryPool>, ReadBuffer) {
        let pool = MemoryPool::new(pool_capacity);
        let lease = pool.reserve(data.len() as u64);
        (pool.clone(), ReadBuffer::new(Bytes::from_static(data), lease))
    }

    #[test]
    fn test_should_drain_leading_bytes() {
        let (_pool, mut buf) = buffer_of(1024, b"hello world");
        buf.drain_front(6);
        assert_eq!(buf.len(), 5);
        let (data, _lease) = buf.release();
        assert_eq!(data.as_ref(), b"world");
    }

    #[test]
    fn test_should_trim_tail() {
        let (_pool, mut buf) = buffer_of(1024, b"hello world");
        buf.trim_to(5);
        let (data, _lease) = buf.release();
        assert_eq!(data.as_ref(), b"hello");
    }

    #[test]
    fn test_should_empty_when_draining_past_end() {
        let (_pool, mut buf) = buffer_of(1024, b"abc");
        buf.drain_front(10);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_should_return_lease_on_drop() {
        let (pool, buf) = buffer_of(1024, b"abc");
        assert_eq!(pool.in_use(), 3);
        drop(buf);
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn test_should_keep_lease_alive_through_release() {
        let (pool, buf) = buffer_of(1024, b"abc");
        let (data, lease) = buf.release();
        assert_eq!(data.as_ref(), b"abc");
        // Still accounted while the transport holds the lease.
        assert_eq!(pool.in_use(), 3);
        drop(lease);
        assert_eq!(pool.in_use(), 0);
    }
}
