//! Process-wide response buffer pool accounting.
//!
//! The pool does not allocate; it tracks how many bytes of response buffer
//! memory are outstanding across all in-flight requests. Readers reserve a
//! [`PoolLease`] when they materialize a buffer; the lease travels with the
//! buffer into the transport and returns its bytes to the pool on drop.
//! The backpressure controller consults [`MemoryPool::has_headroom`] before
//! each backend read.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

/// Shared accounting for response buffer memory.
///
/// Reservations are advisory: a reserve never fails, and `in_use` may
/// transiently exceed `capacity`. Throttling, not refusal, is how the
/// gateway reacts to pressure.
#[derive(Debug)]
pub struct MemoryPool {
    capacity: u64,
    in_use: AtomicU64,
}

impl MemoryPool {
    /// Create a pool with the given capacity in bytes.
    #[must_use]
    pub fn new(capacity: u64) -> Arc<Self> {
        Arc::new(Self {
            capacity,
            in_use: AtomicU64::new(0),
        })
    }

    /// Reserve `bytes` from the pool, returning a lease that releases them
    /// on drop.
    #[must_use]
    pub fn reserve(self: &Arc<Self>, bytes: u64) -> PoolLease {
        self.in_use.fetch_add(bytes, Ordering::Relaxed);
        PoolLease {
            pool: Arc::clone(self),
            bytes,
        }
    }

    /// Total pool capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Bytes currently reserved.
    #[must_use]
    pub fn in_use(&self) -> u64 {
        self.in_use.load(Ordering::Relaxed)
    }

    /// Bytes still free, saturating at zero.
    #[must_use]
    pub fn free_bytes(&self) -> u64 {
        self.capacity.saturating_sub(self.in_use())
    }

    /// Fraction of capacity currently free, in `0.0..=1.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn free_fraction(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.free_bytes() as f64 / self.capacity as f64
    }

    /// Whether the free fraction is at or above `min_free_fraction`.
    #[must_use]
    pub fn has_headroom(&self, min_free_fraction: f64) -> bool {
        self.free_fraction() >= min_free_fraction
    }
}

/// A reservation of pool bytes, released on drop.
///
/// Leases are created by [`MemoryPool::reserve`] and travel with the buffer
/// they account for; exactly one drop returns the bytes.
#[derive(Debug)]
pub struct PoolLease {
    pool: Arc<MemoryPool>,
    bytes: u64,
}

impl PoolLease {
    /// Bytes held by this lease.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl Drop for PoolLease {
    fn drop(&mut self) {
        self.pool.in_use.fetch_sub(self.bytes, Ordering::Relaxed);
        debug!(
            released = self.bytes,
            in_use = self.pool.in_use(),
            capacity = self.pool.capacity,
            "returned buffer bytes to pool"
        );
    }
}
