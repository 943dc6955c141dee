//! Backpressure control for the read loop.
//!
//! Before each backend read the action asks the controller whether to
//! proceed. Two conditions defer the read: the transport has not drained
//! prior writes past a per-layout threshold, or the shared buffer pool is
//! low on free memory. Deferral arms a short timer and re-enters the read
//! loop; it is not an error and does not advance the state machine.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use stripegate_engine::MemoryPool;

/// Whether the next backend read may be issued now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Issue the read.
    Proceed,
    /// Re-check after this delay.
    Defer(Duration),
}

/// Per-request backpressure controller.
#[derive(Debug)]
pub struct BackpressureController {
    /// Outstanding-write threshold: `read_payload_size × write_buffer_multiple`.
    outstanding_limit: u64,
    /// Minimum free fraction of the pool.
    free_threshold: f64,
    /// Deferral delay.
    delay: Duration,
    pool: Arc<MemoryPool>,
}

impl BackpressureController {
    /// Create a controller for one request.
    ///
    /// `read_payload_size` is the per-layout payload of one backend read;
    /// the outstanding-write limit is that size times
    /// `write_buffer_multiple`.
    #[must_use]
    pub fn new(
        read_payload_size: u64,
        write_buffer_multiple: u64,
        free_threshold: f64,
        throttle_ms: u64,
        pool: Arc<MemoryPool>,
    ) -> Self {
        Self {
            outstanding_limit: read_payload_size.saturating_mul(write_buffer_multiple),
            free_threshold,
            delay: Duration::from_millis(throttle_ms),
            pool,
        }
    }

    /// Decide whether the next read may proceed, given the bytes the
    /// transport has accepted but not yet written to the socket.
    #[must_use]
    pub fn check(&self, outstanding_write_bytes: u64) -> ThrottleDecision {
        let outbound_full = outstanding_write_bytes >= self.outstanding_limit;
        let pool_low = !self.pool.has_headroom(self.free_threshold);

        if outbound_full || pool_low {
            warn!(
                outstanding_write_bytes,
                outstanding_limit = self.outstanding_limit,
                pool_free = self.pool.free_bytes(),
                delay_ms = self.delay.as_millis() as u64,
                "memory pressure, deferring next backend read"
            );
            ThrottleDecision::Defer(self.delay)
        } else {
            ThrottleDecision::Proceed
        }
    }
}
