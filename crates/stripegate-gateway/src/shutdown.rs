//! Cooperative process shutdown signal.
//!
//! A single atomic word, set once when the process begins quiescing and
//! polled by every action at its suspension boundaries. Checks are a plain
//! load; no locks are taken.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

/// Shared quiesce flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    quiescing: Arc<AtomicBool>,
}

impl ShutdownSignal {
    /// Create a signal in the running state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the process as quiescing. One-way; repeated calls are no-ops.
    pub fn begin_quiesce(&self) {
        if !self.quiescing.swap(true, Ordering::Release) {
            info!("process is quiescing, in-flight GETs will wind down");
        }
    }

    /// Whether the process is quiescing.
    #[must_use]
    pub fn is_quiescing(&self) -> bool {
        self.quiescing.load(Ordering::Acquire)
    }
}
