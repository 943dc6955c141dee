//! The block reader seam between the gateway and the object engine.
//!
//! A [`BlockReader`] issues stripe-unit-aligned reads against one object
//! and delivers each chunk as a pooled [`ReadBuffer`]. Launch failures
//! (the engine could not even start the operation) are distinguished from
//! in-flight failures because the gateway maps them to different client
//! errors.

use async_trait::async_trait;

use crate::buffer::ReadBuffer;

/// Observable state of a reader's most recent operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderOpState {
    /// No read issued yet.
    Idle,
    /// A read is in flight.
    InFlight,
    /// The last read completed.
    Success,
    /// The last read failed after launch.
    Failed,
    /// The last read could not be launched.
    FailedToLaunch,
}

/// Why a read produced no buffer.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The engine could not start the operation (session down, entity open
    /// failure). Maps to `ServiceUnavailable`.
    #[error("backend read could not be launched")]
    FailedToLaunch,
    /// The operation started but did not complete.
    #[error("backend read failed: {0}")]
    Failed(String),
}

/// A sequential stripe-unit reader over one object.
#[async_trait]
pub trait BlockReader: Send {
    /// Position the next read at `byte_offset`, which must be aligned to
    /// the object's stripe-unit size.
    fn seek(&mut self, byte_offset: u64);

    /// Fetch `blocks` stripe units from the current position and advance
    /// past them. The returned buffer holds `blocks × unit_size` bytes
    /// except at the object tail, where it may be shorter.
    async fn read(&mut self, blocks: u64) -> Result<ReadBuffer, ReadError>;

    /// State of the most recent operation.
    fn state(&self) -> ReaderOpState;
}

/// An object engine that can open readers.
pub trait BlockEngine: Send + Sync {
    /// Open a reader over the given object. Opening never fails; launch
    /// problems surface on the first [`BlockReader::read`].
    fn open_reader(
        &self,
        object_id: u128,
        layout_id: u32,
        placement_id: Option<u32>,
    ) -> Box<dyn BlockReader>;
}
