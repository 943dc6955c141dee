//! Block engine abstraction for the stripegate gateway.
//!
//! The gateway reads object data as fixed-size stripe units through the
//! [`BlockEngine`] / [`BlockReader`] traits and resolves metadata through
//! the [`BucketStore`] / [`ObjectStore`] traits. Buffers handed out by
//! readers are leased from a process-wide [`MemoryPool`] and move linearly:
//! sliced in place by the action, then transferred into the transport,
//! which returns the lease when the bytes leave the process.
//!
//! [`MemoryBackend`] provides an in-memory implementation of all four
//! traits for development and tests.

pub mod buffer;
pub mod memory;
pub mod pool;
pub mod reader;
pub mod store;

pub use buffer::ReadBuffer;
pub use memory::{MemoryBackend, MemoryCatalog, MemoryEngine, ObjectSpec, ReadFault, StoreFault};
pub use pool::{MemoryPool, PoolLease};
pub use reader::{BlockEngine, BlockReader, ReadError, ReaderOpState};
pub use store::{BucketStore, ObjectStore};
