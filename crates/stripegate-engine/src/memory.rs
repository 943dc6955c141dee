//! In-memory engine and catalog for development and tests.
//!
//! [`MemoryBackend`] bundles an in-memory block engine with an in-memory
//! metadata catalog so the gateway can run without a real object engine.
//! Thread-safe via [`DashMap`]. Fault switches let tests exercise launch
//! failures and mid-stream read failures.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use stripegate_model::{BucketRecord, LayoutTable, Lookup, ObjectRecord};

use crate::buffer::ReadBuffer;
use crate::pool::MemoryPool;
use crate::reader::{BlockEngine, BlockReader, ReadError, ReaderOpState};
use crate::store::{BucketStore, ObjectStore};

/// Injected reader failure, keyed by object id.
#[derive(Debug, Clone, Copy)]
pub enum ReadFault {
    /// Every read on the object fails to launch.
    FailToLaunch,
    /// Reads fail after this many have succeeded.
    FailAfter(u64),
}

/// Injected metadata store failure.
#[derive(Debug, Clone, Copy)]
pub enum StoreFault {
    /// Lookups report they could not be launched.
    FailToLaunch,
    /// Lookups report an in-flight failure.
    Other,
}

// ---------------------------------------------------------------------------
// MemoryEngine
// ---------------------------------------------------------------------------

/// In-memory block engine: object bodies keyed by object id.
pub struct MemoryEngine {
    pool: Arc<MemoryPool>,
    layouts: Arc<LayoutTable>,
    objects: DashMap<u128, Bytes>,
    faults: DashMap<u128, ReadFault>,
    reads_issued: Arc<AtomicU64>,
}

impl std::fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("objects_count", &self.objects.len())
            .finish()
    }
}

impl MemoryEngine {
    /// Create an engine drawing buffer leases from `pool`.
    #[must_use]
    pub fn new(pool: Arc<MemoryPool>, layouts: Arc<LayoutTable>) -> Self {
        Self {
            pool,
            layouts,
            objects: DashMap::new(),
            faults: DashMap::new(),
            reads_issued: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Store object bytes under an object id.
    pub fn insert(&self, object_id: u128, data: Bytes) {
        debug!(object_id, len = data.len(), "storing object body");
        self.objects.insert(object_id, data);
    }

    /// Arrange for reads on `object_id` to fail.
    pub fn set_fault(&self, object_id: u128, fault: ReadFault) {
        self.faults.insert(object_id, fault);
    }

    /// Total reads issued against this engine, across all readers.
    #[must_use]
    pub fn reads_issued(&self) -> u64 {
        self.reads_issued.load(Ordering::Relaxed)
    }
}

impl BlockEngine for MemoryEngine {
    fn open_reader(
        &self,
        object_id: u128,
        layout_id: u32,
        _placement_id: Option<u32>,
    ) -> Box<dyn BlockReader> {
        Box::new(MemoryReader {
            data: self.objects.get(&object_id).map(|r| r.value().clone()),
            unit_size: self.layouts.unit_size(layout_id),
            pool: Arc::clone(&self.pool),
            fault: self.faults.get(&object_id).map(|f| *f),
            reads_issued: Arc::clone(&self.reads_issued),
            pos: 0,
            reads_done: 0,
            state: ReaderOpState::Idle,
        })
    }
}

/// Sequential reader over one in-memory object.
struct MemoryReader {
    data: Option<Bytes>,
    unit_size: Option<u64>,
    pool: Arc<MemoryPool>,
    fault: Option<ReadFault>,
    reads_issued: Arc<AtomicU64>,
    pos: u64,
    reads_done: u64,
    state: ReaderOpState,
}

#[async_trait]
impl BlockReader for MemoryReader {
    fn seek(&mut self, byte_offset: u64) {
        self.pos = byte_offset;
    }

    async fn read(&mut self, blocks: u64) -> Result<ReadBuffer, ReadError> {
        self.state = ReaderOpState::InFlight;
        self.reads_issued.fetch_add(1, Ordering::Relaxed);

        match self.fault {
            Some(ReadFault::FailToLaunch) => {
                self.state = ReaderOpState::FailedToLaunch;
                return Err(ReadError::FailedToLaunch);
            }
            Some(ReadFault::FailAfter(n)) if self.reads_done >= n => {
                self.state = ReaderOpState::Failed;
                return Err(ReadError::Failed("injected read failure".to_owned()));
            }
            _ => {}
        }

        let Some(unit_size) = self.unit_size else {
            self.state = ReaderOpState::FailedToLaunch;
            return Err(ReadError::FailedToLaunch);
        };
        let Some(data) = &self.data else {
            self.state = ReaderOpState::Failed;
            return Err(ReadError::Failed("object body not found".to_owned()));
        };

        let len = data.len() as u64;
        let want = blocks.saturating_mul(unit_size);
        let start = self.pos.min(len);
        let end = self.pos.saturating_add(want).min(len);
        let chunk = data.slice(start as usize..end as usize);

        self.pos = self.pos.saturating_add(want);
        self.reads_done += 1;
        self.state = ReaderOpState::Success;

        let lease = self.pool.reserve(chunk.len() as u64);
        Ok(ReadBuffer::new(chunk, lease))
    }

    fn state(&self) -> ReaderOpState {
        self.state
    }
}

// ---------------------------------------------------------------------------
// MemoryCatalog
// ---------------------------------------------------------------------------

/// In-memory bucket and object metadata.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    buckets: DashMap<String, BucketRecord>,
    objects: DashMap<(String, String), ObjectRecord>,
    bucket_fault: Mutex<Option<StoreFault>>,
    object_fault: Mutex<Option<StoreFault>>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bucket.
    pub fn insert_bucket(&self, record: BucketRecord) {
        self.buckets.insert(record.name.clone(), record);
    }

    /// Register an object record.
    pub fn insert_object(&self, bucket: &str, record: ObjectRecord) {
        self.objects
            .insert((bucket.to_owned(), record.key.clone()), record);
    }

    /// Make bucket lookups fail until cleared with `None`.
    pub fn set_bucket_fault(&self, fault: Option<StoreFault>) {
        *self.bucket_fault.lock() = fault;
    }

    /// Make object lookups fail until cleared with `None`.
    pub fn set_object_fault(&self, fault: Option<StoreFault>) {
        *self.object_fault.lock() = fault;
    }
}

fn faulted<T>(fault: Option<StoreFault>) -> Option<Lookup<T>> {
    match fault {
        Some(StoreFault::FailToLaunch) => Some(Lookup::FailedToLaunch),
        Some(StoreFault::Other) => Some(Lookup::Other),
        None => None,
    }
}

#[async_trait]
impl BucketStore for MemoryCatalog {
    async fn lookup_bucket(&self, bucket: &str) -> Lookup<BucketRecord> {
        if let Some(outcome) = faulted(*self.bucket_fault.lock()) {
            return outcome;
        }
        match self.buckets.get(bucket) {
            Some(record) => Lookup::Present(record.value().clone()),
            None => Lookup::Missing,
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryCatalog {
    async fn lookup_object(&self, bucket: &str, key: &str) -> Lookup<ObjectRecord> {
        if let Some(outcome) = faulted(*self.object_fault.lock()) {
            return outcome;
        }
        match self.objects.get(&(bucket.to_owned(), key.to_owned())) {
            Some(record) => Lookup::Present(record.value().clone()),
            None => Lookup::Missing,
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryBackend
// ---------------------------------------------------------------------------

/// Options for storing an object in the in-memory backend.
#[derive(Debug, Clone)]
pub struct ObjectSpec {
    /// MIME type. Defaults to `binary/octet-stream`, as S3 does.
    pub content_type: String,
    /// User attributes echoed on GET responses.
    pub user_attributes: Vec<(String, String)>,
    /// Tag count reported via `x-amz-tagging-count`.
    pub tag_count: usize,
    /// Explicit layout id; picked from the object size when `None`.
    pub layout_id: Option<u32>,
}

impl Default for ObjectSpec {
    fn default() -> Self {
        Self {
            content_type: "binary/octet-stream".to_owned(),
            user_attributes: Vec::new(),
            tag_count: 0,
            layout_id: None,
        }
    }
}

/// In-memory engine plus catalog, with coordinated object ids.
#[derive(Debug)]
pub struct MemoryBackend {
    engine: Arc<MemoryEngine>,
    catalog: Arc<MemoryCatalog>,
    layouts: Arc<LayoutTable>,
    next_object_id: AtomicU64,
}

impl MemoryBackend {
    /// Create a backend drawing buffer leases from `pool`.
    #[must_use]
    pub fn new(pool: Arc<MemoryPool>, layouts: Arc<LayoutTable>) -> Self {
        Self {
            engine: Arc::new(MemoryEngine::new(pool, Arc::clone(&layouts))),
            catalog: Arc::new(MemoryCatalog::new()),
            layouts,
            next_object_id: AtomicU64::new(1),
        }
    }

    /// The block engine half.
    #[must_use]
    pub fn engine(&self) -> Arc<MemoryEngine> {
        Arc::clone(&self.engine)
    }

    /// The metadata catalog half.
    #[must_use]
    pub fn catalog(&self) -> Arc<MemoryCatalog> {
        Arc::clone(&self.catalog)
    }

    /// Create a bucket.
    pub fn create_bucket(&self, name: &str) {
        self.catalog.insert_bucket(BucketRecord {
            name: name.to_owned(),
            created_at: Utc::now(),
        });
    }

    /// Store an object body and its metadata record; returns the record.
    pub fn put_object(&self, bucket: &str, key: &str, data: Bytes, spec: ObjectSpec) -> ObjectRecord {
        let object_id = u128::from(self.next_object_id.fetch_add(1, Ordering::Relaxed));
        let md5_hex = format!("{:x}", md5::compute(&data));
        let layout_id = spec
            .layout_id
            .unwrap_or_else(|| self.layouts.layout_for_object_size(data.len() as u64));

        let record = ObjectRecord {
            object_id,
            key: key.to_owned(),
            content_length: data.len() as u64,
            layout_id,
            md5_hex,
            last_modified: Utc::now(),
            content_type: spec.content_type,
            user_attributes: spec.user_attributes,
            placement_id: None,
            version_id: None,
            tag_count: spec.tag_count,
        };

        self.engine.insert(object_id, data);
        self.catalog.insert_object(bucket, record.clone());
        record
    }
}
