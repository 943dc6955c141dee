//! Metadata store seams.
//!
//! The gateway resolves bucket and object records through these traits and
//! maps each [`Lookup`] outcome to a client-visible error when the record
//! is not present.

use async_trait::async_trait;
use stripegate_model::{BucketRecord, Lookup, ObjectRecord};

/// Bucket metadata lookups.
#[async_trait]
pub trait BucketStore: Send + Sync {
    /// Resolve a bucket by name.
    async fn lookup_bucket(&self, bucket: &str) -> Lookup<BucketRecord>;
}

/// Object metadata lookups.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Resolve an object by bucket and key.
    async fn lookup_object(&self, bucket: &str, key: &str) -> Lookup<ObjectRecord>;
}
