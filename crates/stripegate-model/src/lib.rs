//! Shared data model for the stripegate gateway.
//!
//! This crate defines the types that cross crate boundaries: the S3 error
//! taxonomy the gateway reports ([`error`]), the bucket and object metadata
//! records the gateway consumes ([`metadata`]), and the process-wide layout
//! table that maps layout ids to stripe-unit sizes ([`layout`]).

pub mod error;
pub mod layout;
pub mod metadata;

pub use error::{S3Error, S3ErrorKind};
pub use layout::{Layout, LayoutTable};
pub use metadata::{BucketRecord, Lookup, ObjectRecord};
