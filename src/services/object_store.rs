//! The object-store capability the gateway is written against.
//!
//! Handlers and the document service only ever see `Arc<dyn ObjectStore>`;
//! the concrete backend is chosen once at startup (or by a test).

use crate::protocol::metadata::MetadataMap;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use std::io;
use thiserror::Error;

/// Read granularity for object payloads.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Object payload as a stream of chunks. Dropping it releases whatever the
/// backend holds open (file handle, connection).
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// Lazy, key-ordered listing of a bucket.
pub type ObjectListing = BoxStream<'static, StoreResult<ObjectSummary>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bucket `{0}` not found")]
    BucketNotFound(String),
    #[error("bucket `{0}` already exists")]
    BucketAlreadyExists(String),
    #[error("bucket `{name}` invalid: {reason}")]
    InvalidBucketName { name: String, reason: String },
    #[error("object `{key}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, key: String },
    #[error("invalid object key `{0}`")]
    InvalidObjectKey(String),
    #[error("object `{key}` declared {expected} bytes but received {actual}")]
    SizeMismatch {
        key: String,
        expected: u64,
        actual: u64,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl StoreError {
    /// The key cannot name an existing object.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::ObjectNotFound { .. } | StoreError::InvalidObjectKey(_)
        )
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of `stat_object`.
#[derive(Debug, Clone)]
pub struct ObjectStat {
    pub size_bytes: u64,
    pub last_modified: DateTime<Utc>,
    pub content_type: Option<String>,
    pub metadata: MetadataMap,
}

/// One entry of a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size_bytes: u64,
    pub last_modified: DateTime<Utc>,
}

/// S3-like object storage.
///
/// Implementations report absent keys as [`StoreError::ObjectNotFound`] and
/// return metadata names lower-cased. None of the operations retry.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key`. The body must yield exactly `size_bytes`.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ByteStream,
        size_bytes: u64,
        content_type: &str,
        metadata: &MetadataMap,
    ) -> StoreResult<()>;

    /// Open the payload for reading.
    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<ByteStream>;

    async fn stat_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectStat>;

    /// List every object in the bucket, ordered by key. Each call starts over.
    async fn list_objects(&self, bucket: &str) -> StoreResult<ObjectListing>;

    async fn remove_object(&self, bucket: &str, key: &str) -> StoreResult<()>;

    async fn bucket_exists(&self, bucket: &str) -> StoreResult<bool>;

    async fn make_bucket(&self, bucket: &str) -> StoreResult<()>;
}
