//! In-process [`ObjectStore`] for tests and throwaway runs (`--backend memory`).

use crate::{
    protocol::metadata::MetadataMap,
    services::object_store::{
        ByteStream, DEFAULT_CHUNK_SIZE, ObjectListing, ObjectStat, ObjectStore, ObjectSummary,
        StoreError, StoreResult,
    },
};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct MemoryObject {
    data: Bytes,
    content_type: String,
    metadata: MetadataMap,
    last_modified: DateTime<Utc>,
}

type Buckets = HashMap<String, BTreeMap<String, MemoryObject>>;

#[derive(Clone)]
pub struct MemoryObjectStore {
    buckets: Arc<RwLock<Buckets>>,
    chunk_size: usize,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Downloads are split into chunks of at most `chunk_size` bytes.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            buckets: Arc::new(RwLock::new(HashMap::new())),
            chunk_size: chunk_size.max(1),
        }
    }

    async fn with_object<T>(
        &self,
        bucket: &str,
        key: &str,
        f: impl FnOnce(&MemoryObject) -> T,
    ) -> StoreResult<T> {
        let buckets = self.buckets.read().await;
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::BucketNotFound(bucket.to_string()))?;
        objects
            .get(key)
            .map(f)
            .ok_or_else(|| StoreError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        mut body: ByteStream,
        size_bytes: u64,
        content_type: &str,
        metadata: &MetadataMap,
    ) -> StoreResult<()> {
        if !self.bucket_exists(bucket).await? {
            return Err(StoreError::BucketNotFound(bucket.to_string()));
        }

        let mut data = BytesMut::new();
        while let Some(chunk) = body.next().await {
            data.extend_from_slice(&chunk?);
        }
        if data.len() as u64 != size_bytes {
            return Err(StoreError::SizeMismatch {
                key: key.to_string(),
                expected: size_bytes,
                actual: data.len() as u64,
            });
        }

        let object = MemoryObject {
            data: data.freeze(),
            content_type: content_type.to_string(),
            metadata: metadata.iter().collect(),
            last_modified: Utc::now(),
        };

        let mut buckets = self.buckets.write().await;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::BucketNotFound(bucket.to_string()))?;
        objects.insert(key.to_string(), object);
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<ByteStream> {
        let data = self.with_object(bucket, key, |o| o.data.clone()).await?;
        let chunk_size = self.chunk_size;
        let chunks = (0..data.len())
            .step_by(chunk_size)
            .map(move |start| Ok(data.slice(start..(start + chunk_size).min(data.len()))));
        Ok(stream::iter(chunks).boxed())
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectStat> {
        self.with_object(bucket, key, |o| ObjectStat {
            size_bytes: o.data.len() as u64,
            last_modified: o.last_modified,
            content_type: Some(o.content_type.clone()),
            metadata: o.metadata.clone(),
        })
        .await
    }

    async fn list_objects(&self, bucket: &str) -> StoreResult<ObjectListing> {
        let buckets = self.buckets.read().await;
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::BucketNotFound(bucket.to_string()))?;
        let snapshot: Vec<StoreResult<ObjectSummary>> = objects
            .iter()
            .map(|(key, o)| {
                Ok(ObjectSummary {
                    key: key.clone(),
                    size_bytes: o.data.len() as u64,
                    last_modified: o.last_modified,
                })
            })
            .collect();
        Ok(stream::iter(snapshot).boxed())
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        let mut buckets = self.buckets.write().await;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::BucketNotFound(bucket.to_string()))?;
        objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn bucket_exists(&self, bucket: &str) -> StoreResult<bool> {
        Ok(self.buckets.read().await.contains_key(bucket))
    }

    async fn make_bucket(&self, bucket: &str) -> StoreResult<()> {
        let mut buckets = self.buckets.write().await;
        if buckets.contains_key(bucket) {
            return Err(StoreError::BucketAlreadyExists(bucket.to_string()));
        }
        buckets.insert(bucket.to_string(), BTreeMap::new());
        Ok(())
    }
}
