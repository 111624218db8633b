//! DocumentService: upload, list, download and delete of PDF documents on
//! top of an injected [`ObjectStore`].

use crate::{
    models::document::{DocumentRecord, UploadReceipt},
    protocol::{
        disposition::build_content_disposition,
        key_codec::{DEFAULT_UPLOAD_NAME, generate_storage_key, is_pdf_name, sanitize_base_name},
        metadata::{build_upload_metadata, document_record, format_timestamp, reconstruct_original_name},
    },
    services::{
        object_store::{ObjectStore, StoreError},
        transfer::{DownloadStream, TransferError, open_download_stream},
    },
};
use bytes::Bytes;
use chrono::Utc;
use futures::{StreamExt, TryStreamExt, stream};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    Validation(String),
    #[error("file of {size} bytes exceeds the {max} byte limit")]
    TooLarge { size: u64, max: u64 },
    #[error("document `{0}` not found")]
    NotFound(String),
    #[error(transparent)]
    Store(StoreError),
    #[error(transparent)]
    Transfer(TransferError),
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ObjectNotFound { key, .. } | StoreError::InvalidObjectKey(key) => {
                GatewayError::NotFound(key)
            }
            other => GatewayError::Store(other),
        }
    }
}

impl From<TransferError> for GatewayError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::NotFound(key) => GatewayError::NotFound(key),
            other => GatewayError::Transfer(other),
        }
    }
}

/// Everything the HTTP layer needs to answer a download.
pub struct Download {
    pub stream: DownloadStream,
    pub size_bytes: u64,
    pub original_name: String,
    pub content_disposition: String,
}

#[derive(Clone)]
pub struct DocumentService {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    max_upload_bytes: u64,
}

impl DocumentService {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>, max_upload_bytes: u64) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            max_upload_bytes,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Create the bucket if it does not exist yet. Losing a creation race to
    /// another request counts as success.
    pub async fn ensure_bucket(&self) -> Result<(), GatewayError> {
        if self.store.bucket_exists(&self.bucket).await? {
            return Ok(());
        }
        match self.store.make_bucket(&self.bucket).await {
            Ok(()) => {
                info!(bucket = %self.bucket, "created bucket");
                Ok(())
            }
            Err(StoreError::BucketAlreadyExists(_)) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// True when the store answers and the bucket is present.
    pub async fn bucket_ready(&self) -> Result<bool, GatewayError> {
        Ok(self.store.bucket_exists(&self.bucket).await?)
    }

    pub fn ensure_within_limit(&self, size: u64) -> Result<(), GatewayError> {
        if size > self.max_upload_bytes {
            return Err(GatewayError::TooLarge {
                size,
                max: self.max_upload_bytes,
            });
        }
        Ok(())
    }

    /// Validate and store one uploaded PDF.
    ///
    /// `filename` is the name the client declared, `None` when it declared
    /// none; an empty name is rejected.
    pub async fn upload(&self, filename: Option<&str>, data: Bytes) -> Result<UploadReceipt, GatewayError> {
        let raw_name = filename.unwrap_or(DEFAULT_UPLOAD_NAME);
        if raw_name.is_empty() {
            return Err(GatewayError::Validation("No file selected".into()));
        }
        let base_name = sanitize_base_name(raw_name);
        if !is_pdf_name(&base_name) {
            return Err(GatewayError::Validation("Only PDF files are allowed".into()));
        }
        let size = data.len() as u64;
        self.ensure_within_limit(size)?;

        self.ensure_bucket().await?;

        let key = generate_storage_key(&base_name);
        let uploaded_at = Utc::now();
        let metadata = build_upload_metadata(&base_name, uploaded_at, PDF_CONTENT_TYPE);
        let body = stream::once(async move { Ok(data) }).boxed();

        self.store
            .put_object(&self.bucket, key.as_str(), body, size, PDF_CONTENT_TYPE, &metadata)
            .await?;

        info!(key = %key, original_name = %base_name, size, "document uploaded");

        Ok(UploadReceipt {
            file_name: key.into_string(),
            original_name: base_name,
            size,
            upload_date: format_timestamp(uploaded_at),
        })
    }

    /// List every stored document in key order.
    ///
    /// A document whose metadata cannot be read is still listed, named by its
    /// storage key.
    pub async fn list(&self) -> Result<Vec<DocumentRecord>, GatewayError> {
        self.ensure_bucket().await?;

        let mut listing = self.store.list_objects(&self.bucket).await?;
        let mut records = Vec::new();
        while let Some(summary) = listing.try_next().await? {
            let metadata = match self.store.stat_object(&self.bucket, &summary.key).await {
                Ok(stat) => Some(stat.metadata),
                Err(err) => {
                    warn!(key = %summary.key, error = %err, "listing document without metadata");
                    None
                }
            };
            records.push(document_record(&summary, metadata.as_ref()));
        }

        debug!(count = records.len(), "listed documents");
        Ok(records)
    }

    pub async fn download(&self, key: &str) -> Result<Download, GatewayError> {
        let opened = open_download_stream(self.store.as_ref(), &self.bucket, key).await?;
        let original_name = reconstruct_original_name(&opened.metadata, key);

        debug!(
            key,
            size = opened.size_bytes,
            content_type = opened.content_type.as_deref().unwrap_or(PDF_CONTENT_TYPE),
            "opened document for download"
        );

        Ok(Download {
            content_disposition: build_content_disposition(&original_name),
            original_name,
            size_bytes: opened.size_bytes,
            stream: opened.stream,
        })
    }

    pub async fn delete(&self, key: &str) -> Result<(), GatewayError> {
        self.store.remove_object(&self.bucket, key).await?;
        info!(key, "document deleted");
        Ok(())
    }
}

/// Human-readable byte count, e.g. `50.00 MB`.
pub fn format_bytes(size: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = size as f64;
    for unit in UNITS {
        if value < 1024.0 {
            return format!("{:.2} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.2} TB", value)
}
