//! Metadata attached to stored documents and the fallback rules used to turn
//! a stored object back into a listing entry.
//!
//! Every lookup here is total: missing or corrupt metadata degrades to the
//! storage key or the store's own timestamp, it never fails the caller.

use crate::{
    models::document::DocumentRecord,
    protocol::key_codec::{decode_name, encode_name},
    services::object_store::ObjectSummary,
};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;
use tracing::debug;

/// Percent-encoded original filename.
pub const ORIGINAL_NAME_FIELD: &str = "x-original-name-encoded";
/// ISO-8601 upload timestamp.
pub const UPLOAD_DATE_FIELD: &str = "x-upload-date";
pub const CONTENT_TYPE_FIELD: &str = "content-type";

/// Object metadata with case-insensitive field names.
///
/// Some transports lower-case metadata keys in transit, so names are folded
/// to ASCII lowercase on insert and on lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataMap(BTreeMap<String, String>);

impl MetadataMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for MetadataMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, value) in iter {
            map.insert(name.as_ref(), value);
        }
        map
    }
}

/// Timestamps are written as RFC 3339 with millisecond precision in UTC.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Metadata written alongside a freshly uploaded document.
pub fn build_upload_metadata(
    sanitized_name: &str,
    uploaded_at: DateTime<Utc>,
    content_type: &str,
) -> MetadataMap {
    let mut metadata = MetadataMap::new();
    metadata.insert(ORIGINAL_NAME_FIELD, encode_name(sanitized_name));
    metadata.insert(UPLOAD_DATE_FIELD, format_timestamp(uploaded_at));
    metadata.insert(CONTENT_TYPE_FIELD, content_type);
    metadata
}

/// Decode the stored original name, or return `fallback_key` unchanged when
/// the field is absent, empty, or not a valid encoding.
pub fn reconstruct_original_name(metadata: &MetadataMap, fallback_key: &str) -> String {
    let Some(encoded) = metadata.get(ORIGINAL_NAME_FIELD).filter(|v| !v.is_empty()) else {
        return fallback_key.to_string();
    };

    match decode_name(encoded) {
        Ok(name) => name,
        Err(err) => {
            debug!(key = fallback_key, error = %err, "ignoring undecodable original name");
            fallback_key.to_string()
        }
    }
}

pub fn reconstruct_upload_date(metadata: &MetadataMap, fallback_timestamp: &str) -> String {
    metadata
        .get(UPLOAD_DATE_FIELD)
        .unwrap_or(fallback_timestamp)
        .to_string()
}

/// Build a listing entry. `metadata` is `None` when the object could not be
/// stat'ed; that is treated the same as an object without metadata.
pub fn document_record(summary: &ObjectSummary, metadata: Option<&MetadataMap>) -> DocumentRecord {
    let empty = MetadataMap::new();
    let metadata = metadata.unwrap_or(&empty);
    let last_modified = format_timestamp(summary.last_modified);

    DocumentRecord {
        name: summary.key.clone(),
        original_name: reconstruct_original_name(metadata, &summary.key),
        size: summary.size_bytes,
        upload_date: reconstruct_upload_date(metadata, &last_modified),
        last_modified,
    }
}
