//! Documents as the HTTP API presents them.

use serde::Serialize;

/// Listing entry for one stored document.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    /// Storage key.
    pub name: String,

    /// Decoded original filename, or the storage key when unavailable.
    pub original_name: String,

    /// Size in bytes.
    pub size: u64,

    pub last_modified: String,

    /// Upload timestamp from metadata, or `last_modified` when absent.
    pub upload_date: String,
}

/// Returned by a successful upload.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    /// Storage key the document was written under.
    pub file_name: String,

    pub original_name: String,

    pub size: u64,

    pub upload_date: String,
}
