//! The single namespace documents are stored under.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A storage bucket row.
///
/// The gateway only ever uses one bucket (configured at startup), but the
/// store keeps them as rows so provisioning can be checked and repeated.
#[derive(Serialize, Clone, FromRow, Debug)]
pub struct Bucket {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Bucket name (S3 naming rules).
    pub name: String,

    /// When this bucket was created.
    pub created_at: DateTime<Utc>,
}
