//! Metadata fields attached to stored objects.

use sqlx::FromRow;
use uuid::Uuid;

/// A single metadata field row (e.g. `x-original-name-encoded`).
///
/// Names are stored lower-cased.
#[derive(Clone, FromRow, Debug)]
pub struct ObjectMetadata {
    /// Reference to the associated object.
    pub object_id: Uuid,

    /// Field name.
    pub name: String,

    /// ASCII field value.
    pub value: String,
}
