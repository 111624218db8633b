//! Data models for the document gateway.
//!
//! `bucket`, `object` and `metadata` map to SQLite rows of the local store via
//! `sqlx::FromRow`; `document` holds the JSON shapes returned to clients.

pub mod bucket;
pub mod document;
pub mod metadata;
pub mod object;
