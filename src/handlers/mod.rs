//! Axum request handlers.

pub mod document_handlers;
pub mod health_handlers;
