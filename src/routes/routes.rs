//! Defines routes for the document gateway.
//!
//! ## Structure
//! - **Probes**
//!   - `GET    /health`: liveness
//!   - `GET    /readyz`: store + bucket readiness
//!
//! - **Documents**
//!   - `POST   /upload`: multipart upload (`pdf` field)
//!   - `GET    /files`: list documents
//!   - `GET    /download/{key}`: stream a document
//!   - `DELETE /files/{key}`: delete a document

use crate::{
    handlers::{
        document_handlers::{delete_document, download_document, list_documents, upload_document},
        health_handlers::{health, readyz},
    },
    services::document_service::DocumentService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Build the router for all gateway routes.
///
/// The router carries shared state (`DocumentService`) to all handlers.
pub fn routes() -> Router<DocumentService> {
    Router::new()
        .route("/health", get(health))
        .route("/readyz", get(readyz))
        .route("/upload", post(upload_document))
        .route("/files", get(list_documents))
        .route("/files/{key}", delete(delete_document))
        .route("/download/{key}", get(download_document))
}

/// Routes with state and middleware applied: permissive CORS, request tracing,
/// and a body limit derived from the configured upload size.
pub fn app(service: DocumentService) -> Router {
    let body_limit = service
        .max_upload_bytes()
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    routes()
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
