//! Health & readiness handlers.
//!
//! - GET /health  -> liveness with a timestamp
//! - GET /readyz  -> readiness that checks the object store and the bucket

use crate::{protocol::metadata::format_timestamp, services::document_service::DocumentService};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;

/// `GET /health`
///
/// Cheap liveness probe; never touches the store.
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "OK",
            message: "Server is running",
            timestamp: format_timestamp(Utc::now()),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe that asks the store whether the configured bucket exists.
/// A store error fails both checks; a missing bucket fails only `bucket`.
///
/// HTTP 200 when all checks pass, HTTP 503 otherwise.
pub async fn readyz(State(service): State<DocumentService>) -> impl IntoResponse {
    let (store_check, bucket_check) = match service.bucket_ready().await {
        Ok(true) => (CheckStatus::ok(), CheckStatus::ok()),
        Ok(false) => (
            CheckStatus::ok(),
            CheckStatus::failed(format!("bucket `{}` does not exist", service.bucket())),
        ),
        Err(e) => {
            let msg = format!("error: {}", e);
            (CheckStatus::failed(msg.clone()), CheckStatus::failed(msg))
        }
    };

    let overall_ok = store_check.ok && bucket_check.ok;
    let mut checks = HashMap::new();
    checks.insert("store", store_check);
    checks.insert("bucket", bucket_check);

    let body = ReadyResponse {
        status: if overall_ok { "ok" } else { "error" },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
    timestamp: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

impl CheckStatus {
    fn ok() -> Self {
        Self { ok: true, error: None }
    }

    fn failed(error: String) -> Self {
        Self {
            ok: false,
            error: Some(error),
        }
    }
}
