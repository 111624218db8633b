use crate::services::document_service::{GatewayError, format_bytes};
use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// HTTP-facing error: a status code plus the message shown to the client.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

/// Store and transfer failures are logged here and reach the client only as
/// a generic message.
impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Validation(msg) => AppError::bad_request(msg),
            GatewayError::TooLarge { max, .. } => AppError::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("File too large (max {})", format_bytes(max)),
            ),
            GatewayError::NotFound(_) => AppError::not_found("File not found"),
            GatewayError::Store(_) | GatewayError::Transfer(_) => {
                tracing::error!(error = %err, "storage operation failed");
                AppError::internal("Storage backend failure")
            }
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::new(err.status(), err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::object_store::StoreError;

    #[test]
    fn gateway_errors_map_to_statuses() {
        let cases = [
            (GatewayError::Validation("No file provided".into()), StatusCode::BAD_REQUEST, "No file provided"),
            (GatewayError::TooLarge { size: 60 << 20, max: 50 << 20 }, StatusCode::PAYLOAD_TOO_LARGE, "File too large (max 50.00 MB)"),
            (GatewayError::NotFound("k".into()), StatusCode::NOT_FOUND, "File not found"),
            (
                GatewayError::Store(StoreError::BucketNotFound("b".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
                "Storage backend failure",
            ),
        ];

        for (err, status, message) in cases {
            let app = AppError::from(err);
            assert_eq!(app.status, status);
            assert_eq!(app.message, message);
        }
    }
}
