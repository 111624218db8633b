//! HTTP handlers for document upload, listing, download and deletion.
//! Downloads stream straight from the store; storage concerns stay in
//! `DocumentService`.

use crate::{
    errors::AppError,
    models::document::{DocumentRecord, UploadReceipt},
    services::document_service::{DocumentService, GatewayError, PDF_CONTENT_TYPE},
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::{Bytes, BytesMut};
use serde::Serialize;

/// Multipart field carrying the uploaded document.
pub const UPLOAD_FIELD: &str = "pdf";

#[derive(Serialize)]
struct UploadResponse {
    message: &'static str,
    #[serde(flatten)]
    receipt: UploadReceipt,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

struct UploadedFile {
    filename: Option<String>,
    data: Bytes,
}

/// `POST /upload`: multipart form with the document in the `pdf` field.
pub async fn upload_document(
    State(service): State<DocumentService>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut upload = None;
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_owned);
        tracing::debug!(
            filename = filename.as_deref().unwrap_or_default(),
            content_type = field.content_type().unwrap_or_default(),
            "receiving upload"
        );

        // Checked per chunk so an oversized body is refused before it is
        // fully buffered.
        let mut data = BytesMut::new();
        while let Some(chunk) = field.chunk().await? {
            service.ensure_within_limit((data.len() + chunk.len()) as u64)?;
            data.extend_from_slice(&chunk);
        }

        upload = Some(UploadedFile {
            filename,
            data: data.freeze(),
        });
        break;
    }

    let UploadedFile { filename, data } =
        upload.ok_or_else(|| GatewayError::Validation("No file provided".into()))?;
    let receipt = service.upload(filename.as_deref(), data).await?;

    Ok(Json(UploadResponse {
        message: "File uploaded successfully",
        receipt,
    }))
}

/// `GET /files`: every stored document with its recovered name.
pub async fn list_documents(
    State(service): State<DocumentService>,
) -> Result<Json<Vec<DocumentRecord>>, AppError> {
    Ok(Json(service.list().await?))
}

/// `GET /download/{key}`: stream the document back as an attachment.
pub async fn download_document(
    State(service): State<DocumentService>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let download = service.download(&key).await?;

    let disposition = HeaderValue::from_str(&download.content_disposition).map_err(|err| {
        tracing::error!(key = %key, error = %err, "unrepresentable content disposition");
        AppError::internal("Failed to download file")
    })?;

    let mut response = Response::new(Body::from_stream(download.stream));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(PDF_CONTENT_TYPE));
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(download.size_bytes));

    Ok(response)
}

/// `DELETE /files/{key}`
pub async fn delete_document(
    State(service): State<DocumentService>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    service.delete(&key).await?;
    Ok(Json(MessageResponse {
        message: "File deleted successfully",
    }))
}
