//! HTTP handlers for upload, listing, download and deletion.
//! Upload bodies are streamed straight into `StorageService`; nothing is
//! buffered whole in memory.

use crate::{
    errors::AppError,
    models::{file_view::FileView, origin::RequestOrigin},
    services::storage_service::StorageService,
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, Query, State, multipart::MultipartRejection},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::io;
use tokio_util::io::ReaderStream;

/// Multipart field carrying the upload.
const FILE_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct ListFilesQuery {
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
}

/// `POST /upload` — multipart form with a `file` field.
pub async fn upload_file(
    State(service): State<StorageService>,
    origin: RequestOrigin,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart.map_err(|err| {
        tracing::debug!("rejected upload body: {}", err);
        AppError::bad_request("No file uploaded")
    })?;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("invalid multipart body: {}", err)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        // A part without a filename is a plain form value (or an empty file
        // input), not an upload.
        let Some(original_name) = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
        else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let stream =
            field.map(|chunk| chunk.map_err(|err| io::Error::new(io::ErrorKind::Other, err)));

        let upload = service
            .ingest(&original_name, content_type.as_deref(), stream)
            .await?;

        return Ok(Json(UploadResponse {
            url: origin.file_url(&upload.storage_name),
        }));
    }

    Err(AppError::bad_request("No file uploaded"))
}

/// `GET /api/files?search=` — newest first.
pub async fn list_files(
    State(service): State<StorageService>,
    origin: RequestOrigin,
    Query(q): Query<ListFilesQuery>,
) -> Result<Json<Vec<FileView>>, AppError> {
    let files = service
        .list_files(q.search.as_deref(), &origin.base_url())
        .await
        .map_err(|err| {
            tracing::error!("error listing {}: {}", service.base_path.display(), err);
            AppError::internal("Failed to get files")
        })?;
    Ok(Json(files))
}

/// `DELETE /api/files/{filename}`
pub async fn delete_file(
    State(service): State<StorageService>,
    Path(filename): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    service.delete_file(&filename).await?;
    Ok(Json(DeleteResponse {
        message: "File deleted successfully".into(),
    }))
}

/// `GET /files/{filename}` — raw bytes as a streaming response.
pub async fn get_file(
    State(service): State<StorageService>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let (stored, file) = service.open_file(&filename).await?;
    let body = Body::from_stream(ReaderStream::new(file));

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    let content_type = stored
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(stored.size_bytes));
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );

    Ok(response)
}
