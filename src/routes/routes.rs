//! Defines routes for the file storage service.
//!
//! ## Structure
//! - **Pages**
//!   - `GET    /`      — upload form
//!   - `GET    /files` — listing page
//!
//! - **API**
//!   - `POST   /upload`                — multipart upload (field `file`)
//!   - `GET    /api/files?search=`     — list stored files, newest first
//!   - `DELETE /api/files/{filename}`  — delete a file and its metadata
//!
//! - **Downloads**
//!   - `GET    /files/{filename}`      — raw bytes of a stored file

use crate::{
    handlers::{
        file_handlers::{delete_file, get_file, list_files, upload_file},
        health_handlers::{healthz, readyz},
        page_handlers::{files_page, upload_page},
    },
    services::storage_service::StorageService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};

/// Build and return the router carrying `StorageService` as shared state.
///
/// The upload route lifts axum's default body limit; the configured upload
/// ceiling is enforced while streaming instead.
pub fn routes() -> Router<StorageService> {
    Router::new()
        // health endpoints
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // pages
        .route("/", get(upload_page))
        .route("/files", get(files_page))
        // downloads
        .route("/files/{filename}", get(get_file))
        // API
        .route(
            "/upload",
            post(upload_file).layer(DefaultBodyLimit::disable()),
        )
        .route("/api/files", get(list_files))
        .route("/api/files/{filename}", delete(delete_file))
}
