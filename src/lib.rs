//! HTTP file storage: uploads land in a single directory under generated
//! names, with a JSON sidecar per file carrying its original name and upload
//! time. Listing, search and deletion work directly off that directory.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

use axum::Router;
use services::storage_service::StorageService;

/// Full application router with state attached.
pub fn app(storage: StorageService) -> Router {
    routes::routes::routes().with_state(storage)
}
