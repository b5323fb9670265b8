//! Static HTML pages. Both talk to the JSON API from the browser.

use axum::response::Html;

static UPLOAD_PAGE: &str = include_str!("../../assets/index.html");
static FILES_PAGE: &str = include_str!("../../assets/files.html");

/// `GET /` — upload form.
pub async fn upload_page() -> Html<&'static str> {
    Html(UPLOAD_PAGE)
}

/// `GET /files` — listing page with search and delete.
pub async fn files_page() -> Html<&'static str> {
    Html(FILES_PAGE)
}
