//! Client-facing scheme and host, resolved per request.

use crate::services::storage_service::StorageService;
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use std::convert::Infallible;

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Public path under which stored files are served.
pub const PUBLIC_FILES_PATH: &str = "/files";

/// Scheme + host a client used to reach us, honoring reverse-proxy headers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestOrigin {
    pub scheme: String,
    pub host: String,
}

impl RequestOrigin {
    /// Resolve from request headers.
    ///
    /// `X-Forwarded-Proto` / `X-Forwarded-Host` win over the request's own
    /// scheme and `Host`; only the first value of a comma list is used.
    /// `force_https` overrides whatever scheme was detected.
    pub fn from_headers(
        headers: &HeaderMap,
        request_scheme: Option<&str>,
        fallback_host: &str,
        force_https: bool,
    ) -> Self {
        let scheme = if force_https {
            "https".to_string()
        } else {
            first_header_value(headers, X_FORWARDED_PROTO)
                .or_else(|| request_scheme.map(str::to_string))
                .unwrap_or_else(|| "http".to_string())
        };
        let host = first_header_value(headers, X_FORWARDED_HOST)
            .or_else(|| first_header_value(headers, header::HOST.as_str()))
            .unwrap_or_else(|| fallback_host.to_string());

        Self { scheme, host }
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }

    /// Public URL of a stored file.
    pub fn file_url(&self, storage_name: &str) -> String {
        format!("{}{}/{}", self.base_url(), PUBLIC_FILES_PATH, storage_name)
    }
}

fn first_header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl FromRequestParts<StorageService> for RequestOrigin {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &StorageService,
    ) -> Result<Self, Self::Rejection> {
        let config = state.config();
        Ok(Self::from_headers(
            &parts.headers,
            parts.uri.scheme_str(),
            &config.addr(),
            config.force_https,
        ))
    }
}
