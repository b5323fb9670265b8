//! The external-facing view of one stored file.

use crate::models::metadata::Metadata;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

/// Listing entry returned by `GET /api/files`.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileView {
    /// Storage name.
    pub filename: String,
    pub original_name: String,
    pub size: u64,
    pub url: String,
    #[serde(serialize_with = "serialize_millis_rfc3339")]
    pub uploaded_at: DateTime<Utc>,
}

impl FileView {
    /// Apply a sidecar record on top of a view derived from the storage name.
    ///
    /// Overrides happen field by field; an empty `originalName` is ignored.
    pub fn merge(mut self, metadata: Option<&Metadata>) -> Self {
        let Some(meta) = metadata else {
            return self;
        };
        if let Some(name) = meta.original_name.as_deref().filter(|n| !n.is_empty()) {
            self.original_name = name.to_string();
        }
        if let Some(at) = meta.uploaded_at {
            self.uploaded_at = at;
        }
        self
    }

    /// Case-insensitive substring match on the display name.
    pub fn matches(&self, search: &str) -> bool {
        search.is_empty()
            || self
                .original_name
                .to_lowercase()
                .contains(&search.to_lowercase())
    }
}

fn serialize_millis_rfc3339<S>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
}
