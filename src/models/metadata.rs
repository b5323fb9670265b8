//! Sidecar metadata recorded next to each stored file.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Contents of `<storage_name>.json`.
///
/// Every field is optional so that a partial record still overrides whatever
/// it does carry. `uploaded_at` is persisted as epoch milliseconds.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Filename supplied by the client at upload time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,

    /// Server-side receipt time.
    #[serde(
        serialize_with = "chrono::serde::ts_milliseconds_option::serialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub uploaded_at: Option<DateTime<Utc>>,

    /// MIME type declared by the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl Metadata {
    pub fn new(
        original_name: impl Into<String>,
        uploaded_at: DateTime<Utc>,
        content_type: Option<String>,
    ) -> Self {
        Self {
            original_name: Some(original_name.into()),
            uploaded_at: Some(uploaded_at),
            content_type,
        }
    }

    /// Decode a sidecar document field by field.
    ///
    /// A field with an unexpected type is dropped on its own; the others still
    /// apply. `uploadedAt` accepts epoch millis (integer or float) or an
    /// RFC 3339 string. Returns `None` when the document is not an object.
    pub fn from_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let string_field = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);

        Some(Self {
            original_name: string_field("originalName"),
            uploaded_at: object.get("uploadedAt").and_then(parse_timestamp),
            content_type: string_field("contentType"),
        })
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .and_then(DateTime::from_timestamp_millis),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|at| at.with_timezone(&Utc)),
        _ => None,
    }
}
