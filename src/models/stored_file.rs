//! Represents an uploaded file as it exists in the storage directory.

/// A single stored payload, addressed by its storage name.
///
/// The struct describes the file; it does not hold its bytes.
#[derive(Clone, Debug)]
pub struct StoredFile {
    /// Unique on-disk name, `<uploadMillis>.<extension>`.
    pub storage_name: String,

    /// Size in bytes as reported by the filesystem.
    pub size_bytes: u64,

    /// MIME type declared by the uploader, when its sidecar recorded one.
    pub content_type: Option<String>,
}
