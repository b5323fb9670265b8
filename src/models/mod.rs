//! Core data models for the file storage service.
//!
//! `StoredFile` and `Metadata` describe what lives on disk; `FileView` is the
//! per-request merge of both that API clients see; `RequestOrigin` carries the
//! client-facing scheme and host used to build public URLs.

pub mod file_view;
pub mod metadata;
pub mod origin;
pub mod stored_file;
