//! Storage naming rules.
//!
//! A storage name is `<epochMillis>.<extension>`. The extension comes from the
//! client filename, reduced to ASCII alphanumerics so it can never carry path
//! separators. A sidecar is the storage name plus [`SIDECAR_SUFFIX`].

use chrono::{DateTime, Utc};

pub const SIDECAR_SUFFIX: &str = ".json";

const MAX_EXTENSION_LEN: usize = 16;

/// Build the storage name for an upload received at `at`.
pub fn storage_name(original_name: &str, at: DateTime<Utc>) -> String {
    format!("{}.{}", at.timestamp_millis(), extension_of(original_name))
}

/// Text after the last `.` of the filename's basename, sanitized.
/// Empty when the name has no dot.
pub fn extension_of(original_name: &str) -> String {
    let basename = client_basename(original_name);
    match basename.rsplit_once('.') {
        Some((_, ext)) => ext
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .take(MAX_EXTENSION_LEN)
            .collect(),
        None => String::new(),
    }
}

/// Strip any directory part a client may have sent along with the filename.
pub fn client_basename(original_name: &str) -> &str {
    original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name)
}

pub fn sidecar_name(storage_name: &str) -> String {
    format!("{}{}", storage_name, SIDECAR_SUFFIX)
}

/// True for `<storage_name>.json`.
///
/// Every storage name contains a dot, so a `.json` entry whose stem has none
/// (an uploaded `x.json` stored as `<ms>.json`) is a payload, not a sidecar.
pub fn is_sidecar(name: &str) -> bool {
    name.strip_suffix(SIDECAR_SUFFIX)
        .is_some_and(|stem| stem.contains('.'))
}

/// Hidden entries hold in-flight temp files and are never exposed.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Whether `name` may address a payload inside the storage directory.
///
/// Rejects empty names, dotfiles, path separators, `..`, control bytes and
/// sidecars.
pub fn is_public_name(name: &str) -> bool {
    !name.is_empty()
        && !is_hidden(name)
        && !name.contains("..")
        && !name
            .bytes()
            .any(|b| b == b'/' || b == b'\\' || b.is_ascii_control())
        && !is_sidecar(name)
}

/// Display name derived from the storage name: everything before the last dot.
pub fn derived_original_name(storage_name: &str) -> String {
    storage_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(storage_name)
        .to_string()
}

/// Upload time derived from the leading numeric component of the name.
pub fn derived_uploaded_at(storage_name: &str) -> Option<DateTime<Utc>> {
    let prefix = storage_name.split('.').next()?;
    let millis = prefix.parse::<i64>().ok()?;
    DateTime::from_timestamp_millis(millis)
}
