//! src/services/storage_service.rs
//!
//! StorageService — ingestion, listing and deletion of uploaded files. Payloads
//! live flat in `base_path` under their storage names; metadata goes through a
//! [`MetadataStore`] (JSON sidecars by default). No index or database exists:
//! every listing is rebuilt from the directory on demand.

use crate::{
    config::AppConfig,
    models::{
        file_view::FileView, metadata::Metadata, origin::PUBLIC_FILES_PATH,
        stored_file::StoredFile,
    },
    services::{
        metadata_store::{MetadataStore, SidecarStore},
        naming,
    },
};
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use futures::{Stream, StreamExt, future::join_all, pin_mut};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("file `{0}` not found")]
    FileNotFound(String),
    #[error("file exceeds the {limit} byte upload limit")]
    TooLarge { limit: u64 },
    #[error("file type `{0}` is not allowed")]
    UnsupportedMediaType(String),
    #[error("upload interrupted: {0}")]
    UploadInterrupted(io::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Result of a successful ingestion.
#[derive(Clone, Debug)]
pub struct StoredUpload {
    pub storage_name: String,
    pub size_bytes: u64,
    pub metadata: Metadata,
}

/// StorageService provides the file operations behind the HTTP API:
/// - Ingest an upload (stream to disk, claim a storage name, write metadata)
/// - List files (directory scan merged with metadata, filtered and sorted)
/// - Open a file for download
/// - Delete a file together with its metadata
#[derive(Clone)]
pub struct StorageService {
    /// Directory holding payloads (and, by default, their sidecars).
    pub base_path: PathBuf,

    config: Arc<AppConfig>,
    metadata: Arc<dyn MetadataStore>,
}

/// How many successive milliseconds to try before giving up on a free name.
const MAX_NAME_ATTEMPTS: i64 = 64;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

impl StorageService {
    /// Service rooted at `config.storage_dir` with sidecar metadata.
    pub fn new(config: Arc<AppConfig>) -> Self {
        let store = Arc::new(SidecarStore::new(&config.storage_dir));
        Self::with_metadata_store(config, store)
    }

    pub fn with_metadata_store(config: Arc<AppConfig>, metadata: Arc<dyn MetadataStore>) -> Self {
        Self {
            base_path: PathBuf::from(&config.storage_dir),
            config,
            metadata,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn file_path(&self, storage_name: &str) -> PathBuf {
        self.base_path.join(storage_name)
    }

    /// Stream an upload to disk and record its metadata.
    ///
    /// - Rejects disallowed MIME types before touching the disk.
    /// - Streams into a hidden temp file, aborting once the size limit is passed.
    /// - Syncs, then links the temp file to a free storage name.
    /// - Writes metadata last; if that fails the payload is removed again.
    ///
    /// A stream error (client disconnect) discards everything written so far.
    pub async fn ingest<S>(
        &self,
        original_name: &str,
        content_type: Option<&str>,
        stream: S,
    ) -> StorageResult<StoredUpload>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        self.ingest_at(original_name, content_type, stream, Utc::now())
            .await
    }

    pub(crate) async fn ingest_at<S>(
        &self,
        original_name: &str,
        content_type: Option<&str>,
        stream: S,
        received_at: DateTime<Utc>,
    ) -> StorageResult<StoredUpload>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let content_type = content_type.unwrap_or(DEFAULT_CONTENT_TYPE);
        if !self.config.is_mime_allowed(content_type) {
            return Err(StorageError::UnsupportedMediaType(content_type.to_string()));
        }

        let tmp_path = self.base_path.join(format!(".upload-{}", Uuid::new_v4()));
        let size_bytes = match self.write_temp(&tmp_path, stream).await {
            Ok(size) => size,
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(err);
            }
        };

        let claimed = self.claim_name(&tmp_path, original_name, received_at).await;
        let _ = fs::remove_file(&tmp_path).await;
        let storage_name = claimed?;

        let uploaded_at = truncate_to_millis(Utc::now());
        let metadata = Metadata::new(
            original_name,
            uploaded_at,
            Some(content_type.to_string()),
        );
        if let Err(err) = self.metadata.write(&storage_name, &metadata).await {
            let _ = fs::remove_file(self.file_path(&storage_name)).await;
            return Err(StorageError::Io(err));
        }

        info!(
            "stored `{}` as {} ({} bytes)",
            original_name, storage_name, size_bytes
        );
        Ok(StoredUpload {
            storage_name,
            size_bytes,
            metadata,
        })
    }

    /// Copy the stream into `tmp_path`, enforcing the upload limit.
    async fn write_temp<S>(&self, tmp_path: &Path, stream: S) -> StorageResult<u64>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let limit = self.config.max_upload_bytes;
        let mut file = File::create(tmp_path).await?;
        let mut size_bytes: u64 = 0;

        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = chunk_res.map_err(StorageError::UploadInterrupted)?;
            size_bytes += chunk.len() as u64;
            if size_bytes > limit {
                return Err(StorageError::TooLarge { limit });
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        file.sync_all().await?;

        Ok(size_bytes)
    }

    /// Hard-link the finished temp file to the first free storage name,
    /// starting at `received_at` and moving forward one millisecond per clash.
    async fn claim_name(
        &self,
        tmp_path: &Path,
        original_name: &str,
        received_at: DateTime<Utc>,
    ) -> StorageResult<String> {
        self.claim_name_with(tmp_path, original_name, received_at, true)
            .await
    }

    /// Claim loop behind [`Self::claim_name`].
    ///
    /// When the filesystem refuses hard links, switches to reserving the name
    /// with an exclusive create and renaming the temp file over it.
    async fn claim_name_with(
        &self,
        tmp_path: &Path,
        original_name: &str,
        received_at: DateTime<Utc>,
        mut use_links: bool,
    ) -> StorageResult<String> {
        let mut offset = 0;
        while offset < MAX_NAME_ATTEMPTS {
            let at = received_at + Duration::milliseconds(offset);
            let candidate = naming::storage_name(original_name, at);
            let target = self.file_path(&candidate);
            let claimed = if use_links {
                fs::hard_link(tmp_path, &target).await
            } else {
                reserve_and_rename(tmp_path, &target).await
            };
            match claimed {
                Ok(()) => return Ok(candidate),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    debug!("storage name {} taken, retrying", candidate);
                    offset += 1;
                }
                Err(err)
                    if use_links
                        && matches!(
                            err.kind(),
                            ErrorKind::Unsupported | ErrorKind::PermissionDenied
                        ) =>
                {
                    warn!(
                        "hard links unavailable in {} ({}); using exclusive create + rename",
                        self.base_path.display(),
                        err
                    );
                    use_links = false;
                }
                Err(err) => {
                    error!("could not claim storage name {}: {}", candidate, err);
                    return Err(StorageError::Io(err));
                }
            }
        }
        Err(StorageError::Io(io::Error::new(
            ErrorKind::AlreadyExists,
            "no free storage name",
        )))
    }

    /// Build the listing for `GET /api/files`.
    ///
    /// Only failing to read the directory itself is an error. Entries that
    /// vanish or cannot be stat'ed mid-scan are skipped with a warning.
    /// Newest first; equal timestamps are ordered by storage name.
    pub async fn list_files(
        &self,
        search: Option<&str>,
        base_url: &str,
    ) -> StorageResult<Vec<FileView>> {
        let mut dir = fs::read_dir(&self.base_path).await?;
        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            match entry.file_name().into_string() {
                Ok(name) if !naming::is_hidden(&name) && !naming::is_sidecar(&name) => {
                    names.push(name)
                }
                Ok(_) => {}
                Err(raw) => warn!("skipping non UTF-8 entry {:?}", raw),
            }
        }

        let views = join_all(names.iter().map(|name| self.view_for(name, base_url))).await;

        let search = search.unwrap_or("");
        let mut files: Vec<FileView> = views
            .into_iter()
            .flatten()
            .filter(|view| view.matches(search))
            .collect();
        files.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| a.filename.cmp(&b.filename))
        });

        Ok(files)
    }

    /// Derive a view from the name and live stat, then overlay metadata.
    async fn view_for(&self, storage_name: &str, base_url: &str) -> Option<FileView> {
        let path = self.file_path(storage_name);
        let stat = match fs::metadata(&path).await {
            Ok(stat) if stat.is_file() => stat,
            Ok(_) => return None,
            Err(err) => {
                warn!("skipping {}: {}", path.display(), err);
                return None;
            }
        };

        let uploaded_at = naming::derived_uploaded_at(storage_name)
            .or_else(|| stat.modified().ok().map(DateTime::<Utc>::from))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let derived = FileView {
            filename: storage_name.to_string(),
            original_name: naming::derived_original_name(storage_name),
            size: stat.len(),
            url: format!("{}{}/{}", base_url, PUBLIC_FILES_PATH, storage_name),
            uploaded_at,
        };

        let metadata = self.metadata.read(storage_name).await;
        Some(derived.merge(metadata.as_ref()))
    }

    /// Open a stored file for download.
    pub async fn open_file(&self, storage_name: &str) -> StorageResult<(StoredFile, File)> {
        if !naming::is_public_name(storage_name) {
            return Err(StorageError::FileNotFound(storage_name.to_string()));
        }
        let path = self.file_path(storage_name);
        let file = File::open(&path).await.map_err(|err| not_found_or_io(err, storage_name))?;
        let stat = file.metadata().await?;
        if !stat.is_file() {
            return Err(StorageError::FileNotFound(storage_name.to_string()));
        }

        let content_type = self
            .metadata
            .read(storage_name)
            .await
            .and_then(|meta| meta.content_type);

        Ok((
            StoredFile {
                storage_name: storage_name.to_string(),
                size_bytes: stat.len(),
                content_type,
            },
            file,
        ))
    }

    /// Delete a stored file, then its metadata.
    ///
    /// Returns FileNotFound without side effects if the payload is absent.
    /// A failure to remove the metadata is logged only; the payload is
    /// already gone at that point.
    pub async fn delete_file(&self, storage_name: &str) -> StorageResult<()> {
        if !naming::is_public_name(storage_name) {
            return Err(StorageError::FileNotFound(storage_name.to_string()));
        }
        let path = self.file_path(storage_name);
        let stat = fs::metadata(&path)
            .await
            .map_err(|err| not_found_or_io(err, storage_name))?;
        if !stat.is_file() {
            return Err(StorageError::FileNotFound(storage_name.to_string()));
        }

        fs::remove_file(&path)
            .await
            .map_err(|err| not_found_or_io(err, storage_name))?;
        debug!("removed payload {}", path.display());

        if let Err(err) = self.metadata.delete(storage_name).await {
            warn!("failed to remove metadata for {}: {}", storage_name, err);
        }

        info!("deleted {}", storage_name);
        Ok(())
    }
}

fn not_found_or_io(err: io::Error, storage_name: &str) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::FileNotFound(storage_name.to_string())
    } else {
        StorageError::Io(err)
    }
}

/// Reserve `target` exclusively, then move `tmp_path` onto it.
async fn reserve_and_rename(tmp_path: &Path, target: &Path) -> io::Result<()> {
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
        .await?;
    if let Err(err) = fs::rename(tmp_path, target).await {
        let _ = fs::remove_file(target).await;
        return Err(err);
    }
    Ok(())
}

fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use tempfile::TempDir;

    const BASE: &str = "http://files.test";

    fn service_with(dir: &TempDir, tweak: impl FnOnce(&mut AppConfig)) -> StorageService {
        let mut config = AppConfig {
            storage_dir: dir.path().to_string_lossy().into_owned(),
            ..AppConfig::default()
        };
        tweak(&mut config);
        StorageService::new(Arc::new(config))
    }

    fn body(bytes: &'static [u8]) -> impl Stream<Item = io::Result<Bytes>> {
        stream::iter(vec![Ok(Bytes::from_static(bytes))])
    }

    fn dir_entries(dir: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    fn at(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    #[tokio::test]
    async fn ingest_writes_payload_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(&dir, |_| {});

        let upload = service
            .ingest_at("Report.PDF", Some("application/pdf"), body(b"%PDF-1.7"), at(1_700_000_000_000))
            .await
            .unwrap();

        assert_eq!(upload.storage_name, "1700000000000.PDF");
        assert_eq!(upload.size_bytes, 8);
        assert_eq!(
            dir_entries(&dir),
            vec!["1700000000000.PDF", "1700000000000.PDF.json"]
        );

        let listed = service.list_files(None, BASE).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].original_name, "Report.PDF");
        assert_eq!(listed[0].size, 8);
        assert_eq!(listed[0].url, "http://files.test/files/1700000000000.PDF");
        assert_eq!(Some(listed[0].uploaded_at), upload.metadata.uploaded_at);
    }

    #[tokio::test]
    async fn same_millisecond_uploads_get_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(&dir, |_| {});

        let first = service
            .ingest_at("a.txt", None, body(b"one"), at(1000))
            .await
            .unwrap();
        let second = service
            .ingest_at("b.txt", None, body(b"two"), at(1000))
            .await
            .unwrap();

        assert_eq!(first.storage_name, "1000.txt");
        assert_eq!(second.storage_name, "1001.txt");
        assert_eq!(std::fs::read(dir.path().join("1000.txt")).unwrap(), b"one");
        assert_eq!(service.list_files(None, BASE).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn oversized_upload_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(&dir, |cfg| cfg.max_upload_bytes = 4);

        let err = service
            .ingest("big.bin", None, body(b"0123456789"))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::TooLarge { limit: 4 }));
        assert!(dir_entries(&dir).is_empty());
    }

    #[tokio::test]
    async fn interrupted_stream_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(&dir, |_| {});
        let chunks = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::new(ErrorKind::ConnectionReset, "client went away")),
        ]);

        let err = service.ingest("half.bin", None, chunks).await.unwrap_err();

        assert!(matches!(err, StorageError::UploadInterrupted(_)));
        assert!(dir_entries(&dir).is_empty());
    }

    #[tokio::test]
    async fn disallowed_type_is_rejected_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(&dir, |cfg| {
            cfg.allowed_mime_types = vec!["image/png".into(), "application/pdf".into()]
        });

        let err = service
            .ingest("notes.txt", Some("text/plain"), body(b"hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedMediaType(_)));
        assert!(dir_entries(&dir).is_empty());

        service
            .ingest("pic.png", Some("image/png"), body(b"\x89PNG"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn listing_falls_back_when_sidecar_is_missing_or_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(&dir, |_| {});
        std::fs::write(dir.path().join("1600000000000.txt"), b"abc").unwrap();
        std::fs::write(dir.path().join("1500000000000.log"), b"abcd").unwrap();
        std::fs::write(dir.path().join("1500000000000.log.json"), b"]]").unwrap();

        let listed = service.list_files(None, BASE).await.unwrap();

        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].filename, "1600000000000.txt");
        assert_eq!(listed[0].original_name, "1600000000000");
        assert_eq!(listed[0].uploaded_at, at(1_600_000_000_000));
        assert_eq!(listed[1].original_name, "1500000000000");
        assert_eq!(listed[1].size, 4);
    }

    #[tokio::test]
    async fn listing_skips_sidecars_and_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(&dir, |_| {});
        std::fs::write(dir.path().join("1.json"), b"{}").unwrap();
        std::fs::write(dir.path().join("2.pdf.json"), b"{}").unwrap();
        std::fs::write(dir.path().join(".upload-abc"), b"partial").unwrap();

        let listed = service.list_files(None, BASE).await.unwrap();

        let names: Vec<_> = listed.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["1.json"]);
    }

    #[tokio::test]
    async fn listing_sorts_newest_first_and_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(&dir, |_| {});
        for name in ["1000.a", "3000.b", "2000.c", "2000.d"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let first = service.list_files(None, BASE).await.unwrap();
        let second = service.list_files(None, BASE).await.unwrap();

        let names: Vec<_> = first.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["3000.b", "2000.c", "2000.d", "1000.a"]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn search_filters_on_original_name() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(&dir, |_| {});
        service
            .ingest_at("Report.PDF", None, body(b"1"), at(1000))
            .await
            .unwrap();
        service
            .ingest_at("invoice.txt", None, body(b"2"), at(2000))
            .await
            .unwrap();

        let hits = service.list_files(Some("report"), BASE).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].original_name, "Report.PDF");

        let hits = service.list_files(Some("OIC"), BASE).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].original_name, "invoice.txt");
    }

    #[tokio::test]
    async fn listing_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(&dir, |cfg| {
            cfg.storage_dir = dir.path().join("gone").to_string_lossy().into_owned()
        });

        assert!(matches!(
            service.list_files(None, BASE).await,
            Err(StorageError::Io(_))
        ));
    }

    #[tokio::test]
    async fn delete_removes_payload_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(&dir, |_| {});
        let upload = service
            .ingest_at("a.txt", None, body(b"a"), at(1000))
            .await
            .unwrap();

        service.delete_file(&upload.storage_name).await.unwrap();

        assert!(dir_entries(&dir).is_empty());
        assert!(matches!(
            service.delete_file(&upload.storage_name).await,
            Err(StorageError::FileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_without_sidecar_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(&dir, |_| {});
        std::fs::write(dir.path().join("5.bin"), b"x").unwrap();

        service.delete_file("5.bin").await.unwrap();
        assert!(dir_entries(&dir).is_empty());
    }

    #[tokio::test]
    async fn delete_refuses_sidecars_and_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(&dir, |_| {});
        std::fs::write(dir.path().join("5.bin.json"), b"{}").unwrap();

        for name in ["5.bin.json", "../5.bin", ".upload-x", ""] {
            assert!(matches!(
                service.delete_file(name).await,
                Err(StorageError::FileNotFound(_))
            ));
        }
        assert_eq!(dir_entries(&dir), vec!["5.bin.json"]);
    }

    #[tokio::test]
    async fn open_file_reports_recorded_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(&dir, |_| {});
        let upload = service
            .ingest_at("pic.png", Some("image/png"), body(b"\x89PNG"), at(1000))
            .await
            .unwrap();

        let (stored, _file) = service.open_file(&upload.storage_name).await.unwrap();
        assert_eq!(stored.size_bytes, 4);
        assert_eq!(stored.content_type.as_deref(), Some("image/png"));

        assert!(matches!(
            service.open_file("1000.png.json").await,
            Err(StorageError::FileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn listing_keeps_name_when_upload_time_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(&dir, |_| {});
        std::fs::write(dir.path().join("1700000000000.pdf"), b"%PDF").unwrap();
        std::fs::write(
            dir.path().join("1700000000000.pdf.json"),
            br#"{"originalName":"Report.pdf","uploadedAt":"not a date"}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("1600000000000.txt"), b"t").unwrap();
        std::fs::write(
            dir.path().join("1600000000000.txt.json"),
            br#"{"originalName":"notes.txt","uploadedAt":"2023-11-14T22:13:20.500Z"}"#,
        )
        .unwrap();

        let listed = service.list_files(None, BASE).await.unwrap();

        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].original_name, "notes.txt");
        assert_eq!(listed[0].uploaded_at, at(1_700_000_000_500));
        assert_eq!(listed[1].original_name, "Report.pdf");
        assert_eq!(listed[1].uploaded_at, at(1_700_000_000_000));
    }

    #[tokio::test]
    async fn original_name_is_recorded_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(&dir, |_| {});

        let upload = service
            .ingest_at("C:\\scans\\Report.PDF", None, body(b"x"), at(1000))
            .await
            .unwrap();

        assert_eq!(upload.storage_name, "1000.PDF");
        let listed = service.list_files(None, BASE).await.unwrap();
        assert_eq!(listed[0].original_name, "C:\\scans\\Report.PDF");
    }

    #[tokio::test]
    async fn names_are_claimed_without_hard_links() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(&dir, |_| {});

        let mut claimed = Vec::new();
        for payload in [&b"one"[..], &b"two"[..]] {
            let tmp = dir.path().join(format!(".upload-{}", Uuid::new_v4()));
            std::fs::write(&tmp, payload).unwrap();
            let name = service
                .claim_name_with(&tmp, "a.txt", at(1000), false)
                .await
                .unwrap();
            assert!(!tmp.exists());
            claimed.push(name);
        }

        assert_eq!(claimed, vec!["1000.txt", "1001.txt"]);
        assert_eq!(std::fs::read(dir.path().join("1000.txt")).unwrap(), b"one");
        assert_eq!(std::fs::read(dir.path().join("1001.txt")).unwrap(), b"two");
    }

    #[tokio::test]
    async fn reserve_and_rename_never_clobbers() {
        let dir = tempfile::tempdir().unwrap();
        let tmp = dir.path().join(".upload-x");
        let target = dir.path().join("1000.txt");
        std::fs::write(&tmp, b"new").unwrap();
        std::fs::write(&target, b"old").unwrap();

        let err = reserve_and_rename(&tmp, &target).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read(&target).unwrap(), b"old");
        assert!(tmp.exists());
    }
}
