//! Metadata persistence keyed by storage name.
//!
//! The default backend writes one JSON sidecar per stored file. Readers never
//! see an error: a missing, unreadable or corrupt sidecar is reported as
//! `None`, which callers treat the same as an upload still in flight.

use crate::{models::metadata::Metadata, services::naming};
use async_trait::async_trait;
use std::{
    io::{self, ErrorKind},
    path::PathBuf,
};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Persist `metadata`, fully replacing any previous record.
    async fn write(&self, storage_name: &str, metadata: &Metadata) -> io::Result<()>;

    /// Load the record for `storage_name`, or `None` if absent or unusable.
    async fn read(&self, storage_name: &str) -> Option<Metadata>;

    /// Remove the record. A record that is already gone is not an error.
    async fn delete(&self, storage_name: &str) -> io::Result<()>;
}

/// Flat-file backend: `<dir>/<storage_name>.json`.
#[derive(Clone, Debug)]
pub struct SidecarStore {
    dir: PathBuf,
}

impl SidecarStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn sidecar_path(&self, storage_name: &str) -> PathBuf {
        self.dir.join(naming::sidecar_name(storage_name))
    }
}

#[async_trait]
impl MetadataStore for SidecarStore {
    async fn write(&self, storage_name: &str, metadata: &Metadata) -> io::Result<()> {
        let json = serde_json::to_vec(metadata)?;
        let target = self.sidecar_path(storage_name);
        let tmp_path = self.dir.join(format!(".meta-{}", Uuid::new_v4()));

        let result = async {
            let mut file = fs::File::create(&tmp_path).await?;
            file.write_all(&json).await?;
            file.sync_all().await?;
            fs::rename(&tmp_path, &target).await
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&tmp_path).await;
        }
        result
    }

    async fn read(&self, storage_name: &str) -> Option<Metadata> {
        let path = self.sidecar_path(storage_name);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return None,
            Err(err) => {
                warn!("could not read sidecar {}: {}", path.display(), err);
                return None;
            }
        };
        let value: serde_json::Value = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(err) => {
                warn!("ignoring corrupt sidecar {}: {}", path.display(), err);
                return None;
            }
        };
        let meta = Metadata::from_json(&value);
        if meta.is_none() {
            warn!("ignoring sidecar {}: not a JSON object", path.display());
        }
        meta
    }

    async fn delete(&self, storage_name: &str) -> io::Result<()> {
        let path = self.sidecar_path(storage_name);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("sidecar {} already missing", path.display());
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
