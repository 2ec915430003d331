//! On-disk vault store
//!
//! Holds the encoded snapshot in a single file. Writes go to a sibling
//! temporary file first and are renamed into place, so readers never see a
//! half-written blob.
//!
//! The compare-and-write cycle of a save is serialized per file for the
//! whole process: every [`FileStore`] resolving to the same path shares one
//! lock. Separate processes writing the same file are not coordinated.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{check_version, decode_snapshot, encode_snapshot, Loaded, PersistenceError, VaultStore, VersionToken};

/// Save locks keyed by resolved vault path
static PATH_LOCKS: Lazy<StdMutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = Lazy::new(Default::default);

fn path_lock(key: &Path) -> Arc<Mutex<()>> {
    let mut locks = PATH_LOCKS.lock().unwrap_or_else(PoisonError::into_inner);
    locks.entry(key.to_path_buf()).or_default().clone()
}

/// Vault store backed by one file
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the path from configuration
    pub fn from_config(config: &crate::config::StoreConfig) -> Self {
        Self::new(config.vault_path.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "vault".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Create the parent directory and resolve the path every handle on
    /// this file agrees on
    async fn resolve(&self) -> Result<PathBuf, PersistenceError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        tokio::fs::create_dir_all(parent).await?;
        let dir = tokio::fs::canonicalize(parent).await?;

        Ok(match self.path.file_name() {
            Some(name) => dir.join(name),
            None => self.path.clone(),
        })
    }

    async fn read_blob(&self) -> Result<Option<String>, PersistenceError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl VaultStore for FileStore {
    async fn load(&self) -> Result<Loaded, PersistenceError> {
        match self.read_blob().await? {
            Some(blob) => Ok(Loaded {
                snapshot: Some(decode_snapshot(&blob)?),
                version: Some(VersionToken::for_blob(&blob)),
            }),
            None => {
                debug!("No vault file at {}", self.path.display());
                Ok(Loaded::default())
            }
        }
    }

    async fn save(
        &self,
        snapshot: &Value,
        version: Option<&VersionToken>,
    ) -> Result<VersionToken, PersistenceError> {
        let lock = path_lock(&self.resolve().await?);
        let _guard = lock.lock().await;

        let current = self.read_blob().await?;
        check_version(current.as_deref().map(VersionToken::for_blob), version)?;

        let encoded = encode_snapshot(snapshot)?;
        let token = VersionToken::for_blob(&encoded);

        let temp = self.temp_path();
        tokio::fs::write(&temp, &encoded).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        info!("Saved vault to {} (version {})", self.path.display(), token);
        Ok(token)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
