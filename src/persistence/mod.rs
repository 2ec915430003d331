//! Vault persistence
//!
//! A [`VaultStore`] keeps one serialized vault snapshot and hands out an
//! opaque [`VersionToken`] for every revision. Saves must present the token
//! of the revision they were based on; a stale token fails with
//! [`PersistenceError::Conflict`] instead of overwriting newer data.
//!
//! Snapshots travel as base64-encoded JSON. Tokens are the hex SHA-256 of
//! that encoded blob.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Opaque revision marker returned by a store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Token for an encoded blob
    pub fn for_blob(blob: &str) -> Self {
        Self(hex::encode(Sha256::digest(blob.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VersionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of [`VaultStore::load`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Loaded {
    /// Stored snapshot, `None` if nothing was ever saved
    pub snapshot: Option<Value>,
    /// Token of the stored revision, `None` if nothing was ever saved
    pub version: Option<VersionToken>,
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The store moved on since the caller's last load or save
    #[error("version conflict: expected {expected:?}, store has {actual:?}")]
    Conflict {
        expected: Option<VersionToken>,
        actual: Option<VersionToken>,
    },

    #[error("vault store I/O failed: {0}")]
    Transport(#[from] std::io::Error),

    #[error("vault snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("vault snapshot is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl PersistenceError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Whether trying again may succeed: conflicts after a reload, and I/O
    /// failures that are transient by nature
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Conflict { .. } => true,
            Self::Transport(e) => matches!(
                e.kind(),
                ErrorKind::Interrupted
                    | ErrorKind::TimedOut
                    | ErrorKind::WouldBlock
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
            ),
            Self::Json(_) | Self::Base64(_) => false,
        }
    }
}

/// Key-value blob store holding a single vault snapshot
#[async_trait]
pub trait VaultStore: Send + Sync {
    /// Read the stored snapshot and its version token
    async fn load(&self) -> Result<Loaded, PersistenceError>;

    /// Write `snapshot` if `version` matches the stored revision
    async fn save(
        &self,
        snapshot: &Value,
        version: Option<&VersionToken>,
    ) -> Result<VersionToken, PersistenceError>;

    /// Store name for logs
    fn name(&self) -> &'static str;
}

/// Encode a snapshot into its transport form
pub fn encode_snapshot(snapshot: &Value) -> Result<String, PersistenceError> {
    let json = serde_json::to_vec(snapshot)?;
    Ok(STANDARD.encode(json))
}

/// Decode a transport blob back into a snapshot
pub fn decode_snapshot(blob: &str) -> Result<Value, PersistenceError> {
    let bytes = STANDARD.decode(blob.trim())?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Reject a save unless `expected` names the current revision
pub(crate) fn check_version(
    current: Option<VersionToken>,
    expected: Option<&VersionToken>,
) -> Result<(), PersistenceError> {
    if current.as_ref() == expected {
        Ok(())
    } else {
        Err(PersistenceError::Conflict {
            expected: expected.cloned(),
            actual: current,
        })
    }
}
