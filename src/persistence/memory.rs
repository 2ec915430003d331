//! In-process vault store

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{check_version, decode_snapshot, encode_snapshot, Loaded, PersistenceError, VaultStore, VersionToken};

/// Vault store kept in memory, mostly for tests and single-process hosts
#[derive(Debug, Default)]
pub struct MemoryStore {
    blob: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw encoded blob currently stored
    pub async fn raw(&self) -> Option<String> {
        self.blob.lock().await.clone()
    }
}

#[async_trait]
impl VaultStore for MemoryStore {
    async fn load(&self) -> Result<Loaded, PersistenceError> {
        let blob = self.blob.lock().await;
        match blob.as_deref() {
            Some(blob) => Ok(Loaded {
                snapshot: Some(decode_snapshot(blob)?),
                version: Some(VersionToken::for_blob(blob)),
            }),
            None => {
                debug!("Memory store empty");
                Ok(Loaded::default())
            }
        }
    }

    async fn save(
        &self,
        snapshot: &Value,
        version: Option<&VersionToken>,
    ) -> Result<VersionToken, PersistenceError> {
        let mut blob = self.blob.lock().await;
        check_version(blob.as_deref().map(VersionToken::for_blob), version)?;

        let encoded = encode_snapshot(snapshot)?;
        let token = VersionToken::for_blob(&encoded);
        *blob = Some(encoded);

        info!("Saved vault to memory store (version {})", token);
        Ok(token)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_empty_load() {
        let store = MemoryStore::new();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, Loaded::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = MemoryStore::new();
        let snapshot = json!({"live": {}, "buried": {}, "counter": 1});

        let token = store.save(&snapshot, None).await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.snapshot, Some(snapshot));
        assert_eq!(loaded.version, Some(token));
    }

    #[tokio::test]
    async fn test_stale_token_conflicts_and_keeps_data() {
        let store = MemoryStore::new();
        let v1 = store.save(&json!({"counter": 1}), None).await.unwrap();
        let v2 = store.save(&json!({"counter": 2}), Some(&v1)).await.unwrap();

        let err = store.save(&json!({"counter": 99}), Some(&v1)).await.unwrap_err();
        match err {
            PersistenceError::Conflict { expected, actual } => {
                assert_eq!(expected, Some(v1));
                assert_eq!(actual, Some(v2.clone()));
            }
            other => panic!("expected conflict, got {other:?}"),
        }

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.snapshot, Some(json!({"counter": 2})));
        assert_eq!(loaded.version, Some(v2));
    }

    #[tokio::test]
    async fn test_missing_token_on_existing_data_conflicts() {
        let store = MemoryStore::new();
        store.save(&json!({"counter": 1}), None).await.unwrap();
        assert!(store.save(&json!({"counter": 2}), None).await.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn test_raw_blob_is_base64() {
        let store = MemoryStore::new();
        store.save(&json!({"counter": 3}), None).await.unwrap();
        let raw = store.raw().await.unwrap();
        assert_eq!(decode_snapshot(&raw).unwrap(), json!({"counter": 3}));
    }
}
