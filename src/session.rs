//! Vault Session - load, handle, save
//!
//! Binds one [`ReflectiveEngine`] to a [`VaultStore`]. Every exchange runs the
//! engine and then writes the vault back with the last known version token.
//! A conflict is returned to the caller untouched; recovering (usually
//! [`VaultSession::reload`] and replaying the message) is the caller's call.

use std::sync::Arc;
use tracing::{info, warn};

use crate::detector::AvoidanceDetector;
use crate::engine::ReflectiveEngine;
use crate::persistence::{PersistenceError, VaultStore, VersionToken};
use crate::seed::SeedVault;

pub struct VaultSession<S: VaultStore> {
    store: S,
    engine: ReflectiveEngine,
    version: Option<VersionToken>,
}

impl<S: VaultStore> VaultSession<S> {
    /// Load the stored vault, or start a fresh one if the store is empty
    pub async fn open(
        store: S,
        actor: &str,
        detector: Arc<AvoidanceDetector>,
    ) -> Result<Self, PersistenceError> {
        let (engine, version) = Self::load_engine(&store, actor, detector).await?;
        Ok(Self {
            store,
            engine,
            version,
        })
    }

    async fn load_engine(
        store: &S,
        actor: &str,
        detector: Arc<AvoidanceDetector>,
    ) -> Result<(ReflectiveEngine, Option<VersionToken>), PersistenceError> {
        let loaded = store.load().await?;
        let engine = match loaded.snapshot {
            Some(snapshot) => {
                let vault = SeedVault::from_json(&snapshot);
                info!(
                    "Loaded vault from {} store: {} live seeds, counter {}",
                    store.name(),
                    vault.len(),
                    vault.counter()
                );
                ReflectiveEngine::from_vault(vault, actor, detector)
            }
            None => {
                info!("No stored vault in {} store, starting fresh", store.name());
                ReflectiveEngine::with_detector(actor, detector)
            }
        };
        Ok((engine, loaded.version))
    }

    /// Handle one message and persist the resulting vault.
    ///
    /// If the save fails the reply is dropped, but any seed the message
    /// planted stays in the local vault, which is then ahead of the store.
    /// [`VaultSession::reload`] discards it; replay the message afterwards.
    pub async fn exchange(&mut self, message: &str) -> Result<String, PersistenceError> {
        let reply = self.engine.handle(message);
        self.persist().await?;
        Ok(reply)
    }

    /// Write the current vault, guarded by the last known version
    pub async fn persist(&mut self) -> Result<VersionToken, PersistenceError> {
        let snapshot = self.engine.vault().to_json()?;
        match self.store.save(&snapshot, self.version.as_ref()).await {
            Ok(token) => {
                self.version = Some(token.clone());
                Ok(token)
            }
            Err(e) => {
                if e.is_conflict() {
                    warn!("Vault save rejected, store has a newer revision");
                }
                Err(e)
            }
        }
    }

    /// Drop local state and re-read the store
    pub async fn reload(&mut self) -> Result<(), PersistenceError> {
        let actor = self.engine.actor().to_string();
        let detector = self.engine.detector().clone();
        let (engine, version) = Self::load_engine(&self.store, &actor, detector).await?;
        self.engine = engine;
        self.version = version;
        Ok(())
    }

    pub fn engine(&self) -> &ReflectiveEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut ReflectiveEngine {
        &mut self.engine
    }

    /// Token of the revision this session last loaded or saved
    pub fn version(&self) -> Option<&VersionToken> {
        self.version.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
