//! Configuration management
//!
//! Manages detector, engine and vault storage settings. Stored as TOML in the
//! platform config directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Avoidance detector settings
    #[serde(default)]
    pub detector: DetectorConfig,
    /// Reflective engine settings
    #[serde(default)]
    pub engine: EngineConfig,
    /// Vault storage settings
    #[serde(default)]
    pub store: StoreConfig,
}

/// Which semantic backend the detector should use after the lexical rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticBackendKind {
    /// Lexical rules only
    #[default]
    None,
    /// Local hash-based embeddings (no download, lower quality)
    Hash,
}

impl std::fmt::Display for SemanticBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Hash => write!(f, "hash"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Semantic fallback backend
    #[serde(default)]
    pub semantic_backend: SemanticBackendKind,
    /// Minimum cosine similarity against any prototype to flag a message
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    /// Number of verdicts kept in the LRU cache
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Prototype avoidance sentences for the semantic fallback
    #[serde(default = "default_prototypes")]
    pub prototypes: Vec<String>,
}

fn default_threshold() -> f32 {
    0.55
}

fn default_cache_capacity() -> usize {
    256
}

fn default_prototypes() -> Vec<String> {
    [
        "I'm just one person",
        "Life isn't fair",
        "Nothing I do will matter",
        "It's out of my control",
        "Corporations won't change",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            semantic_backend: SemanticBackendKind::None,
            threshold: default_threshold(),
            cache_capacity: default_cache_capacity(),
            prototypes: default_prototypes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Alias recorded as planter of seeds created by the engine
    #[serde(default = "default_actor_alias")]
    pub actor_alias: String,
    /// Number of seeds listed by the catalog command
    #[serde(default = "default_catalog_size")]
    pub catalog_size: usize,
}

fn default_actor_alias() -> String {
    "anon".to_string()
}

fn default_catalog_size() -> usize {
    5
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            actor_alias: default_actor_alias(),
            catalog_size: default_catalog_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// File used by the on-disk vault store
    #[serde(default = "default_vault_path")]
    pub vault_path: PathBuf,
}

fn default_vault_path() -> PathBuf {
    data_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("vault.json")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            vault_path: default_vault_path(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, writing defaults if absent
    pub fn load() -> Result<Self> {
        let config_path = config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    /// Save configuration to an explicit file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path.parent()
            .context("Config path has no parent")?;

        std::fs::create_dir_all(parent)
            .context("Failed to create config directory")?;

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "seed-system", "seed-system")
        .context("Failed to get project directories")
}

/// Get the configuration directory
pub fn config_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().to_path_buf())
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Get the data directory
pub fn data_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.detector.semantic_backend, SemanticBackendKind::None);
        assert!((config.detector.threshold - 0.55).abs() < f32::EPSILON);
        assert_eq!(config.detector.cache_capacity, 256);
        assert_eq!(config.detector.prototypes.len(), 5);
        assert_eq!(config.engine.actor_alias, "anon");
        assert_eq!(config.engine.catalog_size, 5);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            "[detector]\nsemantic_backend = \"hash\"\n\n[engine]\nactor_alias = \"river\"\n",
        )
        .unwrap();
        assert_eq!(config.detector.semantic_backend, SemanticBackendKind::Hash);
        assert_eq!(config.detector.cache_capacity, 256);
        assert_eq!(config.engine.actor_alias, "river");
        assert_eq!(config.engine.catalog_size, 5);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.engine.actor_alias = "gardener".to_string();
        config.detector.threshold = 0.7;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.engine.actor_alias, "gardener");
        assert!((loaded.detector.threshold - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from(&dir.path().join("absent.toml")).is_err());
    }
}
