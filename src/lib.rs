//! Seed System - reflective prompts from avoidance language
//!
//! - Avoidance detection with lexical rules and an optional semantic fallback
//! - Seed generation from flagged phrases
//! - Lineage-tracked seed vault with lossless JSON snapshots
//! - Version-checked persistence through a pluggable store
//!
//! # Example
//!
//! ```ignore
//! use seed_system::{ReflectiveEngine, MemoryStore, VaultSession, AvoidanceDetector};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut session = VaultSession::open(MemoryStore::new(), "anon", AvoidanceDetector::shared()).await?;
//!     println!("{}", session.exchange("/seed \"Nothing ever changes\"").await?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod detector;
pub mod seed;
pub mod engine;
pub mod persistence;
pub mod session;

pub use config::Config;

pub use detector::{
    AvoidanceCategory,
    AvoidanceDetector,
    DetectorMode,
    Embedder,
    HashEmbedder,
    SemanticBackend,
    Verdict,
};

pub use seed::{
    Seed,
    SeedGenerator,
    SeedVault,
    VaultError,
    VaultSnapshot,
};

pub use engine::ReflectiveEngine;

pub use persistence::{
    FileStore,
    Loaded,
    MemoryStore,
    PersistenceError,
    VaultStore,
    VersionToken,
};

pub use session::VaultSession;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Install a `tracing` subscriber filtered by `RUST_LOG` (WARN by default).
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into())
        )
        .try_init();
}

/// Get the library info
pub fn info() -> String {
    format!("{} v{} - Reflective Seed Library", NAME, VERSION)
}
