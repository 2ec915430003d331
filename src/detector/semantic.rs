//! Semantic similarity fallback
//!
//! Encodes text with an [`Embedder`] and compares it to a fixed set of
//! avoidance prototypes by cosine similarity. The embedder is a heavyweight
//! resource: it is built lazily on first use, exactly once, and reused for
//! the lifetime of the backend.

use anyhow::Result;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Text encoder used by the semantic fallback
#[cfg_attr(test, mockall::automock)]
pub trait Embedder: Send + Sync {
    /// Encode a single text into a vector
    fn encode(&self, text: &str) -> Result<Vec<f32>>;

    /// Human readable model name
    fn name(&self) -> String;
}

/// Deterministic bag-of-words embedding built from token hashes.
///
/// Needs no model download. Quality is far below a trained sentence model,
/// but texts that share vocabulary score close to each other.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

impl Embedder for HashEmbedder {
    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut embedding = vec![0.0f32; self.dim];

        let tokens = text
            .split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '’'))
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase());

        for token in tokens {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let hash = hasher.finish();

            for (j, slot) in embedding.iter_mut().enumerate() {
                let mut hasher = DefaultHasher::new();
                hash.hash(&mut hasher);
                (j as u64).hash(&mut hasher);
                let val = hasher.finish();
                let normalized = (val as f64 / u64::MAX as f64) * 2.0 - 1.0;
                *slot += normalized as f32;
            }
        }

        let mag: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if mag > 0.0 {
            for val in embedding.iter_mut() {
                *val /= mag;
            }
        }

        Ok(embedding)
    }

    fn name(&self) -> String {
        format!("hash-bow-{}", self.dim)
    }
}

/// Calculate cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}

/// Builds the embedder on first use
pub type EmbedderFactory = Box<dyn Fn() -> Result<Arc<dyn Embedder>> + Send + Sync>;

struct LoadedBackend {
    embedder: Arc<dyn Embedder>,
    prototype_vecs: Vec<Vec<f32>>,
}

/// Lazily-initialized semantic backend shared by every caller of a detector
pub struct SemanticBackend {
    factory: EmbedderFactory,
    prototypes: Vec<String>,
    threshold: f32,
    /// `Some(None)` once initialization has been attempted and failed
    loaded: OnceCell<Option<LoadedBackend>>,
}

impl std::fmt::Debug for SemanticBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticBackend")
            .field("prototypes", &self.prototypes)
            .field("threshold", &self.threshold)
            .field("initialized", &self.loaded.get().is_some())
            .finish()
    }
}

impl SemanticBackend {
    /// Create a backend from an embedder factory
    pub fn new<F>(factory: F, prototypes: Vec<String>, threshold: f32) -> Self
    where
        F: Fn() -> Result<Arc<dyn Embedder>> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            prototypes,
            threshold,
            loaded: OnceCell::new(),
        }
    }

    /// Backend using the built-in [`HashEmbedder`]
    pub fn hash(prototypes: Vec<String>, threshold: f32) -> Self {
        Self::new(
            || Ok(Arc::new(HashEmbedder::default()) as Arc<dyn Embedder>),
            prototypes,
            threshold,
        )
    }

    /// Backend wrapping an already constructed embedder
    pub fn with_embedder(embedder: Arc<dyn Embedder>, prototypes: Vec<String>, threshold: f32) -> Self {
        Self::new(move || Ok(embedder.clone()), prototypes, threshold)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Whether the embedder has been built successfully
    pub fn is_ready(&self) -> bool {
        matches!(self.loaded.get(), Some(Some(_)))
    }

    fn loaded(&self) -> Option<&LoadedBackend> {
        // OnceCell blocks concurrent first callers, so the factory runs at most once
        self.loaded.get_or_init(|| self.initialize()).as_ref()
    }

    fn initialize(&self) -> Option<LoadedBackend> {
        let embedder = match (self.factory)() {
            Ok(embedder) => embedder,
            Err(e) => {
                warn!("Semantic backend unavailable, using lexical rules only: {:#}", e);
                return None;
            }
        };

        let mut prototype_vecs = Vec::with_capacity(self.prototypes.len());
        for prototype in &self.prototypes {
            match embedder.encode(prototype) {
                Ok(vec) => prototype_vecs.push(vec),
                Err(e) => {
                    warn!("Failed to encode avoidance prototypes, using lexical rules only: {:#}", e);
                    return None;
                }
            }
        }

        info!(
            "Semantic backend ready: {} ({} prototypes, threshold {})",
            embedder.name(),
            prototype_vecs.len(),
            self.threshold
        );

        Some(LoadedBackend {
            embedder,
            prototype_vecs,
        })
    }

    /// Highest cosine similarity between `text` and any prototype.
    ///
    /// Returns `None` when the backend is unavailable or encoding fails.
    pub fn max_similarity(&self, text: &str) -> Option<f32> {
        let backend = self.loaded()?;

        let query = match backend.embedder.encode(text) {
            Ok(vec) => vec,
            Err(e) => {
                warn!("Failed to encode text for semantic check: {:#}", e);
                return None;
            }
        };

        let score = backend
            .prototype_vecs
            .iter()
            .map(|proto| cosine_similarity(&query, proto))
            .fold(f32::NEG_INFINITY, f32::max);

        if score.is_finite() {
            debug!("Semantic similarity {:.3} for {:?}", score, text);
            Some(score)
        } else {
            None
        }
    }
}
