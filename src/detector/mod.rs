//! Avoidance Detector - flags helplessness, deflection and fatalism in text
//!
//! Detection is layered:
//! 1. Lexical rules ([`patterns`]) always run first and short-circuit.
//! 2. If none match and the detector was built with a semantic backend, the
//!    text is compared to avoidance prototypes by cosine similarity.
//!
//! Verdicts are memoized in a fixed-capacity LRU cache keyed by the exact
//! input text. The cache is guarded by a mutex so one detector can be shared
//! by every session in the process.

pub mod patterns;
pub mod semantic;

use lru::LruCache;
use once_cell::sync::Lazy;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::config::{DetectorConfig, SemanticBackendKind};

pub use patterns::{match_lexical, AvoidanceCategory, LexicalMatch};
pub use semantic::{cosine_similarity, Embedder, EmbedderFactory, HashEmbedder, SemanticBackend};

/// Outcome of classifying a text
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// No avoidance language found
    Clear,
    /// A lexical rule matched
    Lexical(AvoidanceCategory),
    /// Semantic similarity reached the threshold
    Semantic { score: f32 },
}

impl Verdict {
    pub fn is_avoidance(&self) -> bool {
        !matches!(self, Verdict::Clear)
    }
}

/// Detector capability, fixed at construction
#[derive(Debug)]
pub enum DetectorMode {
    LexicalOnly,
    Semantic(SemanticBackend),
}

/// Process-wide detector built from the default configuration
static SHARED_DETECTOR: Lazy<Arc<AvoidanceDetector>> =
    Lazy::new(|| Arc::new(AvoidanceDetector::from_config(&DetectorConfig::default())));

/// Layered avoidance classifier with a shared verdict cache
#[derive(Debug)]
pub struct AvoidanceDetector {
    mode: DetectorMode,
    cache: Mutex<LruCache<String, Verdict>>,
}

impl AvoidanceDetector {
    /// Lexical rules only
    pub fn lexical(cache_capacity: usize) -> Self {
        Self::with_mode(DetectorMode::LexicalOnly, cache_capacity)
    }

    /// Lexical rules with a semantic fallback
    pub fn semantic(backend: SemanticBackend, cache_capacity: usize) -> Self {
        Self::with_mode(DetectorMode::Semantic(backend), cache_capacity)
    }

    pub fn with_mode(mode: DetectorMode, cache_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            mode,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Build a detector from configuration
    pub fn from_config(config: &DetectorConfig) -> Self {
        let mode = match config.semantic_backend {
            SemanticBackendKind::None => DetectorMode::LexicalOnly,
            SemanticBackendKind::Hash => DetectorMode::Semantic(SemanticBackend::hash(
                config.prototypes.clone(),
                config.threshold,
            )),
        };
        Self::with_mode(mode, config.cache_capacity)
    }

    /// The detector shared by every engine that does not bring its own
    pub fn shared() -> Arc<AvoidanceDetector> {
        SHARED_DETECTOR.clone()
    }

    pub fn mode(&self) -> &DetectorMode {
        &self.mode
    }

    /// Whether a semantic fallback was configured
    pub fn has_semantic(&self) -> bool {
        matches!(self.mode, DetectorMode::Semantic(_))
    }

    /// Whether `text` contains avoidance language
    pub fn detect(&self, text: &str) -> bool {
        self.classify(text).is_avoidance()
    }

    /// Classify `text`, consulting the cache first
    pub fn classify(&self, text: &str) -> Verdict {
        if let Some(verdict) = self.cached(text) {
            debug!("Avoidance cache hit: {:?}", verdict);
            return verdict;
        }

        match self.evaluate(text) {
            Some(verdict) => {
                self.remember(text, verdict);
                verdict
            }
            // Semantic encoding failed for this call; do not cache the fallback
            None => Verdict::Clear,
        }
    }

    /// Run the rules. `None` means the semantic step failed transiently.
    fn evaluate(&self, text: &str) -> Option<Verdict> {
        if let Some(hit) = match_lexical(text) {
            debug!("Lexical avoidance match ({}): {:?}", hit.category, hit.phrase);
            return Some(Verdict::Lexical(hit.category));
        }

        let backend = match &self.mode {
            DetectorMode::LexicalOnly => return Some(Verdict::Clear),
            DetectorMode::Semantic(backend) => backend,
        };

        if text.trim().is_empty() {
            return Some(Verdict::Clear);
        }

        let score = backend.max_similarity(text);
        match score {
            Some(score) if score >= backend.threshold() => Some(Verdict::Semantic { score }),
            Some(_) => Some(Verdict::Clear),
            None if backend.is_ready() => None,
            // Backend never came up; lexical-only from here on
            None => Some(Verdict::Clear),
        }
    }

    fn cached(&self, text: &str) -> Option<Verdict> {
        match self.cache.lock() {
            Ok(mut cache) => cache.get(text).copied(),
            Err(_) => {
                warn!("Avoidance cache lock poisoned, skipping lookup");
                None
            }
        }
    }

    fn remember(&self, text: &str, verdict: Verdict) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(text.to_string(), verdict);
        }
    }

    /// Number of cached verdicts
    pub fn cache_len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Maximum number of cached verdicts
    pub fn cache_capacity(&self) -> usize {
        self.cache.lock().map(|c| c.cap().get()).unwrap_or(0)
    }

    /// Drop every cached verdict
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }
}
