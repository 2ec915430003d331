//! Lexical avoidance rules
//!
//! Five case-insensitive patterns, one per avoidance category, evaluated in
//! a fixed order. The first category whose pattern matches anywhere in the
//! text wins.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Category of avoidance language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvoidanceCategory {
    /// "can't", "unable", "no way", "impossible"
    Inability,
    /// "out of my control", "nothing I can do"
    ExternalControl,
    /// "inevitable", "that's just how", "always been"
    Fatalism,
    /// "not my job", "someone else should", "they need to"
    Deflection,
    /// "too complex", "too complicated", "over my head"
    Overwhelm,
}

impl std::fmt::Display for AvoidanceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inability => write!(f, "inability"),
            Self::ExternalControl => write!(f, "external control"),
            Self::Fatalism => write!(f, "fatalism"),
            Self::Deflection => write!(f, "deflection"),
            Self::Overwhelm => write!(f, "overwhelm"),
        }
    }
}

/// Ordered avoidance patterns. Apostrophes accept both `'` and `’`.
static AVOIDANCE_PATTERNS: LazyLock<Vec<(Regex, AvoidanceCategory)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"(?i)\b(can(?:['’]t|not)|unable|no\s+way|impossible)\b").unwrap(), AvoidanceCategory::Inability),
        (Regex::new(r"(?i)\b(out\s+of\s+my\s+control|nothing\s+i\s+can\s+do)\b").unwrap(), AvoidanceCategory::ExternalControl),
        (Regex::new(r"(?i)\b(inevitable|that['’]s\s+just\s+how|always\s+been)\b").unwrap(), AvoidanceCategory::Fatalism),
        (Regex::new(r"(?i)\b(not\s+my\s+job|someone\s+else\s+should|they\s+need\s+to)\b").unwrap(), AvoidanceCategory::Deflection),
        (Regex::new(r"(?i)\b(too\s+complex|too\s+complicated|over\s+my\s+head)\b").unwrap(), AvoidanceCategory::Overwhelm),
    ]
});

/// A lexical rule hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexicalMatch {
    pub category: AvoidanceCategory,
    /// The matched span, as written in the input
    pub phrase: String,
}

/// Return the first matching rule, in category order
pub fn match_lexical(text: &str) -> Option<LexicalMatch> {
    if text.is_empty() {
        return None;
    }

    AVOIDANCE_PATTERNS.iter().find_map(|(pattern, category)| {
        pattern.find(text).map(|m| LexicalMatch {
            category: *category,
            phrase: m.as_str().to_string(),
        })
    })
}
