//! Seeds - reflective prompts minted from avoidance phrases
//!
//! A [`Seed`] carries immutable content and provenance (parent, planter,
//! timestamp, carbon annotation) plus a burial flag. Seeds are created and
//! owned by a [`SeedVault`], which assigns ids and tracks lineage.

pub mod generator;
pub mod vault;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use generator::SeedGenerator;
pub use vault::{SeedVault, VaultError, VaultSnapshot};

/// Parent sentinel for seeds at the top of a lineage tree
pub const ROOT_PARENT: &str = "ROOT";

/// Id of the bootstrap seed planted in every fresh vault
pub const ROOT_SEED_ID: &str = "SEED-0001";

/// Phrase the bootstrap seed is generated from
pub const BOOTSTRAP_PHRASE: &str = "This is out of my control";

/// Prefix shared by every minted id
pub const SEED_ID_PREFIX: &str = "SEED-";

/// Synthetic kg CO2e per character of content
const CARBON_PER_CHAR: f64 = 2e-5;

/// A single reflective prompt with provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seed {
    pub id: String,
    pub content: String,
    pub parent: String,
    pub planter: String,
    /// Synthetic carbon cost in kg CO2e, derived from content length
    pub carbon: f64,
    pub stamp: DateTime<Utc>,
    pub buried: bool,
    pub burial_reason: Option<String>,
}

impl Seed {
    pub(crate) fn new(id: String, content: String, parent: &str, planter: &str) -> Self {
        let carbon = carbon_cost(&content);
        Self {
            id,
            content,
            parent: parent.to_string(),
            planter: planter.to_string(),
            carbon,
            stamp: Utc::now(),
            buried: false,
            burial_reason: None,
        }
    }

    /// Mark the seed as archived
    pub fn bury(&mut self, reason: impl Into<String>) {
        self.buried = true;
        self.burial_reason = Some(reason.into());
    }

    /// Whether the seed sits directly under the root sentinel
    pub fn is_root(&self) -> bool {
        self.parent == ROOT_PARENT
    }

    /// Human readable rendering: header, indented content, carbon line
    pub fn render(&self) -> String {
        let header = format!(
            "**{}** (by {}, {})",
            self.id,
            self.planter,
            self.stamp.date_naive()
        );
        format!("{}\n{}\n{}", header, indent(&self.content, 2), format_carbon(self.carbon))
    }
}

impl std::fmt::Display for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// Synthetic carbon cost for a piece of content, rounded to 4 decimals
pub fn carbon_cost(content: &str) -> f64 {
    let raw = content.chars().count() as f64 * CARBON_PER_CHAR;
    (raw * 10_000.0).round() / 10_000.0
}

/// Display form of a carbon cost
pub fn format_carbon(carbon: f64) -> String {
    format!("₡ {:.4} kg CO₂e", carbon)
}

/// Numeric suffix of a minted id (`SEED-0042` -> 42)
pub fn id_suffix(id: &str) -> Option<u64> {
    id.strip_prefix(SEED_ID_PREFIX)?.parse().ok()
}

/// Id for a counter value
pub fn format_id(counter: u64) -> String {
    format!("{}{:04}", SEED_ID_PREFIX, counter)
}

/// Prefix every non-blank line with `width` spaces, keeping line endings
fn indent(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.split_inclusive('\n')
        .map(|line| {
            if line.trim().is_empty() {
                line.to_string()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Seed {
        let mut seed = Seed::new(
            "SEED-0007".to_string(),
            "Who profits if we accept 'x' as inevitable?".to_string(),
            ROOT_SEED_ID,
            "maya",
        );
        seed.stamp = Utc.with_ymd_and_hms(2025, 7, 30, 12, 0, 0).unwrap();
        seed
    }

    #[test]
    fn test_carbon_cost() {
        assert_eq!(carbon_cost(""), 0.0);
        assert_eq!(carbon_cost(&"a".repeat(50)), 0.001);
        // 7 chars * 2e-5 = 0.00014 -> 0.0001
        assert_eq!(carbon_cost("abcdefg"), 0.0001);
        // counts characters, not bytes
        assert_eq!(carbon_cost(&"é".repeat(50)), 0.001);
    }

    #[test]
    fn test_format_carbon() {
        assert_eq!(format_carbon(0.0012), "₡ 0.0012 kg CO₂e");
        assert_eq!(format_carbon(0.0), "₡ 0.0000 kg CO₂e");
    }

    #[test]
    fn test_ids() {
        assert_eq!(format_id(2), "SEED-0002");
        assert_eq!(format_id(12345), "SEED-12345");
        assert_eq!(id_suffix("SEED-0042"), Some(42));
        assert_eq!(id_suffix("SEED-12345"), Some(12345));
        assert_eq!(id_suffix("ROOT"), None);
        assert_eq!(id_suffix("SEED-abc"), None);
    }

    #[test]
    fn test_render() {
        let seed = sample();
        assert_eq!(
            seed.render(),
            "**SEED-0007** (by maya, 2025-07-30)\n  Who profits if we accept 'x' as inevitable?\n₡ 0.0009 kg CO₂e"
        );
        assert_eq!(seed.to_string(), seed.render());
    }

    #[test]
    fn test_indent_multiline() {
        assert_eq!(indent("a\n\nb", 2), "  a\n\n  b");
        assert_eq!(indent("a\n", 2), "  a\n");
    }

    #[test]
    fn test_bury_sets_flag_and_reason() {
        let mut seed = sample();
        assert!(!seed.buried);
        seed.bury("resolved in workshop");
        assert!(seed.buried);
        assert_eq!(seed.burial_reason.as_deref(), Some("resolved in workshop"));
        assert_eq!(seed.content, sample().content);
    }
}
