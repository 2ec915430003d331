//! Reflective Engine - turns chat messages into seeds
//!
//! Plain messages are screened by the [`AvoidanceDetector`]; flagged ones get
//! a suggestion to plant a seed. Slash commands plant seeds and list the
//! catalog. The engine never persists anything itself.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::detector::AvoidanceDetector;
use crate::seed::{SeedVault, VaultSnapshot, ROOT_SEED_ID};

/// Prefix marking a message as a command
pub const COMMAND_PREFIX: char = '/';

/// Plant a new seed from a quoted phrase
pub const SEED_COMMAND: &str = "/seed";

/// List the most recent seeds
pub const CATALOG_COMMAND: &str = "/seedcatalog";

const SEED_USAGE: &str = "Usage: /seed \"phrase\"";
const NO_SEEDS: &str = "No seeds";
const CONTINUE_PROMPT: &str = "Let’s keep exploring—tell me more.";

/// Per-session orchestrator over one vault
#[derive(Debug)]
pub struct ReflectiveEngine {
    vault: SeedVault,
    actor: String,
    detector: Arc<AvoidanceDetector>,
    catalog_size: usize,
}

impl ReflectiveEngine {
    /// Fresh engine using the process-wide detector
    pub fn new(actor: &str) -> Self {
        Self::with_detector(actor, AvoidanceDetector::shared())
    }

    /// Fresh engine with its own detector
    pub fn with_detector(actor: &str, detector: Arc<AvoidanceDetector>) -> Self {
        Self::from_vault(SeedVault::bootstrap(actor), actor, detector)
    }

    /// Engine over a restored vault
    pub fn from_vault(vault: SeedVault, actor: &str, detector: Arc<AvoidanceDetector>) -> Self {
        Self {
            vault,
            actor: actor.to_string(),
            detector,
            catalog_size: EngineConfig::default().catalog_size,
        }
    }

    /// Fresh engine configured from [`EngineConfig`]
    pub fn from_config(config: &EngineConfig, detector: Arc<AvoidanceDetector>) -> Self {
        Self::with_detector(&config.actor_alias, detector).with_catalog_size(config.catalog_size)
    }

    pub fn with_catalog_size(mut self, catalog_size: usize) -> Self {
        self.catalog_size = catalog_size;
        self
    }

    pub fn vault(&self) -> &SeedVault {
        &self.vault
    }

    pub fn vault_mut(&mut self) -> &mut SeedVault {
        &mut self.vault
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn detector(&self) -> &Arc<AvoidanceDetector> {
        &self.detector
    }

    /// Current vault state in its persisted layout
    pub fn snapshot(&self) -> VaultSnapshot {
        self.vault.snapshot()
    }

    /// Respond to one user message
    pub fn handle(&mut self, message: &str) -> String {
        if message.starts_with(COMMAND_PREFIX) {
            return self.handle_command(message);
        }

        if self.detector.detect(message) {
            debug!("Avoidance detected, suggesting a seed");
            format!("Please consider using {} \"{}\"", SEED_COMMAND, message.trim())
        } else {
            CONTINUE_PROMPT.to_string()
        }
    }

    fn handle_command(&mut self, input: &str) -> String {
        let (verb, rest) = match input.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (input, ""),
        };

        match verb {
            SEED_COMMAND => self.plant(rest),
            CATALOG_COMMAND => self.catalog(),
            _ => format!("Unknown command: {}", verb),
        }
    }

    fn plant(&mut self, argument: &str) -> String {
        let phrase = argument.trim_matches(|c: char| c == '"' || c == '\'');
        if phrase.trim().is_empty() {
            return SEED_USAGE.to_string();
        }

        match self.vault.new_seed(phrase, ROOT_SEED_ID, &self.actor) {
            Ok(seed) => seed.render(),
            Err(e) => {
                warn!("Could not plant seed: {}", e);
                format!("Could not plant seed: {}", e)
            }
        }
    }

    fn catalog(&self) -> String {
        let seeds = self.vault.recent(self.catalog_size);
        if seeds.is_empty() {
            return NO_SEEDS.to_string();
        }

        seeds
            .iter()
            .map(|seed| seed.render())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::{SeedGenerator, BOOTSTRAP_PHRASE};

    fn engine() -> ReflectiveEngine {
        ReflectiveEngine::with_detector("maya", Arc::new(AvoidanceDetector::lexical(32)))
    }

    #[test]
    fn test_starts_with_bootstrap_seed() {
        let engine = engine();
        let root = engine.vault().get(ROOT_SEED_ID).unwrap();
        assert_eq!(root.planter, "maya");
        assert!(SeedGenerator::matches_template(&root.content, BOOTSTRAP_PHRASE));
        // the bootstrap phrase is itself avoidance language
        assert!(engine.detector().detect(BOOTSTRAP_PHRASE));
    }

    #[test]
    fn test_flagged_message_gets_suggestion() {
        let mut engine = engine();
        assert_eq!(
            engine.handle("  It's not my job  "),
            "Please consider using /seed \"It's not my job\""
        );
    }

    #[test]
    fn test_plain_message_gets_continuation() {
        let mut engine = engine();
        assert_eq!(engine.handle("I started composting"), CONTINUE_PROMPT);
        assert_eq!(engine.handle(""), CONTINUE_PROMPT);
        // no seeds planted by plain chat
        assert_eq!(engine.vault().counter(), 1);
    }

    #[test]
    fn test_seed_command() {
        let mut engine = engine();
        let response = engine.handle("/seed \"Nothing ever changes\"");

        let mut lines = response.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("**SEED-0002** (by maya, "));
        let content = lines.next().unwrap();
        assert!(SeedGenerator::matches_template(content.trim_start(), "Nothing ever changes"));
        assert!(lines.next().unwrap().starts_with("₡ "));

        let seed = engine.vault().get("SEED-0002").unwrap();
        assert_eq!(seed.parent, ROOT_SEED_ID);
        assert_eq!(seed.planter, "maya");
    }

    #[test]
    fn test_seed_command_strips_quotes_and_whitespace() {
        let mut engine = engine();
        engine.handle("/seed   'They need to fix it'  ");
        let seed = engine.vault().get("SEED-0002").unwrap();
        assert!(SeedGenerator::matches_template(&seed.content, "They need to fix it"));

        engine.handle("/seed unquoted words");
        let seed = engine.vault().get("SEED-0003").unwrap();
        assert!(SeedGenerator::matches_template(&seed.content, "unquoted words"));
    }

    #[test]
    fn test_seed_command_usage() {
        let mut engine = engine();
        assert_eq!(engine.handle("/seed"), SEED_USAGE);
        assert_eq!(engine.handle("/seed   "), SEED_USAGE);
        assert_eq!(engine.handle("/seed \"\""), SEED_USAGE);
        assert_eq!(engine.vault().counter(), 1);
    }

    #[test]
    fn test_seed_command_reports_exhausted_counter() {
        let vault = SeedVault::from_json(&serde_json::json!({"live": {}, "counter": u64::MAX}));
        let mut engine = ReflectiveEngine::from_vault(vault, "maya", Arc::new(AvoidanceDetector::lexical(4)));

        let reply = engine.handle("/seed \"x\"");
        assert!(reply.starts_with("Could not plant seed:"), "unexpected reply {:?}", reply);
        assert!(engine.vault().is_empty());
        assert_eq!(engine.vault().counter(), u64::MAX);
    }

    #[test]
    fn test_catalog() {
        let mut engine = engine();
        let single = engine.handle("/seedcatalog");
        assert!(single.starts_with("**SEED-0001**"));
        assert!(!single.contains("\n\n"));

        for i in 0..6 {
            engine.handle(&format!("/seed \"phrase {}\"", i));
        }
        let catalog = engine.handle("/seedcatalog");
        assert_eq!(catalog.split("\n\n").count(), 5);
    }

    #[test]
    fn test_catalog_empty_vault() {
        let vault = SeedVault::from_json(&serde_json::json!({}));
        let mut engine = ReflectiveEngine::from_vault(vault, "maya", Arc::new(AvoidanceDetector::lexical(4)));
        assert_eq!(engine.handle("/seedcatalog"), NO_SEEDS);
    }

    #[test]
    fn test_catalog_size_from_config() {
        let config = EngineConfig {
            actor_alias: "river".to_string(),
            catalog_size: 2,
        };
        let mut engine = ReflectiveEngine::from_config(&config, Arc::new(AvoidanceDetector::lexical(4)));
        assert_eq!(engine.actor(), "river");
        for i in 0..3 {
            engine.handle(&format!("/seed p{}", i));
        }
        assert_eq!(engine.handle("/seedcatalog").split("\n\n").count(), 2);
    }

    #[test]
    fn test_unknown_command() {
        let mut engine = engine();
        assert_eq!(engine.handle("/unknowncmd"), "Unknown command: /unknowncmd");
        assert_eq!(engine.handle("/Seed \"x\""), "Unknown command: /Seed");
        assert_eq!(engine.handle("/seedling x"), "Unknown command: /seedling");
        assert_eq!(engine.handle("/"), "Unknown command: /");
    }
}
