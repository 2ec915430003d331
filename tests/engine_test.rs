//! End-to-end behaviour of the detector, generator, vault and engine

use seed_system::detector::patterns::match_lexical;
use seed_system::seed::{id_suffix, ROOT_SEED_ID};
use seed_system::{AvoidanceDetector, ReflectiveEngine, SeedGenerator, SeedVault};
use std::sync::Arc;

const AVOIDANT: &[&str] = &[
    "I can't change anything",
    "There's no way this works",
    "It's impossible to fix",
    "This is out of my control",
    "There's nothing I can do about this",
    "Collapse is inevitable",
    "That's just how the world works",
    "It has always been like this",
    "Honestly that's not my job",
    "Someone else should handle it",
    "They need to fix it first",
    "It's too complicated for me",
    "Carbon markets are over my head",
];

const NEUTRAL: &[&str] = &[
    "",
    "I planted tomatoes today",
    "Let's start a repair cafe",
    "My neighbours and I share a car",
];

#[test]
fn lexical_patterns_win_with_or_without_semantic_backend() {
    let lexical = AvoidanceDetector::lexical(64);
    let semantic = AvoidanceDetector::semantic(
        seed_system::SemanticBackend::hash(seed_system::config::DetectorConfig::default().prototypes, 0.99),
        64,
    );

    for text in AVOIDANT {
        assert!(match_lexical(text).is_some(), "pattern should match {:?}", text);
        assert!(lexical.detect(text), "lexical detector missed {:?}", text);
        assert!(semantic.detect(text), "semantic detector missed {:?}", text);
    }
}

#[test]
fn lexical_only_detector_clears_neutral_text() {
    let detector = AvoidanceDetector::lexical(64);
    for text in NEUTRAL {
        assert!(!detector.detect(text), "false positive on {:?}", text);
    }
}

#[test]
fn detection_is_idempotent() {
    let detector = AvoidanceDetector::lexical(4);
    for text in AVOIDANT.iter().chain(NEUTRAL) {
        let first = detector.classify(text);
        let second = detector.classify(text);
        assert_eq!(first, second);
    }
}

#[test]
fn shared_detector_serves_many_engines() {
    let mut a = ReflectiveEngine::new("a");
    let mut b = ReflectiveEngine::new("b");
    assert!(Arc::ptr_eq(a.detector(), b.detector()));
    assert!(a.handle("It's not my job").starts_with("Please consider using /seed"));
    assert!(b.handle("It's not my job").starts_with("Please consider using /seed"));
}

#[test]
fn generator_substitutes_phrase_verbatim() {
    for phrase in ["Nothing ever changes", "  padded  ", "with 'quotes'", "многоязычный"] {
        let content = SeedGenerator::transform(phrase);
        let matches = SeedGenerator::TEMPLATES
            .iter()
            .filter(|t| SeedGenerator::render(t, phrase) == content)
            .count();
        assert!(matches >= 1, "{:?} is not a template rendering", content);
    }
}

#[test]
fn empty_vault_catalog_is_root_seed() {
    let vault = SeedVault::new();
    let recent = vault.recent(5);
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].id, ROOT_SEED_ID);
}

#[test]
fn seed_command_on_fresh_engine() {
    let mut engine = ReflectiveEngine::with_detector("maya", Arc::new(AvoidanceDetector::lexical(8)));
    let response = engine.handle("/seed \"Nothing ever changes\"");

    assert!(response.contains("SEED-0002"));
    assert!(response.contains("(by maya, "));
    let rendered = SeedGenerator::TEMPLATES
        .iter()
        .any(|t| response.contains(&SeedGenerator::render(t, "Nothing ever changes")));
    assert!(rendered, "unexpected response {:?}", response);
}

#[test]
fn unknown_command_is_reported() {
    let mut engine = ReflectiveEngine::with_detector("maya", Arc::new(AvoidanceDetector::lexical(8)));
    assert_eq!(engine.handle("/unknowncmd"), "Unknown command: /unknowncmd");
}

#[test]
fn ids_strictly_increase_across_reloads() {
    let mut engine = ReflectiveEngine::with_detector("maya", Arc::new(AvoidanceDetector::lexical(8)));
    let mut minted = Vec::new();

    for round in 0..3 {
        for i in 0..4 {
            engine.handle(&format!("/seed \"round {} seed {}\"", round, i));
        }
        minted.extend(engine.vault().live().keys().filter_map(|id| id_suffix(id)));

        // bury one seed per round so restores see both mappings
        let newest = engine.vault().recent(1)[0].id.clone();
        engine.vault_mut().bury(&newest, "answered").unwrap();

        let json = engine.vault().to_json().unwrap();
        let restored = SeedVault::from_json(&json);
        assert_eq!(&restored, engine.vault());
        assert!(restored.counter() >= engine.vault().counter());
        engine = ReflectiveEngine::from_vault(restored, "maya", engine.detector().clone());
    }

    minted.sort_unstable();
    minted.dedup();
    let all: Vec<u64> = engine
        .vault()
        .live()
        .keys()
        .chain(engine.vault().buried().keys())
        .filter_map(|id| id_suffix(id))
        .collect();
    assert_eq!(all.len(), 13);
    assert_eq!(engine.vault().counter(), 13);
    assert_eq!(*minted.last().unwrap(), 13);
}
