//! Seed Generator - turns a flagged phrase into a reflective question

use rand::seq::IndexedRandom;
use rand::Rng;

/// Placeholder replaced by the phrase in every template
const PLACEHOLDER: &str = "{p}";

/// Templated transform from an avoidance phrase to a probing question
pub struct SeedGenerator;

impl SeedGenerator {
    /// Question templates: systemic dependency, hidden costs, beneficiaries,
    /// unexplored choices.
    pub const TEMPLATES: [&'static str; 4] = [
        "When you say '{p}' — what systems depend on that belief?",
        "'{p}' -> what suffering becomes invisible in this framing?",
        "Who profits if we accept '{p}' as inevitable?",
        "If '{p}' ended the conversation, what choice stays unopened?",
    ];

    /// Pick a template uniformly at random and substitute `phrase` verbatim
    pub fn transform(phrase: &str) -> String {
        Self::transform_with(phrase, &mut rand::rng())
    }

    /// Same as [`transform`](Self::transform) with a caller-supplied RNG
    pub fn transform_with<R: Rng + ?Sized>(phrase: &str, rng: &mut R) -> String {
        let template = Self::TEMPLATES
            .choose(rng)
            .copied()
            .unwrap_or(Self::TEMPLATES[0]);
        Self::render(template, phrase)
    }

    /// Substitute `phrase` into one template
    pub fn render(template: &str, phrase: &str) -> String {
        template.replacen(PLACEHOLDER, phrase, 1)
    }

    /// Index of the template that produced `content` from `phrase`, if any
    pub fn template_index(content: &str, phrase: &str) -> Option<usize> {
        Self::TEMPLATES
            .iter()
            .position(|template| Self::render(template, phrase) == content)
    }

    /// Whether `content` is one of the templates with `phrase` substituted
    pub fn matches_template(content: &str, phrase: &str) -> bool {
        Self::template_index(content, phrase).is_some()
    }
}
