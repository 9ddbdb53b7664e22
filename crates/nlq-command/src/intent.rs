//! Ordered intent rules

use nlq_core::Intent;
use once_cell::sync::Lazy;
use regex::Regex;

/// Weight of a pattern naming the SQL verb itself
pub const EXPLICIT_WEIGHT: f32 = 0.9;
/// Weight of a synonym pattern
pub const SYNONYM_WEIGHT: f32 = 0.7;
/// Confidence reported when no rule matches
pub const FALLBACK_CONFIDENCE: f32 = 0.3;

/// One intent and the weighted patterns that select it
#[derive(Debug, Clone)]
pub struct IntentRule {
    pub intent: Intent,
    pub patterns: Vec<(Regex, f32)>,
}

impl IntentRule {
    /// Best weight among the patterns that match, if any does.
    pub fn score(&self, text: &str) -> Option<f32> {
        self.patterns
            .iter()
            .filter(|(pattern, _)| pattern.is_match(text))
            .map(|(_, weight)| *weight)
            .reduce(f32::max)
    }
}

fn rule(intent: Intent, patterns: &[(&str, f32)]) -> IntentRule {
    IntentRule {
        intent,
        patterns: patterns
            .iter()
            .map(|(pattern, weight)| (Regex::new(pattern).expect("valid regex"), *weight))
            .collect(),
    }
}

static DEFAULT_RULES: Lazy<Vec<IntentRule>> = Lazy::new(|| {
    vec![
        rule(
            Intent::CreateTable,
            &[
                (r"\bcreate\s+(?:a\s+)?(?:new\s+)?table\b", EXPLICIT_WEIGHT),
                (r"\b(?:make|build|add|set\s+up)\s+(?:a\s+)?(?:new\s+)?table\b", SYNONYM_WEIGHT),
            ],
        ),
        rule(
            Intent::Alter,
            &[
                (r"\balter\s+table\b", EXPLICIT_WEIGHT),
                (r"\b(?:add|drop|remove|rename)\s+(?:a\s+|the\s+)?(?:new\s+)?column\b", SYNONYM_WEIGHT),
                (r"\brename\s+(?:the\s+)?table\b", SYNONYM_WEIGHT),
            ],
        ),
        rule(
            Intent::Delete,
            &[
                (r"\bdelete\b", EXPLICIT_WEIGHT),
                (r"\b(?:remove|erase|purge|truncate|drop|wipe)\b", SYNONYM_WEIGHT),
            ],
        ),
        rule(
            Intent::Update,
            &[
                (r"\bupdate\b", EXPLICIT_WEIGHT),
                (r"\b(?:change|modify|set|rename|increase|decrease|correct)\b", SYNONYM_WEIGHT),
            ],
        ),
        rule(
            Intent::Insert,
            &[
                (r"\binsert\b", EXPLICIT_WEIGHT),
                (r"\b(?:add|append|register|enroll)\b", SYNONYM_WEIGHT),
            ],
        ),
        rule(
            Intent::Select,
            &[
                (r"\bselect\b", EXPLICIT_WEIGHT),
                (
                    r"\b(?:show|list|display|find|get|fetch|count|how\s+many|which|what|who|give\s+me|search)\b",
                    SYNONYM_WEIGHT,
                ),
            ],
        ),
    ]
});

/// First matching rule wins; rules are tried in the order given.
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    rules: Vec<IntentRule>,
}

impl Default for IntentClassifier {
    /// Priority: create_table, alter, delete, update, insert, select.
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES.clone(),
        }
    }
}

impl IntentClassifier {
    pub fn new(rules: Vec<IntentRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[IntentRule] {
        &self.rules
    }

    /// Classify normalized text. Falls back to `other` at [`FALLBACK_CONFIDENCE`].
    pub fn classify(&self, normalized: &str) -> (Intent, f32) {
        self.rules
            .iter()
            .find_map(|rule| rule.score(normalized).map(|score| (rule.intent, score)))
            .unwrap_or((Intent::Other, FALLBACK_CONFIDENCE))
    }
}
