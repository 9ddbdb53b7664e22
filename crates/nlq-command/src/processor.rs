//! Command Processor: normalization, intent and entities in one pass

use nlq_core::{CommandPayload, Intent};
use serde::Serialize;
use serde_json::json;

use crate::document::SchemaDocument;
use crate::entities::{Entities, extract_entities};
use crate::intent::IntentClassifier;
use crate::normalize::normalize;

/// Everything the processor learned about one input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedCommand {
    pub raw_text: String,
    pub normalized_text: String,
    pub intent: Intent,
    pub intent_confidence: f32,
    pub entities: Entities,
    /// Mean of intent and entity confidence, halved when no entity was found.
    /// Unrelated to the reasoner's confidence.
    pub confidence: f32,
}

impl ProcessedCommand {
    /// Build a reasoner payload carrying the extracted entities as hints.
    pub fn into_payload(self, dialect: Option<&str>, allow_destructive: bool) -> CommandPayload {
        let mut payload = CommandPayload::new(self.intent.as_str(), self.raw_text)
            .with_normalized(self.normalized_text)
            .allow_destructive(allow_destructive)
            .with_context(
                "entities",
                serde_json::to_value(&self.entities).unwrap_or_default(),
            )
            .with_context("command_confidence", json!(self.confidence));

        if let Some(dialect) = dialect {
            payload = payload.with_dialect(dialect);
        }
        payload
    }
}

/// Classifies raw text against an optional schema document.
#[derive(Debug, Clone, Default)]
pub struct CommandProcessor {
    classifier: IntentClassifier,
    schema: Option<SchemaDocument>,
}

impl CommandProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classifier(mut self, classifier: IntentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_schema(mut self, schema: SchemaDocument) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Replace the schema from canonical text; blank text clears it.
    pub fn update_schema_text(&mut self, text: &str) {
        self.schema = (!text.trim().is_empty()).then(|| SchemaDocument::parse(text));
    }

    pub fn schema(&self) -> Option<&SchemaDocument> {
        self.schema.as_ref()
    }

    /// Table names from the loaded schema, in document order
    pub fn available_tables(&self) -> Vec<&str> {
        self.schema
            .as_ref()
            .map(SchemaDocument::table_names)
            .unwrap_or_default()
    }

    pub fn process(&self, raw: &str) -> ProcessedCommand {
        let normalized = normalize(raw);
        let (intent, intent_confidence) = self.classifier.classify(&normalized);
        let entities = extract_entities(raw, self.schema.as_ref());

        let mean = (intent_confidence + entities.confidence()) / 2.0;
        let confidence = if entities.is_empty() { mean / 2.0 } else { mean };

        tracing::debug!(
            intent = intent.as_str(),
            intent_confidence,
            tables = entities.tables.len(),
            conditions = entities.conditions.len(),
            confidence,
            "Processed command"
        );

        ProcessedCommand {
            raw_text: raw.to_string(),
            normalized_text: normalized,
            intent,
            intent_confidence,
            entities,
            confidence,
        }
    }
}
