//! The Reasoning Core: prompt, backend call, parse, validate, gate

use nlq_core::{
    BLOCKED_DESTRUCTIVE_ERROR, BLOCKED_DESTRUCTIVE_WARNING, CommandPayload, Dialect, Intent,
    NlqConfig, ReasonerConfig, ReasonerOutput, Result,
};
use nlq_model::{LanguageModel, ModelFactory};
use nlq_telemetry::{ReasoningSpanAttributes, trace_reasoning_call};
use std::sync::Arc;
use std::time::Duration;

use crate::gate::{decide, output_confidence};
use crate::offline::RuleBasedModel;
use crate::prompt::PromptBuilder;
use crate::response::parse_reply;
use crate::validator::{SqlValidator, Validation};

pub const NO_SQL_RETURNED: &str = "No SQL returned";
pub const VALIDATION_FAILED: &str = "SQL parse/validation failed";
pub const CLARIFICATION_WARNING: &str =
    "Clarification required: the request is ambiguous for this schema";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Turns command payloads into validated, gated SQL candidates.
///
/// Holds the active schema text, so one instance belongs to one session.
/// A caller that shares an instance must hold a lock across
/// [`update_schema`](Self::update_schema) and the following
/// [`generate`](Self::generate).
pub struct Reasoner {
    schema_text: String,
    backend: Option<Arc<dyn LanguageModel>>,
    offline: RuleBasedModel,
    prompts: PromptBuilder,
    validator: SqlValidator,
    default_dialect: String,
    request_timeout: Duration,
    snippet_chars: usize,
}

impl Reasoner {
    /// An offline reasoner with the given settings
    pub fn new(config: &ReasonerConfig) -> Self {
        Self {
            schema_text: String::new(),
            backend: None,
            offline: RuleBasedModel::new(),
            prompts: PromptBuilder::new(config.max_schema_prompt_chars),
            validator: SqlValidator::default(),
            default_dialect: config.default_dialect.trim().to_lowercase(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            snippet_chars: config.error_snippet_chars,
        }
    }

    /// Build a reasoner with the backend the configuration selects.
    pub fn from_config(config: &NlqConfig) -> Result<Self> {
        let backend = ModelFactory::from_config(&config.model)?;
        let mut reasoner = Self::new(&config.reasoner)
            .with_timeout(Duration::from_secs(config.model.request_timeout_secs.max(1)));

        if let Some(backend) = backend {
            reasoner = reasoner.with_backend(backend);
        }

        tracing::info!(
            backend = %reasoner.backend_label(),
            dialect = %reasoner.default_dialect,
            "Reasoner ready"
        );
        Ok(reasoner)
    }

    pub fn with_backend(mut self, backend: Arc<dyn LanguageModel>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_validator(mut self, validator: SqlValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Replace the active schema text.
    pub fn update_schema(&mut self, schema_text: impl Into<String>) {
        self.schema_text = schema_text.into();
        tracing::debug!(schema_chars = self.schema_text.len(), "Schema text updated");
    }

    pub fn schema_text(&self) -> &str {
        &self.schema_text
    }

    pub fn default_dialect(&self) -> &str {
        &self.default_dialect
    }

    /// `offline`, or `<provider>:<model>` for a remote backend
    pub fn backend_label(&self) -> String {
        self.active_backend().label()
    }

    pub fn is_offline(&self) -> bool {
        self.backend.is_none()
    }

    fn active_backend(&self) -> &dyn LanguageModel {
        match &self.backend {
            Some(backend) => backend.as_ref(),
            None => &self.offline,
        }
    }

    /// Produce a gated SQL candidate for one request.
    ///
    /// Never fails: backend and parse problems come back as an output with
    /// `errors` populated, no SQL, zero confidence and `safe_to_execute` false.
    pub async fn generate(&self, payload: &CommandPayload) -> ReasonerOutput {
        let request_id = uuid::Uuid::new_v4().to_string();
        let dialect = payload
            .dialect
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(&self.default_dialect)
            .to_lowercase();
        // The caller's hint is echoed verbatim when the backend names no intent.
        let fallback_intent = match payload.intent.trim() {
            "" => Intent::Select.as_str(),
            hint => hint,
        };

        let backend = self.active_backend();
        let label = backend.label();
        let prompt = self
            .prompts
            .build(&self.schema_text, payload.command_text(), &dialect);

        tracing::debug!(
            request_id = %request_id,
            backend = %label,
            prompt_chars = prompt.chars().count(),
            "Calling backend"
        );

        let raw = match tokio::time::timeout(self.request_timeout, backend.complete(&prompt)).await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                tracing::warn!(request_id = %request_id, backend = %label, error = %e, "Backend call failed");
                let output = self.failed(
                    fallback_intent,
                    &dialect,
                    &label,
                    vec![format!("LLM call failed: {}", e)],
                );
                self.record(&request_id, &prompt, &output);
                return output;
            }
            Err(_) => {
                tracing::warn!(request_id = %request_id, backend = %label, "Backend call timed out");
                let output = self.failed(
                    fallback_intent,
                    &dialect,
                    &label,
                    vec![format!(
                        "LLM call failed: request timed out after {}s",
                        self.request_timeout.as_secs_f32()
                    )],
                );
                self.record(&request_id, &prompt, &output);
                return output;
            }
        };

        let reply = match parse_reply(&raw, self.snippet_chars) {
            Ok(reply) => reply,
            Err(errors) => {
                tracing::warn!(request_id = %request_id, backend = %label, "Backend output was not usable JSON");
                let output = self.failed(fallback_intent, &dialect, &label, errors);
                self.record(&request_id, &prompt, &output);
                return output;
            }
        };

        let intent = reply
            .intent
            .as_deref()
            .map(|label| Intent::parse(label).as_str())
            .unwrap_or(fallback_intent);

        let validation = match reply.sql.as_deref() {
            Some(sql) => self.validator.validate(sql, Dialect::parse(&dialect)),
            None => Validation {
                ok: false,
                warnings: vec![NO_SQL_RETURNED.to_string()],
                metadata: Default::default(),
                destructive: false,
            },
        };

        let mut warnings = validation.warnings;
        let mut errors = Vec::new();
        if !validation.ok {
            errors.push(VALIDATION_FAILED.to_string());
        }

        let destructive = reply.destructive || validation.destructive;
        if destructive && !payload.allow_destructive {
            errors.push(BLOCKED_DESTRUCTIVE_ERROR.to_string());
            warnings.push(BLOCKED_DESTRUCTIVE_WARNING.to_string());
            tracing::warn!(
                request_id = %request_id,
                sql = reply.sql.as_deref().unwrap_or_default(),
                "Blocked destructive operation"
            );
        }
        if reply.clarify_required {
            warnings.push(CLARIFICATION_WARNING.to_string());
        }

        let mut metadata = validation.metadata;
        metadata.backend = Some(label);

        let output = ReasonerOutput {
            sql: reply.sql,
            intent: intent.to_string(),
            dialect,
            warnings,
            errors,
            metadata,
            explanation: reply.explanation,
            confidence: output_confidence(validation.ok, reply.clarify_required),
            safe_to_execute: decide(
                validation.ok,
                destructive,
                payload.allow_destructive,
                reply.clarify_required,
            ),
        };

        self.record(&request_id, &prompt, &output);
        output
    }

    fn failed(
        &self,
        intent: &str,
        dialect: &str,
        label: &str,
        errors: Vec<String>,
    ) -> ReasonerOutput {
        let mut output = ReasonerOutput::failure(intent, dialect, errors);
        output.metadata.backend = Some(label.to_string());
        output
    }

    fn record(&self, request_id: &str, prompt: &str, output: &ReasonerOutput) {
        trace_reasoning_call(ReasoningSpanAttributes {
            request_id: request_id.to_string(),
            backend: output.metadata.backend.clone().unwrap_or_default(),
            dialect: output.dialect.clone(),
            intent: output.intent.clone(),
            prompt_chars: prompt.chars().count(),
            confidence: output.confidence,
            safe_to_execute: output.safe_to_execute,
            error_count: output.errors.len(),
        });
    }
}
