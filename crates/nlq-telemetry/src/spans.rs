//! Span creation helpers for reasoning calls and schema scans

use crate::attributes::*;

/// Attributes for tracing one Reasoning Core call
#[derive(Debug, Clone)]
pub struct ReasoningSpanAttributes {
    pub request_id: String,
    pub backend: String,
    pub dialect: String,
    pub intent: String,
    pub prompt_chars: usize,
    pub confidence: f32,
    pub safe_to_execute: bool,
    pub error_count: usize,
}

/// Attributes for tracing a full schema scan
#[derive(Debug, Clone)]
pub struct SchemaScanAttributes {
    pub database_type: String,
    pub database_name: String,
    pub version: u64,
    pub table_count: usize,
    pub schema_hash: String,
}

/// Record a span for one NL→SQL reasoning call.
///
/// Never carries the prompt or the raw model output; those may hold schema
/// details or user text that do not belong in a trace backend.
pub fn trace_reasoning_call(attrs: ReasoningSpanAttributes) {
    let span = tracing::info_span!(
        "reason",
        { NLQ_REQUEST_ID } = %attrs.request_id,
        { NLQ_BACKEND } = %attrs.backend,
        { NLQ_DIALECT } = %attrs.dialect,
        { NLQ_INTENT } = %attrs.intent,
        { NLQ_PROMPT_CHARS } = attrs.prompt_chars,
        { NLQ_CONFIDENCE } = attrs.confidence as f64,
        { NLQ_SAFE_TO_EXECUTE } = attrs.safe_to_execute,
        { NLQ_ERROR_COUNT } = attrs.error_count,
    );

    let _guard = span.enter();
}

/// Record a span for a completed full schema generation.
pub fn trace_schema_scan(attrs: SchemaScanAttributes) {
    let span = tracing::info_span!(
        "schema_scan",
        { DB_SYSTEM } = %attrs.database_type,
        { DB_NAME } = %attrs.database_name,
        { NLQ_SCHEMA_VERSION } = attrs.version,
        { NLQ_SCHEMA_TABLE_COUNT } = attrs.table_count,
        { NLQ_SCHEMA_HASH } = %attrs.schema_hash,
    );

    let _guard = span.enter();
}
