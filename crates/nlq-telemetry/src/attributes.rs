//! Span attribute keys

pub const SYSTEM_NAME: &str = "nlq";

pub const NLQ_REQUEST_ID: &str = "nlq.request_id";
pub const NLQ_BACKEND: &str = "nlq.backend";
pub const NLQ_DIALECT: &str = "nlq.dialect";
pub const NLQ_INTENT: &str = "nlq.intent";
pub const NLQ_PROMPT_CHARS: &str = "nlq.prompt_chars";
pub const NLQ_CONFIDENCE: &str = "nlq.confidence";
pub const NLQ_SAFE_TO_EXECUTE: &str = "nlq.safe_to_execute";
pub const NLQ_ERROR_COUNT: &str = "nlq.error_count";

pub const DB_SYSTEM: &str = "db.system";
pub const DB_NAME: &str = "db.name";
pub const NLQ_SCHEMA_VERSION: &str = "nlq.schema.version";
pub const NLQ_SCHEMA_TABLE_COUNT: &str = "nlq.schema.table_count";
pub const NLQ_SCHEMA_HASH: &str = "nlq.schema.hash";
