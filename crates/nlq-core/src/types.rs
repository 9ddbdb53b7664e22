//! Request and result contracts for the reasoning boundary

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Error pushed when a destructive statement is refused.
pub const BLOCKED_DESTRUCTIVE_ERROR: &str =
    "Destructive operation detected but allow_destructive is False";

/// Warning paired with [`BLOCKED_DESTRUCTIVE_ERROR`].
pub const BLOCKED_DESTRUCTIVE_WARNING: &str =
    "Blocked destructive operation because allow_destructive=False";

/// Supported database engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    Mysql,
    Postgres,
    Sqlite,
}

impl DatabaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseType::Mysql => "mysql",
            DatabaseType::Postgres => "postgres",
            DatabaseType::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mysql" => Ok(DatabaseType::Mysql),
            "postgres" | "postgresql" => Ok(DatabaseType::Postgres),
            "sqlite" => Ok(DatabaseType::Sqlite),
            other => Err(Error::config_error(format!(
                "Unsupported database type: {}",
                other
            ))),
        }
    }
}

/// Target SQL syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Mysql,
    Postgres,
    Sqlite,
    /// ANSI-ish fallback for labels no engine claims
    Generic,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Mysql => "mysql",
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
            Dialect::Generic => "generic",
        }
    }

    /// Parse a dialect label; unknown labels map to `Generic`.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "mysql" | "mariadb" => Dialect::Mysql,
            "postgres" | "postgresql" | "pg" => Dialect::Postgres,
            "sqlite" | "sqlite3" => Dialect::Sqlite,
            _ => Dialect::Generic,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<DatabaseType> for Dialect {
    fn from(db: DatabaseType) -> Self {
        match db {
            DatabaseType::Mysql => Dialect::Mysql,
            DatabaseType::Postgres => Dialect::Postgres,
            DatabaseType::Sqlite => Dialect::Sqlite,
        }
    }
}

/// Coarse operation family of a request or statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Select,
    Insert,
    Update,
    Delete,
    CreateTable,
    Alter,
    Other,
}

impl Intent {
    pub const ALL: [Intent; 7] = [
        Intent::Select,
        Intent::Insert,
        Intent::Update,
        Intent::Delete,
        Intent::CreateTable,
        Intent::Alter,
        Intent::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Select => "select",
            Intent::Insert => "insert",
            Intent::Update => "update",
            Intent::Delete => "delete",
            Intent::CreateTable => "create_table",
            Intent::Alter => "alter",
            Intent::Other => "other",
        }
    }

    /// Intents whose successful execution may change the schema or its row counts.
    pub fn changes_database(&self) -> bool {
        matches!(
            self,
            Intent::Insert | Intent::Update | Intent::Delete | Intent::CreateTable | Intent::Alter
        )
    }

    /// Parse an intent label; unknown labels map to `Other`.
    pub fn parse(label: &str) -> Self {
        Intent::ALL
            .into_iter()
            .find(|intent| intent.as_str().eq_ignore_ascii_case(label.trim()))
            .unwrap_or(Intent::Other)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input contract to the Reasoning Core
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandPayload {
    /// Caller hint, may be overridden by model output
    pub intent: String,
    /// Verbatim user input
    pub raw_text: String,
    #[serde(default)]
    pub normalized_text: Option<String>,
    /// Falls back to the reasoner's configured dialect when absent
    #[serde(default)]
    pub dialect: Option<String>,
    #[serde(default)]
    pub allow_destructive: bool,
    #[serde(default)]
    pub session_context: Option<serde_json::Map<String, serde_json::Value>>,
}

impl CommandPayload {
    pub fn new(intent: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            raw_text: raw_text.into(),
            ..Default::default()
        }
    }

    pub fn with_normalized(mut self, normalized: impl Into<String>) -> Self {
        self.normalized_text = Some(normalized.into());
        self
    }

    pub fn with_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.dialect = Some(dialect.into());
        self
    }

    pub fn allow_destructive(mut self, allow: bool) -> Self {
        self.allow_destructive = allow;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.session_context
            .get_or_insert_with(serde_json::Map::new)
            .insert(key.into(), value);
        self
    }

    /// Text handed to the prompt: normalized form when present, otherwise the raw input.
    pub fn command_text(&self) -> &str {
        self.normalized_text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.raw_text)
    }
}

/// Extracted SQL facts attached to a [`ReasonerOutput`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputMetadata {
    pub tables: BTreeSet<String>,
    pub columns: BTreeSet<String>,
    /// Formatted SQL, or the original text when formatting was not possible
    pub pretty: String,
    /// Which backend produced the candidate ("offline" or "<provider>:<model>")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
}

/// Result contract of the Reasoning Core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasonerOutput {
    pub sql: Option<String>,
    pub intent: String,
    pub dialect: String,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub metadata: OutputMetadata,
    pub explanation: Option<String>,
    pub confidence: f32,
    pub safe_to_execute: bool,
}

impl ReasonerOutput {
    /// A well-formed failure: no SQL, zero confidence, never executable.
    pub fn failure(
        intent: impl Into<String>,
        dialect: impl Into<String>,
        errors: Vec<String>,
    ) -> Self {
        Self {
            sql: None,
            intent: intent.into(),
            dialect: dialect.into(),
            warnings: Vec::new(),
            errors,
            metadata: OutputMetadata::default(),
            explanation: None,
            confidence: 0.0,
            safe_to_execute: false,
        }
    }

    /// True when the only reason for refusal is the destructive-operation policy.
    pub fn is_policy_blocked(&self) -> bool {
        self.errors.iter().any(|e| e == BLOCKED_DESTRUCTIVE_ERROR)
    }

    pub fn intent_kind(&self) -> Intent {
        Intent::parse(&self.intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_type_parsing() {
        assert_eq!("MySQL".parse::<DatabaseType>().unwrap(), DatabaseType::Mysql);
        assert_eq!(
            "postgresql".parse::<DatabaseType>().unwrap(),
            DatabaseType::Postgres
        );
        assert_eq!("sqlite".parse::<DatabaseType>().unwrap(), DatabaseType::Sqlite);
        assert!("oracle".parse::<DatabaseType>().is_err());
    }

    #[test]
    fn test_dialect_labels() {
        assert_eq!(Dialect::parse("PostgreSQL"), Dialect::Postgres);
        assert_eq!(Dialect::parse(" sqlite "), Dialect::Sqlite);
        assert_eq!(Dialect::parse("oracle"), Dialect::Generic);
        assert_eq!(Dialect::from(DatabaseType::Mysql), Dialect::Mysql);
    }

    #[test]
    fn test_intent_labels() {
        assert_eq!(Intent::parse("create_table"), Intent::CreateTable);
        assert_eq!(Intent::parse("SELECT"), Intent::Select);
        assert_eq!(Intent::parse("query"), Intent::Other);
        assert!(Intent::Alter.changes_database());
        assert!(!Intent::Select.changes_database());
    }

    #[test]
    fn test_command_text_prefers_normalized() {
        let payload = CommandPayload::new("select", "Show ME the Students!");
        assert_eq!(payload.command_text(), "Show ME the Students!");

        let payload = payload.with_normalized("show me the students");
        assert_eq!(payload.command_text(), "show me the students");
    }

    #[test]
    fn test_failure_output_is_never_executable() {
        let output = ReasonerOutput::failure("select", "mysql", vec!["boom".to_string()]);
        assert!(output.sql.is_none());
        assert_eq!(output.confidence, 0.0);
        assert!(!output.safe_to_execute);
        assert!(!output.is_policy_blocked());
    }

    #[test]
    fn test_metadata_serializes_required_keys() {
        let value = serde_json::to_value(OutputMetadata::default()).unwrap();
        assert!(value.get("tables").is_some());
        assert!(value.get("columns").is_some());
        assert!(value.get("pretty").is_some());
        assert!(value.get("backend").is_none());
    }
}
