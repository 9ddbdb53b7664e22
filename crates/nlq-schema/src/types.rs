//! Schema data types

use chrono::{DateTime, Utc};
use nlq_core::DatabaseType;
use serde::{Deserialize, Serialize};

/// Column information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub is_primary_key: bool,
}

/// Outgoing foreign key of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyInfo {
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// Table schema information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    /// Columns in declaration order
    pub columns: Vec<ColumnInfo>,
    /// Primary key columns in key order; always a subset of `columns`
    pub primary_keys: Vec<String>,
    pub foreign_keys: Vec<ForeignKeyInfo>,
    /// None when the count query failed
    pub row_count: Option<i64>,
}

impl TableSchema {
    /// Placeholder for a table that could not be described.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_keys: Vec::new(),
            foreign_keys: Vec::new(),
            row_count: None,
        }
    }

    /// Build a table from introspection results.
    ///
    /// Primary key names that do not match a column are dropped, and every
    /// column's `is_primary_key` flag is set from the surviving key list.
    pub fn assemble(
        name: impl Into<String>,
        mut columns: Vec<ColumnInfo>,
        primary_keys: Vec<String>,
        foreign_keys: Vec<ForeignKeyInfo>,
        row_count: Option<i64>,
    ) -> Self {
        let mut keys: Vec<String> = Vec::new();
        for key in primary_keys {
            if columns.iter().any(|c| c.name == key) && !keys.contains(&key) {
                keys.push(key);
            }
        }

        for column in &mut columns {
            column.is_primary_key = keys.contains(&column.name);
        }

        Self {
            name: name.into(),
            columns,
            primary_keys: keys,
            foreign_keys,
            row_count,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// A versioned, hashed description of a database's tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub database_name: String,
    pub database_type: DatabaseType,
    /// Tables ordered by name
    pub tables: Vec<TableSchema>,
    /// Starts at 1 and increases on every successful generation
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    /// SHA-256 hex digest of `text`
    pub content_hash: String,
    /// Canonical text rendering handed to prompts
    pub text: String,
}

impl SchemaSnapshot {
    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }

    pub fn metadata(&self) -> SnapshotMetadata {
        SnapshotMetadata {
            database_name: self.database_name.clone(),
            database_type: self.database_type,
            created_at: self.created_at,
            last_updated: self.last_updated,
            version: self.version,
            table_count: self.tables.len(),
            schema_hash: self.content_hash.clone(),
            tables: self.table_names(),
        }
    }
}

/// Sidecar document written next to `schema.txt`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub database_name: String,
    pub database_type: DatabaseType,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub version: u64,
    pub table_count: usize,
    pub schema_hash: String,
    /// Table names, for tools that do not want to parse the text format
    pub tables: Vec<String>,
}

/// Result of running one statement against the connected database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryOutcome {
    /// A row-returning statement
    Rows {
        columns: Vec<String>,
        rows: Vec<serde_json::Value>,
        /// True when more rows existed than the configured cap
        truncated: bool,
    },
    /// A statement that modifies data or schema
    Affected { rows_affected: u64 },
}

impl QueryOutcome {
    pub fn row_count(&self) -> usize {
        match self {
            QueryOutcome::Rows { rows, .. } => rows.len(),
            QueryOutcome::Affected { .. } => 0,
        }
    }
}
