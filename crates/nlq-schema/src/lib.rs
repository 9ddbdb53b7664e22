//! Schema snapshot management for nlq
//!
//! Introspects a MySQL, PostgreSQL or SQLite database through one
//! [`Introspector`] per engine and keeps a versioned, hashable text snapshot
//! of its tables.

pub mod connection;
pub mod format;
pub mod introspect;
pub mod manager;
pub mod mysql;
pub mod postgres;
pub mod redact;
pub mod rows;
pub mod sqlite;
pub mod types;

// Re-exports
pub use connection::{ConnectionParams, open_introspector};
pub use format::{TABLE_DELIMITER, content_hash, render_schema_text, table_names_from_text};
pub use introspect::Introspector;
pub use manager::{METADATA_FILE_NAME, SCHEMA_FILE_NAME, SchemaManager, load_metadata};
pub use redact::{REDACTED, redact_secret};
pub use types::{
    ColumnInfo, ForeignKeyInfo, QueryOutcome, SchemaSnapshot, SnapshotMetadata, TableSchema,
};
