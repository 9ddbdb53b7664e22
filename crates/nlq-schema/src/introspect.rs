//! Engine-specific catalog access

use async_trait::async_trait;
use nlq_core::{DatabaseType, Result};

use crate::types::{QueryOutcome, TableSchema};

/// Catalog and statement access for one connected database.
///
/// Implementations hold their own connection pool and translate driver
/// errors into [`nlq_core::Error`] without adding credentials to messages.
#[async_trait]
pub trait Introspector: Send + Sync {
    fn database_type(&self) -> DatabaseType;

    /// Name reported in the snapshot header
    async fn database_name(&self) -> Result<String>;

    /// User tables ordered by name, engine-internal tables excluded
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Columns, keys and row count of one table.
    ///
    /// Fails only when the column listing fails; key and row-count lookups
    /// degrade to empty or `None`.
    async fn describe_table(&self, name: &str) -> Result<TableSchema>;

    /// Run one statement, returning at most `max_rows` rows for queries.
    async fn execute(&self, sql: &str, max_rows: usize) -> Result<QueryOutcome>;

    /// Release pooled connections. Safe to call more than once.
    async fn close(&self);
}

/// Quote an identifier with the engine's quote character, doubling embedded quotes.
pub fn quote_identifier(name: &str, quote: char) -> String {
    let doubled: String = [quote, quote].iter().collect();
    format!(
        "{q}{}{q}",
        name.replace(quote, &doubled),
        q = quote
    )
}

/// Whether a statement produces a result set rather than an affected-row count.
pub fn returns_rows(sql: &str) -> bool {
    let first = sql
        .trim_start()
        .trim_start_matches('(')
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();

    matches!(
        first.as_str(),
        "SELECT" | "WITH" | "PRAGMA" | "SHOW" | "EXPLAIN" | "DESCRIBE" | "DESC" | "VALUES"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("students", '"'), "\"students\"");
        assert_eq!(quote_identifier("we\"ird", '"'), "\"we\"\"ird\"");
        assert_eq!(quote_identifier("order", '`'), "`order`");
    }

    #[test]
    fn test_returns_rows() {
        assert!(returns_rows("SELECT * FROM t"));
        assert!(returns_rows("  with x as (select 1) select * from x"));
        assert!(returns_rows("(SELECT 1)"));
        assert!(!returns_rows("INSERT INTO t VALUES (1)"));
        assert!(!returns_rows("DROP TABLE t"));
    }
}
