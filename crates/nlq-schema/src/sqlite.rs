//! SQLite introspection

use async_trait::async_trait;
use nlq_core::{DatabaseType, Error, Result, SchemaConfig};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::connection::ConnectionParams;
use crate::introspect::{Introspector, quote_identifier, returns_rows};
use crate::rows::collect_capped;
use crate::types::{ColumnInfo, ForeignKeyInfo, QueryOutcome, TableSchema};

/// Name used for databases that have no file behind them
pub const IN_MEMORY_NAME: &str = "sqlite_db";

pub struct SqliteIntrospector {
    pool: Pool<Sqlite>,
    name: String,
}

impl SqliteIntrospector {
    /// Open an existing database file, or a private in-memory database for
    /// `:memory:`. A missing file is an error rather than a new empty database.
    pub async fn connect(params: &ConnectionParams, config: &SchemaConfig) -> Result<Self> {
        let path = params.database.trim();
        let in_memory = path.is_empty() || path == ":memory:" || path == "sqlite::memory:";

        let (options, name) = if in_memory {
            let options = SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| Error::Connection(format!("Invalid SQLite options: {}", e)))?;
            (options, IN_MEMORY_NAME.to_string())
        } else {
            let name = Path::new(path)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| IN_MEMORY_NAME.to_string());
            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(false);
            (options, name)
        };

        // Every in-memory connection is its own database, so keep exactly one alive.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections.max(1))
        };

        let pool = pool_options
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await
            .map_err(|e| Error::Connection(format!("Failed to connect to SQLite: {}", e)))?;

        tracing::debug!(database = %name, "Connected to SQLite");

        Ok(Self { pool, name })
    }

    async fn columns(&self, table: &str) -> std::result::Result<(Vec<ColumnInfo>, Vec<String>), sqlx::Error> {
        let query = r#"
            SELECT name, type, "notnull", dflt_value, pk
            FROM pragma_table_info(?1)
            ORDER BY cid
        "#;

        let rows = sqlx::query(query).bind(table).fetch_all(&self.pool).await?;

        let mut keyed: Vec<(i64, String)> = Vec::new();
        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.try_get("name")?;
            let pk: i64 = row.try_get("pk")?;
            if pk > 0 {
                keyed.push((pk, name.clone()));
            }
            columns.push(ColumnInfo {
                name,
                data_type: row.try_get::<Option<String>, _>("type")?.unwrap_or_default(),
                nullable: row.try_get::<i64, _>("notnull")? == 0,
                default_value: row.try_get("dflt_value")?,
                is_primary_key: pk > 0,
            });
        }

        keyed.sort_by_key(|(idx, _)| *idx);
        Ok((columns, keyed.into_iter().map(|(_, name)| name).collect()))
    }

    async fn foreign_keys(&self, table: &str) -> std::result::Result<Vec<ForeignKeyInfo>, sqlx::Error> {
        let query = r#"
            SELECT "from", "table", "to"
            FROM pragma_foreign_key_list(?1)
            ORDER BY id, seq
        "#;

        let rows = sqlx::query(query).bind(table).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                Ok(ForeignKeyInfo {
                    column: row.try_get("from")?,
                    referenced_table: row.try_get("table")?,
                    referenced_column: row.try_get::<Option<String>, _>("to")?.unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn row_count(&self, table: &str) -> Option<i64> {
        let query = format!("SELECT COUNT(*) FROM {}", quote_identifier(table, '"'));
        match sqlx::query(&query).fetch_one(&self.pool).await {
            Ok(row) => row.try_get::<i64, _>(0).ok(),
            Err(e) => {
                tracing::debug!(table = %table, error = %e, "Row count unavailable");
                None
            }
        }
    }
}

#[async_trait]
impl Introspector for SqliteIntrospector {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    async fn database_name(&self) -> Result<String> {
        Ok(self.name.clone())
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        tracing::debug!("Listing SQLite tables");

        let query = r#"
            SELECT name
            FROM sqlite_master
            WHERE type = 'table'
            AND name NOT LIKE 'sqlite\_%' ESCAPE '\'
            ORDER BY name
        "#;

        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::database(format!("Failed to list tables: {}", e)))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("name")
                    .map_err(|e| Error::database(format!("Failed to list tables: {}", e)))
            })
            .collect()
    }

    async fn describe_table(&self, name: &str) -> Result<TableSchema> {
        tracing::debug!(table = %name, "Describing SQLite table");

        let (columns, primary_keys) = self
            .columns(name)
            .await
            .map_err(|e| Error::database(format!("Failed to describe table {}: {}", name, e)))?;

        let foreign_keys = self.foreign_keys(name).await.unwrap_or_else(|e| {
            tracing::warn!(table = %name, error = %e, "Foreign key lookup failed");
            Vec::new()
        });

        let row_count = self.row_count(name).await;

        Ok(TableSchema::assemble(name, columns, primary_keys, foreign_keys, row_count))
    }

    async fn execute(&self, sql: &str, max_rows: usize) -> Result<QueryOutcome> {
        if returns_rows(sql) {
            collect_capped(sqlx::query(sql).fetch(&self.pool), max_rows)
                .await
                .map_err(|e| Error::database(format!("Query failed: {}", e)))
        } else {
            let result = sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| Error::database(format!("Statement failed: {}", e)))?;
            Ok(QueryOutcome::Affected {
                rows_affected: result.rows_affected(),
            })
        }
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> SqliteIntrospector {
        let params = ConnectionParams::sqlite(":memory:");
        let introspector = SqliteIntrospector::connect(&params, &SchemaConfig::default())
            .await
            .unwrap();

        for stmt in [
            "CREATE TABLE classes (id INTEGER PRIMARY KEY, title TEXT NOT NULL)",
            "CREATE TABLE students (id INTEGER PRIMARY KEY, surname TEXT, grade INTEGER DEFAULT 0, class_id INTEGER REFERENCES classes(id))",
            "INSERT INTO classes (title) VALUES ('Maths'), ('Art')",
            "INSERT INTO students (surname, class_id) VALUES ('Adams', 1), ('Brown', 2), ('Allen', 1)",
        ] {
            introspector.execute(stmt, 10).await.unwrap();
        }

        introspector
    }

    #[tokio::test]
    async fn test_list_tables_excludes_internal() {
        let db = seeded().await;
        db.execute("CREATE TABLE t_auto (id INTEGER PRIMARY KEY AUTOINCREMENT)", 10)
            .await
            .unwrap();

        let tables = db.list_tables().await.unwrap();
        assert_eq!(tables, vec!["classes", "students", "t_auto"]);
        assert_eq!(db.database_name().await.unwrap(), IN_MEMORY_NAME);
    }

    #[tokio::test]
    async fn test_describe_table() {
        let db = seeded().await;
        let table = db.describe_table("students").await.unwrap();

        assert_eq!(table.columns.len(), 4);
        assert_eq!(table.primary_keys, vec!["id"]);
        assert_eq!(table.row_count, Some(3));
        assert_eq!(table.column("grade").unwrap().default_value.as_deref(), Some("0"));
        assert_eq!(table.foreign_keys.len(), 1);
        assert_eq!(table.foreign_keys[0].referenced_table, "classes");
        assert_eq!(table.foreign_keys[0].referenced_column, "id");

        let classes = db.describe_table("classes").await.unwrap();
        assert!(!classes.column("title").unwrap().nullable);
    }

    #[tokio::test]
    async fn test_execute_caps_rows() {
        let db = seeded().await;
        let outcome = db
            .execute("SELECT id, surname FROM students ORDER BY id", 2)
            .await
            .unwrap();

        match outcome {
            QueryOutcome::Rows {
                columns,
                rows,
                truncated,
            } => {
                assert_eq!(columns, vec!["id", "surname"]);
                assert_eq!(rows.len(), 2);
                assert!(truncated);
                assert_eq!(rows[0]["surname"], "Adams");
                assert!(!rows[0]["id"].is_null());
            }
            other => panic!("expected rows, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_execute_reports_affected_rows() {
        let db = seeded().await;
        let outcome = db
            .execute("UPDATE students SET grade = 5 WHERE surname LIKE 'A%'", 10)
            .await
            .unwrap();
        assert_eq!(outcome, QueryOutcome::Affected { rows_affected: 2 });
    }
}
