//! MySQL introspection (tables in the connected database)

use async_trait::async_trait;
use nlq_core::{DatabaseType, Error, Result, SchemaConfig};
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::{MySql, Pool, Row};
use std::time::Duration;

use crate::connection::ConnectionParams;
use crate::introspect::{Introspector, quote_identifier, returns_rows};
use crate::rows::collect_capped;
use crate::types::{ColumnInfo, ForeignKeyInfo, QueryOutcome, TableSchema};

const DEFAULT_PORT: u16 = 3306;

pub struct MySqlIntrospector {
    pool: Pool<MySql>,
}

impl MySqlIntrospector {
    pub async fn connect(params: &ConnectionParams, config: &SchemaConfig) -> Result<Self> {
        let mut options = MySqlConnectOptions::new()
            .host(params.host_or_default())
            .port(params.port.unwrap_or(DEFAULT_PORT))
            .database(&params.database);
        if let Some(user) = params.user.as_deref() {
            options = options.username(user);
        }
        if let Some(password) = params.password.as_deref() {
            options = options.password(password);
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await
            .map_err(|e| Error::Connection(format!("Failed to connect to MySQL: {}", e)))?;

        tracing::debug!(host = %params.host_or_default(), database = %params.database, "Connected to MySQL");

        Ok(Self { pool })
    }

    async fn columns(&self, table: &str) -> std::result::Result<Vec<ColumnInfo>, sqlx::Error> {
        // information_schema columns come back as binary strings on some servers
        let query = r#"
            SELECT
                CAST(column_name AS CHAR) AS column_name,
                CAST(column_type AS CHAR) AS column_type,
                CAST(is_nullable AS CHAR) AS is_nullable,
                CAST(column_default AS CHAR) AS column_default
            FROM information_schema.columns
            WHERE table_schema = DATABASE()
            AND table_name = ?
            ORDER BY ordinal_position
        "#;

        let rows = sqlx::query(query).bind(table).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                Ok(ColumnInfo {
                    name: row.try_get("column_name")?,
                    data_type: row.try_get("column_type")?,
                    nullable: row.try_get::<String, _>("is_nullable")? == "YES",
                    default_value: row.try_get("column_default")?,
                    is_primary_key: false,
                })
            })
            .collect()
    }

    async fn primary_keys(&self, table: &str) -> std::result::Result<Vec<String>, sqlx::Error> {
        let query = r#"
            SELECT CAST(column_name AS CHAR) AS column_name
            FROM information_schema.key_column_usage
            WHERE table_schema = DATABASE()
            AND table_name = ?
            AND constraint_name = 'PRIMARY'
            ORDER BY ordinal_position
        "#;

        let rows = sqlx::query(query).bind(table).fetch_all(&self.pool).await?;
        rows.iter().map(|row| row.try_get("column_name")).collect()
    }

    async fn foreign_keys(&self, table: &str) -> std::result::Result<Vec<ForeignKeyInfo>, sqlx::Error> {
        let query = r#"
            SELECT
                CAST(column_name AS CHAR) AS column_name,
                CAST(referenced_table_name AS CHAR) AS referenced_table,
                CAST(referenced_column_name AS CHAR) AS referenced_column
            FROM information_schema.key_column_usage
            WHERE table_schema = DATABASE()
            AND table_name = ?
            AND referenced_table_name IS NOT NULL
            ORDER BY ordinal_position
        "#;

        let rows = sqlx::query(query).bind(table).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                Ok(ForeignKeyInfo {
                    column: row.try_get("column_name")?,
                    referenced_table: row.try_get("referenced_table")?,
                    referenced_column: row.try_get("referenced_column")?,
                })
            })
            .collect()
    }

    async fn row_count(&self, table: &str) -> Option<i64> {
        let query = format!("SELECT COUNT(*) FROM {}", quote_identifier(table, '`'));
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
impl Introspector for MySqlIntrospector {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Mysql
    }

    async fn database_name(&self) -> Result<String> {
        let row = sqlx::query("SELECT CAST(DATABASE() AS CHAR)")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::database(format!("Failed to read database name: {}", e)))?;
        let name: Option<String> = row
            .try_get(0)
            .map_err(|e| Error::database(format!("Failed to read database name: {}", e)))?;
        name.ok_or_else(|| Error::database("No database selected"))
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        tracing::debug!("Listing MySQL tables");

        let query = r#"
            SELECT CAST(table_name AS CHAR) AS table_name
            FROM information_schema.tables
            WHERE table_schema = DATABASE()
            AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;

        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::database(format!("Failed to list tables: {}", e)))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("table_name")
                    .map_err(|e| Error::database(format!("Failed to list tables: {}", e)))
            })
            .collect()
    }

    async fn describe_table(&self, name: &str) -> Result<TableSchema> {
        tracing::debug!(table = %name, "Describing MySQL table");

        let columns = self
            .columns(name)
            .await
            .map_err(|e| Error::database(format!("Failed to describe table {}: {}", name, e)))?;

        let primary_keys = self.primary_keys(name).await.unwrap_or_else(|e| {
            tracing::warn!(table = %name, error = %e, "Primary key lookup failed");
            Vec::new()
        });

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
