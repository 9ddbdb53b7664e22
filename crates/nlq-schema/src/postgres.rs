//! PostgreSQL introspection (tables in the `public` schema)

use async_trait::async_trait;
use nlq_core::{DatabaseType, Error, Result, SchemaConfig};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Pool, Postgres, Row};
use std::time::Duration;

use crate::connection::ConnectionParams;
use crate::introspect::{Introspector, quote_identifier, returns_rows};
use crate::rows::collect_capped;
use crate::types::{ColumnInfo, ForeignKeyInfo, QueryOutcome, TableSchema};

const DEFAULT_PORT: u16 = 5432;

pub struct PostgresIntrospector {
    pool: Pool<Postgres>,
}

impl PostgresIntrospector {
    pub async fn connect(params: &ConnectionParams, config: &SchemaConfig) -> Result<Self> {
        let mut options = PgConnectOptions::new()
            .host(params.host_or_default())
            .port(params.port.unwrap_or(DEFAULT_PORT))
            .database(&params.database);
        if let Some(user) = params.user.as_deref() {
            options = options.username(user);
        }
        if let Some(password) = params.password.as_deref() {
            options = options.password(password);
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await
            .map_err(|e| Error::Connection(format!("Failed to connect to PostgreSQL: {}", e)))?;

        tracing::debug!(host = %params.host_or_default(), database = %params.database, "Connected to PostgreSQL");

        Ok(Self { pool })
    }

    async fn columns(&self, table: &str) -> std::result::Result<Vec<ColumnInfo>, sqlx::Error> {
        let query = r#"
            SELECT
                column_name::text AS column_name,
                data_type::text AS data_type,
                is_nullable::text AS is_nullable,
                column_default::text AS column_default
            FROM information_schema.columns
            WHERE table_schema = 'public'
            AND table_name = $1
            ORDER BY ordinal_position
        "#;

        let rows = sqlx::query(query).bind(table).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                Ok(ColumnInfo {
                    name: row.try_get("column_name")?,
                    data_type: row.try_get("data_type")?,
                    nullable: row.try_get::<String, _>("is_nullable")? == "YES",
                    default_value: row.try_get("column_default")?,
                    is_primary_key: false,
                })
            })
            .collect()
    }

    async fn primary_keys(&self, table: &str) -> std::result::Result<Vec<String>, sqlx::Error> {
        let query = r#"
            SELECT kcu.column_name::text AS column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            WHERE tc.constraint_type = 'PRIMARY KEY'
            AND tc.table_schema = 'public'
            AND tc.table_name = $1
            ORDER BY kcu.ordinal_position
        "#;

        let rows = sqlx::query(query).bind(table).fetch_all(&self.pool).await?;
        rows.iter().map(|row| row.try_get("column_name")).collect()
    }

    async fn foreign_keys(&self, table: &str) -> std::result::Result<Vec<ForeignKeyInfo>, sqlx::Error> {
        let query = r#"
            SELECT
                kcu.column_name::text AS column_name,
                ccu.table_name::text AS referenced_table,
                ccu.column_name::text AS referenced_column
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            JOIN information_schema.constraint_column_usage ccu
                ON ccu.constraint_name = tc.constraint_name
                AND ccu.table_schema = tc.table_schema
            WHERE tc.constraint_type = 'FOREIGN KEY'
            AND tc.table_schema = 'public'
            AND tc.table_name = $1
            ORDER BY kcu.ordinal_position
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
        let query = format!(
            "SELECT COUNT(*) FROM public.{}",
            quote_identifier(table, '"')
        );
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
impl Introspector for PostgresIntrospector {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Postgres
    }

    async fn database_name(&self) -> Result<String> {
        let row = sqlx::query("SELECT current_database()::text")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::database(format!("Failed to read database name: {}", e)))?;
        row.try_get::<String, _>(0)
            .map_err(|e| Error::database(format!("Failed to read database name: {}", e)))
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        tracing::debug!("Listing PostgreSQL tables");

        let query = r#"
            SELECT tablename::text AS tablename
            FROM pg_catalog.pg_tables
            WHERE schemaname = 'public'
            ORDER BY tablename
        "#;

        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::database(format!("Failed to list tables: {}", e)))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("tablename")
                    .map_err(|e| Error::database(format!("Failed to list tables: {}", e)))
            })
            .collect()
    }

    async fn describe_table(&self, name: &str) -> Result<TableSchema> {
        tracing::debug!(table = %name, "Describing PostgreSQL table");

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
