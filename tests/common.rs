//! Common test utilities and helpers

#![allow(dead_code)]

use nlq::core::{NlqConfig, ReasonerConfig, SchemaConfig};
use nlq::{ConnectionParams, QuerySession, Reasoner, SchemaManager};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::PathBuf;
use tempfile::TempDir;

/// Tables and rows of the demo school database
pub const SCHOOL_SQL: &[&str] = &[
    "CREATE TABLE classes (id INTEGER PRIMARY KEY AUTOINCREMENT, title TEXT NOT NULL, room TEXT)",
    "CREATE TABLE students (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        surname TEXT NOT NULL,
        grade INTEGER DEFAULT 0,
        class_id INTEGER REFERENCES classes(id)
    )",
    "INSERT INTO classes (title, room) VALUES ('Maths', 'A1'), ('Art', 'B2'), ('History', NULL)",
    "INSERT INTO students (name, surname, grade, class_id) VALUES
        ('Ann', 'Adams', 8, 1),
        ('Ben', 'Brown', 6, 2),
        ('Cid', 'Allen', 9, 1),
        ('Dee', 'Clark', 7, 3)",
];

/// A seeded SQLite file that lives as long as this value
pub struct DemoDatabase {
    _dir: TempDir,
    pub path: PathBuf,
}

impl DemoDatabase {
    pub async fn school() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("school.db");
        let db = Self { _dir: dir, path };
        db.run(SCHOOL_SQL).await?;
        Ok(db)
    }

    pub fn params(&self) -> ConnectionParams {
        ConnectionParams::sqlite(self.path.to_string_lossy())
    }

    /// Run statements on a separate connection, as another client would
    pub async fn run(&self, statements: &[&str]) -> anyhow::Result<()> {
        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        for statement in statements {
            sqlx::query(statement).execute(&pool).await?;
        }
        pool.close().await;
        Ok(())
    }
}

pub fn offline_config() -> NlqConfig {
    NlqConfig::test_defaults()
}

/// A session over the offline backend, not yet connected
pub fn offline_session(schema: SchemaConfig) -> QuerySession {
    QuerySession::new(
        SchemaManager::new(schema),
        Reasoner::new(&ReasonerConfig::default()),
    )
}
