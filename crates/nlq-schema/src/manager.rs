//! Schema snapshot lifecycle: connect, scan, version, persist, detect drift

use chrono::Utc;
use nlq_core::{DatabaseType, Error, Result, SchemaConfig};
use nlq_telemetry::{SchemaScanAttributes, trace_schema_scan};
use std::path::Path;
use std::sync::Arc;

use crate::connection::{ConnectionParams, open_introspector};
use crate::format::{content_hash, render_schema_text};
use crate::introspect::Introspector;
use crate::types::{QueryOutcome, SchemaSnapshot, SnapshotMetadata, TableSchema};

pub const SCHEMA_FILE_NAME: &str = "schema.txt";
pub const METADATA_FILE_NAME: &str = "schema_metadata.json";

/// Owns one database connection and the latest snapshot of its schema.
pub struct SchemaManager {
    config: SchemaConfig,
    introspector: Option<Arc<dyn Introspector>>,
    snapshot: Option<SchemaSnapshot>,
    last_error: Option<String>,
}

struct Scan {
    database_name: String,
    database_type: DatabaseType,
    tables: Vec<TableSchema>,
    text: String,
    hash: String,
}

impl SchemaManager {
    pub fn new(config: SchemaConfig) -> Self {
        Self {
            config,
            introspector: None,
            snapshot: None,
            last_error: None,
        }
    }

    /// Connect and generate the first snapshot.
    ///
    /// Returns false when the connection fails. A connection that succeeds but
    /// yields no tables still returns true; the failed generation is logged
    /// and available through [`SchemaManager::last_error`].
    pub async fn connect(&mut self, db_type: DatabaseType, params: &ConnectionParams) -> bool {
        match self.try_connect(db_type, params).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(database_type = %db_type, error = %e, "Connection failed");
                false
            }
        }
    }

    /// Like [`SchemaManager::connect`] but returns the (redacted) error.
    pub async fn try_connect(&mut self, db_type: DatabaseType, params: &ConnectionParams) -> Result<()> {
        match open_introspector(db_type, params, &self.config).await {
            Ok(introspector) => {
                self.attach(introspector).await;
                Ok(())
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Use an already-open introspector, replacing any previous connection.
    ///
    /// The previous snapshot is discarded and a new one generated. Returns
    /// whether that generation succeeded.
    pub async fn attach(&mut self, introspector: Arc<dyn Introspector>) -> bool {
        if let Some(previous) = self.introspector.take() {
            previous.close().await;
        }
        self.snapshot = None;
        self.last_error = None;
        self.introspector = Some(introspector);

        self.generate_full_schema().await
    }

    pub fn is_connected(&self) -> bool {
        self.introspector.is_some()
    }

    pub fn database_type(&self) -> Option<DatabaseType> {
        self.introspector.as_ref().map(|i| i.database_type())
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    fn introspector(&self) -> Result<&Arc<dyn Introspector>> {
        self.introspector
            .as_ref()
            .ok_or_else(|| Error::database("Not connected"))
    }

    pub async fn list_tables(&self) -> Result<Vec<String>> {
        self.introspector()?.list_tables().await
    }

    pub async fn describe_table(&self, name: &str) -> Result<TableSchema> {
        self.introspector()?.describe_table(name).await
    }

    /// Describe tables in order; a table that cannot be described is kept with empty columns.
    async fn describe_all(&self, introspector: &dyn Introspector, names: &[String]) -> Vec<TableSchema> {
        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            match introspector.describe_table(name).await {
                Ok(table) => tables.push(table),
                Err(e) => {
                    tracing::warn!(table = %name, error = %e, "Could not describe table, recording it empty");
                    tables.push(TableSchema::empty(name.clone()));
                }
            }
        }
        tables
    }

    async fn database_name(&self, introspector: &dyn Introspector) -> String {
        match introspector.database_name().await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read database name");
                "unknown".to_string()
            }
        }
    }

    async fn scan(&self) -> Result<Scan> {
        let introspector = self.introspector()?.clone();

        let names = introspector
            .list_tables()
            .await
            .map_err(|e| Error::SchemaGeneration(e.to_string()))?;
        if names.is_empty() {
            return Err(Error::SchemaGeneration("No tables found".to_string()));
        }

        let database_name = self.database_name(introspector.as_ref()).await;
        let tables = self.describe_all(introspector.as_ref(), &names).await;
        let text = render_schema_text(&database_name, &tables);
        let hash = content_hash(&text);

        Ok(Scan {
            database_name,
            database_type: introspector.database_type(),
            tables,
            text,
            hash,
        })
    }

    /// Scan the whole database and store a new snapshot version.
    ///
    /// Returns false, keeping the previous snapshot, when listing fails,
    /// finds no tables, or the snapshot files cannot be written.
    pub async fn generate_full_schema(&mut self) -> bool {
        let generated = self
            .try_generate_full_schema()
            .await
            .map(|s| (s.database_name.clone(), s.version, s.tables.len()));

        match generated {
            Ok((database, version, tables)) => {
                tracing::info!(
                    database = %database,
                    version,
                    tables,
                    "Schema snapshot generated"
                );
                true
            }
            Err(e) => {
                if matches!(e, Error::Io(_)) {
                    tracing::error!(error = %e, "Schema snapshot could not be persisted");
                } else {
                    tracing::warn!(error = %e, "Schema generation failed");
                }
                self.last_error = Some(e.to_string());
                false
            }
        }
    }

    pub async fn try_generate_full_schema(&mut self) -> Result<&SchemaSnapshot> {
        let scan = self.scan().await?;
        let now = Utc::now();

        let (version, created_at) = match &self.snapshot {
            Some(previous) => (previous.version + 1, previous.created_at),
            None => (1, now),
        };

        let snapshot = SchemaSnapshot {
            database_name: scan.database_name,
            database_type: scan.database_type,
            tables: scan.tables,
            version,
            created_at,
            last_updated: now,
            content_hash: scan.hash,
            text: scan.text,
        };

        if let Some(dir) = self.config.output_dir.as_deref() {
            persist(dir, &snapshot).await?;
        }

        trace_schema_scan(SchemaScanAttributes {
            database_type: snapshot.database_type.to_string(),
            database_name: snapshot.database_name.clone(),
            version: snapshot.version,
            table_count: snapshot.tables.len(),
            schema_hash: snapshot.content_hash.clone(),
        });

        Ok(&*self.snapshot.insert(snapshot))
    }

    /// Render only the named tables, in the order given.
    ///
    /// Returns None if any name is not a current table, if the request is
    /// empty, or if the table list cannot be read. The result is not stored.
    pub async fn create_specialized_snapshot<S: AsRef<str>>(&self, table_names: &[S]) -> Option<String> {
        if table_names.is_empty() {
            tracing::warn!("Specialized snapshot requested with no tables");
            return None;
        }

        let introspector = self.introspector.as_ref()?.clone();

        let existing = match introspector.list_tables().await {
            Ok(tables) => tables,
            Err(e) => {
                tracing::warn!(error = %e, "Could not list tables for specialized snapshot");
                return None;
            }
        };

        let mut requested = Vec::with_capacity(table_names.len());
        for name in table_names {
            let name = name.as_ref();
            if !existing.iter().any(|t| t == name) {
                tracing::warn!(table = %name, "Specialized snapshot requested for unknown table");
                return None;
            }
            requested.push(name.to_string());
        }

        let database_name = match &self.snapshot {
            Some(snapshot) => snapshot.database_name.clone(),
            None => self.database_name(introspector.as_ref()).await,
        };
        let tables = self.describe_all(introspector.as_ref(), &requested).await;

        Some(render_schema_text(&database_name, &tables))
    }

    /// True when the live schema no longer matches the stored snapshot.
    ///
    /// Never modifies the snapshot. While connected without a snapshot any
    /// live schema counts as drift; a failed scan does not.
    pub async fn detect_changes(&self) -> bool {
        if !self.is_connected() {
            return false;
        }
        let Some(current) = &self.snapshot else {
            return true;
        };

        match self.scan().await {
            Ok(scan) => {
                let changed = scan.hash != current.content_hash;
                if changed {
                    tracing::warn!(version = current.version, "Schema drift detected");
                }
                changed
            }
            Err(e) => {
                tracing::warn!(error = %e, "Change detection scan failed");
                false
            }
        }
    }

    /// Regenerate the snapshot if the live schema changed. Returns whether it did.
    pub async fn auto_update_on_change(&mut self) -> bool {
        if self.detect_changes().await {
            self.generate_full_schema().await
        } else {
            false
        }
    }

    pub fn snapshot(&self) -> Option<&SchemaSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn schema_text(&self) -> Option<&str> {
        self.snapshot.as_ref().map(|s| s.text.as_str())
    }

    /// Run one statement, capping result rows at the configured maximum.
    pub async fn execute(&self, sql: &str) -> Result<QueryOutcome> {
        self.introspector()?.execute(sql, self.config.max_rows).await
    }

    /// Release the connection and drop the active snapshot.
    ///
    /// Persisted files are left in place.
    pub async fn close(&mut self) {
        if let Some(introspector) = self.introspector.take() {
            introspector.close().await;
            tracing::debug!("Schema manager connection closed");
        }
        self.snapshot = None;
    }
}

/// Write `schema.txt` and `schema_metadata.json`, replacing both only once both are written.
async fn persist(dir: &Path, snapshot: &SchemaSnapshot) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;

    let metadata = serde_json::to_string_pretty(&snapshot.metadata())?;

    let text_tmp = dir.join(format!("{}.tmp", SCHEMA_FILE_NAME));
    let meta_tmp = dir.join(format!("{}.tmp", METADATA_FILE_NAME));

    tokio::fs::write(&text_tmp, &snapshot.text).await?;
    tokio::fs::write(&meta_tmp, metadata).await?;

    tokio::fs::rename(&text_tmp, dir.join(SCHEMA_FILE_NAME)).await?;
    tokio::fs::rename(&meta_tmp, dir.join(METADATA_FILE_NAME)).await?;

    tracing::debug!(dir = %dir.display(), version = snapshot.version, "Schema snapshot persisted");
    Ok(())
}

/// Read a previously persisted metadata sidecar.
pub async fn load_metadata(dir: &Path) -> Result<SnapshotMetadata> {
    let contents = tokio::fs::read_to_string(dir.join(METADATA_FILE_NAME)).await?;
    Ok(serde_json::from_str(&contents)?)
}
