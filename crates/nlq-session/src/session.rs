use nlq_command::{CommandProcessor, ProcessedCommand};
use nlq_core::{DatabaseType, Dialect, Error, NlqConfig, ReasonerOutput, Result};
use nlq_reasoner::Reasoner;
use nlq_schema::{ConnectionParams, Introspector, QueryOutcome, SchemaManager};
use std::sync::Arc;

use crate::history::{HistoryEntry, SessionStats};

/// Entries kept by default; older ones are dropped first.
pub const DEFAULT_HISTORY_LIMIT: usize = 200;

/// Per-request knobs for [`QuerySession::ask`]
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    /// Falls back to the connected engine's dialect, then the reasoner default
    pub dialect: Option<String>,
    pub allow_destructive: bool,
    /// Restrict the prompt to these tables for this one call
    pub tables: Option<Vec<String>>,
}

impl AskOptions {
    pub fn dialect(mut self, dialect: impl Into<String>) -> Self {
        self.dialect = Some(dialect.into());
        self
    }

    pub fn allow_destructive(mut self, allow: bool) -> Self {
        self.allow_destructive = allow;
        self
    }

    pub fn tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables = Some(tables.into_iter().map(Into::into).collect());
        self
    }
}

/// One user's connection, schema snapshot and reasoner.
pub struct QuerySession {
    id: String,
    schema: SchemaManager,
    reasoner: Reasoner,
    processor: CommandProcessor,
    history: Vec<HistoryEntry>,
    history_limit: usize,
}

impl QuerySession {
    pub fn new(schema: SchemaManager, reasoner: Reasoner) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            schema,
            reasoner,
            processor: CommandProcessor::new(),
            history: Vec::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn from_config(config: &NlqConfig) -> Result<Self> {
        Ok(Self::new(
            SchemaManager::new(config.schema.clone()),
            Reasoner::from_config(config)?,
        ))
    }

    pub fn with_processor(mut self, processor: CommandProcessor) -> Self {
        self.processor = processor;
        self.sync_schema();
        self
    }

    /// Cap the number of remembered requests. Zero keeps none.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self.trim_history();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn schema(&self) -> &SchemaManager {
        &self.schema
    }

    pub fn reasoner(&self) -> &Reasoner {
        &self.reasoner
    }

    pub fn processor(&self) -> &CommandProcessor {
        &self.processor
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats::from_history(&self.history)
    }

    /// Connect and load the first snapshot into the reasoner and processor.
    pub async fn connect(&mut self, db_type: DatabaseType, params: &ConnectionParams) -> bool {
        let connected = self.schema.connect(db_type, params).await;
        self.sync_schema();
        if connected {
            tracing::info!(
                session_id = %self.id,
                database_type = %db_type,
                tables = self.processor.available_tables().len(),
                "Session connected"
            );
        }
        connected
    }

    /// Use an already-open introspector. Returns whether a snapshot was generated.
    pub async fn attach(&mut self, introspector: Arc<dyn Introspector>) -> bool {
        let generated = self.schema.attach(introspector).await;
        self.sync_schema();
        generated
    }

    /// Regenerate the full snapshot unconditionally.
    pub async fn refresh(&mut self) -> bool {
        let generated = self.schema.generate_full_schema().await;
        self.sync_schema();
        generated
    }

    /// Regenerate only if the database drifted from the snapshot.
    pub async fn auto_update(&mut self) -> bool {
        let updated = self.schema.auto_update_on_change().await;
        if updated {
            self.sync_schema();
        }
        updated
    }

    fn sync_schema(&mut self) {
        let text = self.schema.schema_text().unwrap_or_default().to_string();
        self.use_schema_text(&text);
    }

    /// Reason over schema text without a live connection, e.g. a saved `schema.txt`.
    ///
    /// Replaced again by the next connect or refresh.
    pub fn use_schema_text(&mut self, text: &str) {
        self.processor.update_schema_text(text);
        self.reasoner.update_schema(text);
    }

    pub fn process(&self, text: &str) -> ProcessedCommand {
        self.processor.process(text)
    }

    /// Answer one request.
    ///
    /// With `options.tables` set, the reasoner sees a snapshot of only those
    /// tables for this call and the full snapshot is restored afterwards.
    /// Fails only when that table selection cannot be honored.
    pub async fn ask(&mut self, text: &str, options: AskOptions) -> Result<ReasonerOutput> {
        let dialect = options.dialect.clone().or_else(|| {
            self.schema
                .database_type()
                .map(|db| Dialect::from(db).to_string())
        });
        let payload = self
            .processor
            .process(text)
            .into_payload(dialect.as_deref(), options.allow_destructive);

        let output = match options.tables.as_deref().filter(|tables| !tables.is_empty()) {
            Some(tables) => {
                let Some(specialized) = self.schema.create_specialized_snapshot(tables).await
                else {
                    return Err(Error::SchemaGeneration(format!(
                        "Cannot build a snapshot for tables: {}",
                        tables.join(", ")
                    )));
                };

                tracing::debug!(session_id = %self.id, tables = tables.len(), "Using specialized snapshot");
                self.reasoner.update_schema(specialized);
                let output = self.reasoner.generate(&payload).await;
                self.reasoner
                    .update_schema(self.schema.schema_text().unwrap_or_default());
                output
            }
            None => self.reasoner.generate(&payload).await,
        };

        self.history.push(HistoryEntry::new(text, &output));
        self.trim_history();
        Ok(output)
    }

    fn trim_history(&mut self) {
        if self.history.len() > self.history_limit {
            let excess = self.history.len() - self.history_limit;
            self.history.drain(..excess);
        }
    }

    /// Run an output's SQL.
    ///
    /// Refuses anything not marked safe to execute. After a statement that
    /// may have changed the database the snapshot is refreshed if it drifted.
    pub async fn execute(&mut self, output: &ReasonerOutput) -> Result<QueryOutcome> {
        if !output.safe_to_execute {
            let reason = if output.errors.is_empty() {
                "output is not marked safe to execute".to_string()
            } else {
                output.errors.join("; ")
            };
            return Err(if output.is_policy_blocked() {
                Error::PolicyBlock(reason)
            } else {
                Error::Validation(reason)
            });
        }

        let sql = output
            .sql
            .as_deref()
            .ok_or_else(|| Error::Validation("No SQL to execute".to_string()))?;

        let outcome = self.schema.execute(sql).await?;
        tracing::info!(
            session_id = %self.id,
            intent = %output.intent,
            rows = outcome.row_count(),
            "Statement executed"
        );

        if let Some(entry) = self
            .history
            .iter_mut()
            .rev()
            .find(|entry| !entry.executed && entry.sql.as_deref() == Some(sql))
        {
            entry.executed = true;
        }

        let may_have_changed = matches!(outcome, QueryOutcome::Affected { .. })
            || output.intent_kind().changes_database();
        if may_have_changed && self.auto_update().await {
            tracing::info!(
                session_id = %self.id,
                version = self.schema.snapshot().map(|s| s.version).unwrap_or_default(),
                "Schema snapshot refreshed after change"
            );
        }

        Ok(outcome)
    }

    pub async fn close(&mut self) {
        self.schema.close().await;
        self.sync_schema();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlq_core::{ReasonerConfig, SchemaConfig};
    use nlq_schema::sqlite::SqliteIntrospector;

    async fn school_session() -> QuerySession {
        let introspector =
            SqliteIntrospector::connect(&ConnectionParams::sqlite(":memory:"), &SchemaConfig::default())
                .await
                .unwrap();
        for stmt in [
            "CREATE TABLE classes (id INTEGER PRIMARY KEY, title TEXT NOT NULL)",
            "CREATE TABLE students (id INTEGER PRIMARY KEY, surname TEXT NOT NULL, class_id INTEGER REFERENCES classes(id))",
            "INSERT INTO classes (title) VALUES ('Maths'), ('Art')",
            "INSERT INTO students (surname, class_id) VALUES ('Adams', 1), ('Brown', 2), ('Allen', 1)",
        ] {
            introspector.execute(stmt, 10).await.unwrap();
        }

        let mut session = QuerySession::new(
            SchemaManager::new(SchemaConfig::default()),
            Reasoner::new(&ReasonerConfig::default()),
        );
        assert!(session.attach(Arc::new(introspector)).await);
        session
    }

    #[tokio::test]
    async fn test_attach_syncs_schema_text() {
        let session = school_session().await;
        assert!(session.reasoner().schema_text().contains("Table students:"));
        assert_eq!(session.processor().available_tables(), vec!["classes", "students"]);
    }

    #[tokio::test]
    async fn test_ask_and_execute() {
        let mut session = school_session().await;
        let output = session
            .ask("count how many classes exist", AskOptions::default())
            .await
            .unwrap();

        assert_eq!(output.dialect, "sqlite");
        assert_eq!(output.sql.as_deref(), Some("SELECT COUNT(*) FROM classes;"));
        assert!(output.safe_to_execute);

        let outcome = session.execute(&output).await.unwrap();
        assert_eq!(outcome.row_count(), 1);
        assert!(session.history()[0].executed);
        assert_eq!(session.stats().executed, 1);
    }

    #[tokio::test]
    async fn test_specialized_snapshot_is_discarded_after_ask() {
        let mut session = school_session().await;
        let full = session.reasoner().schema_text().to_string();

        let output = session
            .ask(
                "show me students whose surname starts with A",
                AskOptions::default().tables(["students"]),
            )
            .await
            .unwrap();
        assert!(output.safe_to_execute);
        assert_eq!(session.reasoner().schema_text(), full);

        let outcome = session.execute(&output).await.unwrap();
        assert_eq!(outcome.row_count(), 2);
    }

    #[tokio::test]
    async fn test_history_keeps_most_recent_entries() {
        let mut session = school_session().await.with_history_limit(2);
        for text in [
            "count how many classes exist",
            "count how many students exist",
            "list all the classes",
        ] {
            session.ask(text, AskOptions::default()).await.unwrap();
        }

        let asked: Vec<_> = session.history().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(asked, vec!["count how many students exist", "list all the classes"]);
        assert_eq!(session.stats().total, 2);

        let mut silent = school_session().await.with_history_limit(0);
        let output = silent
            .ask("count how many classes exist", AskOptions::default())
            .await
            .unwrap();
        assert!(silent.history().is_empty());
        assert_eq!(silent.execute(&output).await.unwrap().row_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_table_selection_fails() {
        let mut session = school_session().await;
        let err = session
            .ask("show me teachers", AskOptions::default().tables(["teachers"]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SchemaGeneration(_)));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_blocked_output_is_never_executed() {
        let mut session = school_session().await;
        let output = session
            .ask(
                "create a new table called pets with fields name, species, age",
                AskOptions::default(),
            )
            .await
            .unwrap();

        let err = session.execute(&output).await.unwrap_err();
        assert!(err.is_policy_block());
        assert!(!session.schema().snapshot().unwrap().table_names().contains(&"pets".to_string()));
    }

    #[tokio::test]
    async fn test_schema_change_refreshes_snapshot() {
        let mut session = school_session().await;
        let before = session.schema().snapshot().unwrap().version;

        let output = session
            .ask(
                "create a new table called pets with fields name, species, age",
                AskOptions::default().allow_destructive(true),
            )
            .await
            .unwrap();
        assert!(output.safe_to_execute);
        session.execute(&output).await.unwrap();

        let snapshot = session.schema().snapshot().unwrap();
        assert_eq!(snapshot.version, before + 1);
        assert!(snapshot.table("pets").is_some());
        assert!(session.reasoner().schema_text().contains("Table pets:"));
        assert!(session.processor().available_tables().contains(&"pets"));
    }

    #[tokio::test]
    async fn test_clarification_output_is_refused() {
        let mut session = school_session().await;
        let output = session
            .ask("asdkjasldk random nonsense", AskOptions::default())
            .await
            .unwrap();

        let err = session.execute(&output).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(session.stats().safe, 0);
    }

    #[tokio::test]
    async fn test_offline_schema_text_without_connection() {
        let mut session = QuerySession::new(
            SchemaManager::new(SchemaConfig::default()),
            Reasoner::new(&ReasonerConfig::default()),
        );
        session.use_schema_text("Database: shop\n\nTable orders:\n  - id (INTEGER) NOT NULL");

        let output = session
            .ask("count how many orders exist", AskOptions::default())
            .await
            .unwrap();
        assert_eq!(output.sql.as_deref(), Some("SELECT COUNT(*) FROM orders;"));
        assert_eq!(output.dialect, "mysql");

        let err = session.execute(&output).await.unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }

    #[tokio::test]
    async fn test_close_clears_schema() {
        let mut session = school_session().await;
        session.close().await;
        assert!(!session.schema().is_connected());
        assert!(session.reasoner().schema_text().is_empty());
    }
}
