//! Connection parameters and engine dispatch

use nlq_core::{DatabaseType, Error, Result, SchemaConfig};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

use crate::introspect::Introspector;
use crate::mysql::MySqlIntrospector;
use crate::postgres::PostgresIntrospector;
use crate::redact::{REDACTED, redact_secret};
use crate::sqlite::SqliteIntrospector;

/// Where and how to connect.
///
/// For SQLite only `database` is used and holds a file path or `:memory:`.
#[derive(Clone, Default, Deserialize)]
pub struct ConnectionParams {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: String,
}

impl ConnectionParams {
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            database: path.into(),
            ..Default::default()
        }
    }

    pub fn server(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: Some(host.into()),
            port: None,
            user: Some(user.into()),
            password: Some(password.into()),
            database: database.into(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn host_or_default(&self) -> &str {
        self.host.as_deref().unwrap_or("localhost")
    }

    /// Strip this connection's password from a message.
    pub fn redact(&self, message: &str) -> String {
        redact_secret(message, self.password.as_deref())
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| REDACTED))
            .field("database", &self.database)
            .finish()
    }
}

/// Open a pooled connection for the given engine.
///
/// Any error is returned as [`Error::Connection`] with the password redacted.
pub async fn open_introspector(
    db_type: DatabaseType,
    params: &ConnectionParams,
    config: &SchemaConfig,
) -> Result<Arc<dyn Introspector>> {
    let opened: Result<Arc<dyn Introspector>> = match db_type {
        DatabaseType::Sqlite => SqliteIntrospector::connect(params, config)
            .await
            .map(|i| Arc::new(i) as Arc<dyn Introspector>),
        DatabaseType::Postgres => PostgresIntrospector::connect(params, config)
            .await
            .map(|i| Arc::new(i) as Arc<dyn Introspector>),
        DatabaseType::Mysql => MySqlIntrospector::connect(params, config)
            .await
            .map(|i| Arc::new(i) as Arc<dyn Introspector>),
    };

    opened.map_err(|e| match e {
        Error::Connection(msg) => Error::Connection(params.redact(&msg)),
        other => Error::Connection(params.redact(&other.to_string())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_password() {
        let params = ConnectionParams::server("db", "app", "s3cret", "school").with_port(5433);
        let debug = format!("{:?}", params);
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("5433"));
    }

    #[test]
    fn test_redact_uses_own_password() {
        let params = ConnectionParams::server("db", "app", "s3cret", "school");
        assert_eq!(
            params.redact("auth failed for s3cret"),
            "auth failed for ******"
        );
    }

    #[tokio::test]
    async fn test_missing_sqlite_file_is_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        let params = ConnectionParams::sqlite(path.to_string_lossy());

        let err = open_introspector(DatabaseType::Sqlite, &params, &SchemaConfig::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Connection(_)));
    }
}
