use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Database unreachable or credentials rejected. The message is already redacted.
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Schema generation failed: {0}")]
    SchemaGeneration(String),

    #[error("Language model backend failed: {0}")]
    Backend(String),

    #[error("Model output could not be parsed: {0}")]
    Parse(String),

    #[error("SQL validation failed: {0}")]
    Validation(String),

    /// A destructive statement was refused by policy. Not a fault.
    #[error("Blocked by policy: {0}")]
    PolicyBlock(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Helper for creating configuration errors
    ///
    /// # Example
    /// ```
    /// use nlq_core::Error;
    /// let err = Error::config_error("Unknown model provider");
    /// ```
    pub fn config_error(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Helper for creating backend errors
    ///
    /// # Example
    /// ```
    /// use nlq_core::Error;
    /// let err = Error::backend("request timed out after 30s");
    /// assert!(err.to_string().contains("timed out"));
    /// ```
    pub fn backend(msg: impl Into<String>) -> Self {
        Error::Backend(msg.into())
    }

    /// Helper for creating database errors
    pub fn database(msg: impl Into<String>) -> Self {
        Error::Database(msg.into())
    }

    /// True for refusals that are the system working as intended.
    pub fn is_policy_block(&self) -> bool {
        matches!(self, Error::PolicyBlock(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_block_is_distinguishable() {
        let blocked = Error::PolicyBlock("DROP TABLE users".to_string());
        let broken = Error::backend("connection reset");

        assert!(blocked.is_policy_block());
        assert!(!broken.is_policy_block());
        assert!(blocked.to_string().starts_with("Blocked by policy"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "schema.txt");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
