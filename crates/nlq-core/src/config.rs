//! Configuration management for nlq
//!
//! Loads configuration with priority:
//! 1. nlq.toml (or specified config file)
//! 2. Environment variables (fallback)
//! 3. Defaults

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "nlq.toml";

/// nlq configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NlqConfig {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub reasoner: ReasonerConfig,

    #[serde(default)]
    pub schema: SchemaConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Language model backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Backend provider (gemini, openai, offline)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// API key (can reference env var with ${VAR_NAME})
    pub api_key: Option<String>,

    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Override for OpenAI-compatible endpoints
    pub base_url: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Reasoning Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasonerConfig {
    #[serde(default = "default_dialect")]
    pub default_dialect: String,

    /// Character budget for the schema section of a prompt
    #[serde(default = "default_max_schema_chars")]
    pub max_schema_prompt_chars: usize,

    /// Cap on raw model output echoed back in parse errors
    #[serde(default = "default_error_snippet_chars")]
    pub error_snippet_chars: usize,
}

/// Schema snapshot manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Where schema.txt and schema_metadata.json are written. None disables persistence.
    pub output_dir: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Row cap applied to executed SELECT statements
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,

    pub service_name: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: None,
            model_name: default_model_name(),
            base_url: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self {
            default_dialect: default_dialect(),
            max_schema_prompt_chars: default_max_schema_chars(),
            error_snippet_chars: default_error_snippet_chars(),
        }
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            max_rows: default_max_rows(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            log_format: default_log_format(),
            service_name: None,
        }
    }
}

impl NlqConfig {
    /// Load configuration with the following priority:
    /// 1. nlq.toml in current directory or a parent
    /// 2. Environment variables (fallback)
    /// 3. Defaults
    ///
    /// A missing config file is not an error; env and defaults still apply.
    pub fn load() -> Result<Self> {
        match Self::find_config_file() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::debug!("No {} found, using environment and defaults", CONFIG_FILE_NAME);
                let mut config = Self::default();
                config.apply_env_fallbacks()?;
                Ok(config)
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        tracing::debug!("Loading configuration from: {:?}", path);

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: NlqConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.resolve_env_vars();
        config.apply_env_fallbacks()?;

        Ok(config)
    }

    /// Find nlq.toml by searching current directory and parents
    fn find_config_file() -> Option<PathBuf> {
        let mut current = env::current_dir().ok()?;

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Resolve ${VAR_NAME} references to environment variables
    fn resolve_env_vars(&mut self) {
        if let Some(ref key) = self.model.api_key {
            self.model.api_key = Self::resolve_env_var(key);
        }

        if let Some(ref url) = self.model.base_url {
            self.model.base_url = Self::resolve_env_var(url);
        }
    }

    /// Fill gaps from the environment variables the deployment has always used
    fn apply_env_fallbacks(&mut self) -> Result<()> {
        if self.model.api_key.as_deref().is_none_or(str::is_empty) {
            let var = match self.model.provider.as_str() {
                "openai" => "OPENAI_API_KEY",
                _ => "GEMINI_API_KEY",
            };
            self.model.api_key = env::var(var).ok().filter(|k| !k.is_empty());
        }

        if let Ok(model) = env::var("GEMINI_MODEL")
            && self.model.provider == "gemini"
            && self.model.model_name == default_model_name()
        {
            self.model.model_name = model;
        }

        if let Ok(dialect) = env::var("DEFAULT_DIALECT")
            && self.reasoner.default_dialect == default_dialect()
        {
            self.reasoner.default_dialect = dialect.to_lowercase();
        }

        if let Ok(chars) = env::var("MAX_SCHEMA_PROMPT_CHARS")
            && self.reasoner.max_schema_prompt_chars == default_max_schema_chars()
        {
            self.reasoner.max_schema_prompt_chars = chars
                .parse()
                .map_err(|_| anyhow!("MAX_SCHEMA_PROMPT_CHARS must be an integer, got '{}'", chars))?;
        }

        Ok(())
    }

    /// Resolve a single ${VAR_NAME} reference
    fn resolve_env_var(value: &str) -> Option<String> {
        if value.starts_with("${") && value.ends_with('}') {
            let var_name = &value[2..value.len() - 1];
            env::var(var_name).ok()
        } else {
            Some(value.to_string())
        }
    }

    /// API key for the configured remote provider, if any
    pub fn api_key(&self) -> Option<&str> {
        self.model.api_key.as_deref().filter(|k| !k.is_empty())
    }

    /// Create test-friendly defaults (offline backend, no API key required)
    pub fn test_defaults() -> Self {
        Self {
            model: ModelConfig {
                provider: "offline".to_string(),
                api_key: None,
                model_name: "offline".to_string(),
                base_url: None,
                request_timeout_secs: 5,
            },
            reasoner: ReasonerConfig::default(),
            schema: SchemaConfig {
                max_connections: 1,
                ..SchemaConfig::default()
            },
            observability: ObservabilityConfig::default(),
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_model_name() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_dialect() -> String {
    "mysql".to_string()
}

fn default_max_schema_chars() -> usize {
    14_000
}

fn default_error_snippet_chars() -> usize {
    1_000
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_max_rows() -> usize {
    1000
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NlqConfig::test_defaults();
        assert_eq!(config.model.provider, "offline");
        assert!(config.api_key().is_none());
        assert_eq!(config.reasoner.max_schema_prompt_chars, 14_000);
        assert_eq!(config.reasoner.default_dialect, "mysql");
    }

    #[test]
    fn test_resolve_env_var() {
        unsafe {
            env::set_var("NLQ_TEST_VAR", "test_value");
        }

        let resolved = NlqConfig::resolve_env_var("${NLQ_TEST_VAR}");
        assert_eq!(resolved, Some("test_value".to_string()));

        let not_var = NlqConfig::resolve_env_var("plain_value");
        assert_eq!(not_var, Some("plain_value".to_string()));

        unsafe {
            env::remove_var("NLQ_TEST_VAR");
        }
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"
                [model]
                provider = "openai"
                model_name = "gpt-4o-mini"
                api_key = "sk-inline"
                request_timeout_secs = 12

                [reasoner]
                default_dialect = "postgres"
                max_schema_prompt_chars = 500

                [schema]
                output_dir = "/tmp/nlq"
            "#,
        )
        .unwrap();

        let config = NlqConfig::load_from(&path).unwrap();
        assert_eq!(config.model.provider, "openai");
        assert_eq!(config.api_key(), Some("sk-inline"));
        assert_eq!(config.model.request_timeout_secs, 12);
        assert_eq!(config.reasoner.default_dialect, "postgres");
        assert_eq!(config.reasoner.max_schema_prompt_chars, 500);
        assert_eq!(config.reasoner.error_snippet_chars, 1_000);
        assert_eq!(config.schema.output_dir, Some(PathBuf::from("/tmp/nlq")));
        assert_eq!(config.observability.log_format, "pretty");
    }

    #[test]
    fn test_unparseable_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[model\nprovider = ").unwrap();

        let err = NlqConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
