//! Model factory for creating backends from configuration

use nlq_core::{Error, ModelConfig, Result};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::model::LanguageModel;

/// Supported backend providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Google Gemini models
    Gemini,
    /// OpenAI and compatible chat-completions servers
    OpenAI,
    /// The deterministic rule-based substitute; no network access
    Offline,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::OpenAI => "openai",
            Provider::Offline => "offline",
        }
    }
}

impl FromStr for Provider {
    type Err = Error;

    /// # Example
    /// ```
    /// use nlq_model::Provider;
    ///
    /// let provider: Provider = "gemini".parse().unwrap();
    /// assert_eq!(provider, Provider::Gemini);
    /// ```
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Provider::Gemini),
            "openai" => Ok(Provider::OpenAI),
            "offline" | "mock" | "none" => Ok(Provider::Offline),
            _ => Err(Error::config_error(format!("Unknown provider: {}", s))),
        }
    }
}

/// Creates remote backends from configuration.
///
/// # Example
/// ```no_run
/// use nlq_core::NlqConfig;
/// use nlq_model::ModelFactory;
///
/// # fn example() -> nlq_core::Result<()> {
/// let config = NlqConfig::test_defaults();
/// let backend = ModelFactory::from_config(&config.model)?;
/// assert!(backend.is_none());
/// # Ok(())
/// # }
/// ```
pub struct ModelFactory;

impl ModelFactory {
    /// Build the configured remote backend.
    ///
    /// Returns `Ok(None)` when the offline substitute should be used: either
    /// it was asked for, or a remote provider has no API key.
    pub fn from_config(config: &ModelConfig) -> Result<Option<Arc<dyn LanguageModel>>> {
        let provider: Provider = config.provider.parse()?;
        let timeout = Duration::from_secs(config.request_timeout_secs.max(1));

        if provider == Provider::Offline {
            return Ok(None);
        }

        let Some(api_key) = config.api_key.clone().filter(|k| !k.is_empty()) else {
            tracing::info!(
                provider = provider.as_str(),
                "No API key configured, falling back to the offline backend"
            );
            return Ok(None);
        };

        match provider {
            Provider::Gemini => Self::create_gemini(api_key, config, timeout).map(Some),
            Provider::OpenAI => Self::create_openai(api_key, config, timeout).map(Some),
            Provider::Offline => Ok(None),
        }
    }

    #[cfg(feature = "gemini")]
    fn create_gemini(
        api_key: String,
        config: &ModelConfig,
        timeout: Duration,
    ) -> Result<Arc<dyn LanguageModel>> {
        use crate::gemini::GeminiModel;

        let mut model = GeminiModel::new(api_key, config.model_name.clone(), timeout)?;
        if let Some(base_url) = config.base_url.as_deref() {
            model = model.with_base_url(base_url);
        }
        Ok(Arc::new(model))
    }

    #[cfg(not(feature = "gemini"))]
    fn create_gemini(
        _api_key: String,
        _config: &ModelConfig,
        _timeout: Duration,
    ) -> Result<Arc<dyn LanguageModel>> {
        Err(Error::config_error(
            "Gemini support not enabled. Enable the 'gemini' feature.",
        ))
    }

    #[cfg(feature = "openai")]
    fn create_openai(
        api_key: String,
        config: &ModelConfig,
        timeout: Duration,
    ) -> Result<Arc<dyn LanguageModel>> {
        use crate::openai::OpenAIModel;

        let mut model = OpenAIModel::new(api_key, config.model_name.clone(), timeout)?;
        if let Some(base_url) = config.base_url.as_deref() {
            model = model.with_base_url(base_url);
        }
        Ok(Arc::new(model))
    }

    #[cfg(not(feature = "openai"))]
    fn create_openai(
        _api_key: String,
        _config: &ModelConfig,
        _timeout: Duration,
    ) -> Result<Arc<dyn LanguageModel>> {
        Err(Error::config_error(
            "OpenAI support not enabled. Enable the 'openai' feature.",
        ))
    }
}
