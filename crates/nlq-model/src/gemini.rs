use async_trait::async_trait;
use nlq_core::{Error, Result};
use reqwest::Client;
use std::time::Duration;

use crate::model::LanguageModel;
use crate::types::{GeminiRequest, GeminiResponse, snippet};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl GeminiModel {
    /// Create a Gemini model using the public API endpoint.
    ///
    /// The key travels in the `x-goog-api-key` header so it never appears
    /// in request URLs or the errors built from them.
    pub fn new(api_key: String, model_name: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::backend(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            model_name,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point at a different endpoint (proxies, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_url(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model_name)
    }
}

#[async_trait]
impl LanguageModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn provider(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GeminiRequest::from_prompt(prompt);

        tracing::debug!(model = %self.model_name, prompt_chars = prompt.len(), "Calling Gemini");

        let response = self
            .client
            .post(self.build_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::backend(format!("Request failed: {}", e.without_url())))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::backend(format!("Failed to read response: {}", e.without_url())))?;

        if !status.is_success() {
            return Err(Error::backend(format!(
                "Gemini API returned {}: {}",
                status,
                snippet(&body, 300)
            )));
        }

        let parsed: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| Error::backend(format!("Failed to parse response: {}", e)))?;

        if let Some(usage) = &parsed.usage_metadata {
            tracing::debug!(
                prompt_tokens = ?usage.prompt_token_count,
                total_tokens = ?usage.total_token_count,
                "Gemini usage"
            );
        }

        parsed
            .text()
            .ok_or_else(|| Error::backend("Gemini returned no candidate text"))
    }
}
