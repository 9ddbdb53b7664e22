use async_trait::async_trait;
use nlq_core::{Error, Result};
use reqwest::Client;
use std::time::Duration;

use crate::model::LanguageModel;
use crate::types::{OpenAIRequest, OpenAIResponse, snippet};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat-completions backend; works with any OpenAI-compatible server via `base_url`.
pub struct OpenAIModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl OpenAIModel {
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

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl LanguageModel for OpenAIModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn provider(&self) -> &str {
        "openai"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = OpenAIRequest::from_prompt(&self.model_name, prompt);

        tracing::debug!(model = %self.model_name, prompt_chars = prompt.len(), "Calling OpenAI");

        let response = self
            .client
            .post(self.build_url())
            .bearer_auth(&self.api_key)
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
                "OpenAI API returned {}: {}",
                status,
                snippet(&body, 300)
            )));
        }

        let parsed: OpenAIResponse = serde_json::from_str(&body)
            .map_err(|e| Error::backend(format!("Failed to parse response: {}", e)))?;

        if let Some(usage) = &parsed.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                total_tokens = usage.total_tokens,
                "OpenAI usage"
            );
        }

        parsed
            .text()
            .ok_or_else(|| Error::backend("OpenAI returned no message content"))
    }
}
