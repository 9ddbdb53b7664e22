use async_trait::async_trait;
use nlq_core::Result;

/// A stateless text-completion backend.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier, e.g. `gemini-2.5-pro`
    fn name(&self) -> &str;

    /// Provider identifier, e.g. `gemini`
    fn provider(&self) -> &str;

    /// Label recorded on every output this backend produced
    fn label(&self) -> String {
        format!("{}:{}", self.provider(), self.name())
    }

    /// Send one prompt and return the raw response text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}
