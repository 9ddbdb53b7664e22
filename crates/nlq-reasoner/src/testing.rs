//! Test doubles for code that drives a [`Reasoner`](crate::Reasoner)

use async_trait::async_trait;
use nlq_core::{Error, Result};
use nlq_model::LanguageModel;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Scripted backend for testing
///
/// Answers each call with the next queued response (the last one repeats
/// once the queue is down to it) and records every prompt it was sent.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<std::result::Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedModel {
    /// Answer every call with `response`
    pub fn with_response(response: impl Into<String>) -> Self {
        Self::with_responses([response.into()])
    }

    pub fn with_responses(responses: impl IntoIterator<Item = String>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            prompts: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Fail every call with a backend error
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from([Err(message.into())])),
            prompts: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before answering, to exercise request timeouts
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Prompts received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    fn next_response(&self) -> Result<String> {
        let mut queue = self
            .responses
            .lock()
            .map_err(|_| Error::backend("scripted model lock poisoned"))?;

        let next = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };

        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(Error::backend(message)),
            None => Err(Error::backend("scripted model has no responses")),
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    fn provider(&self) -> &str {
        "test"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.next_response()
    }
}
