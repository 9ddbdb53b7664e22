use chrono::{DateTime, Utc};
use nlq_core::ReasonerOutput;
use serde::Serialize;

/// One answered request
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub asked_at: DateTime<Utc>,
    pub text: String,
    pub sql: Option<String>,
    pub intent: String,
    pub confidence: f32,
    pub safe_to_execute: bool,
    /// Set once the SQL has been run
    pub executed: bool,
}

impl HistoryEntry {
    pub fn new(text: &str, output: &ReasonerOutput) -> Self {
        Self {
            asked_at: Utc::now(),
            text: text.to_string(),
            sql: output.sql.clone(),
            intent: output.intent.clone(),
            confidence: output.confidence,
            safe_to_execute: output.safe_to_execute,
            executed: false,
        }
    }
}

/// Running totals over a session's history
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStats {
    pub total: usize,
    pub safe: usize,
    pub executed: usize,
    pub average_confidence: f32,
}

impl SessionStats {
    pub fn from_history(history: &[HistoryEntry]) -> Self {
        if history.is_empty() {
            return Self::default();
        }
        let total = history.len();
        Self {
            total,
            safe: history.iter().filter(|h| h.safe_to_execute).count(),
            executed: history.iter().filter(|h| h.executed).count(),
            average_confidence: history.iter().map(|h| h.confidence).sum::<f32>() / total as f32,
        }
    }
}
