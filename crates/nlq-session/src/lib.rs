//! Per-session context for nlq
//!
//! A [`QuerySession`] owns one schema manager, one reasoner and one command
//! processor. Keeping them together means a schema update and the reasoning
//! call that depends on it can never interleave with another user's request.

pub mod history;
pub mod session;

pub use history::{HistoryEntry, SessionStats};
pub use session::{AskOptions, DEFAULT_HISTORY_LIMIT, QuerySession};
