//! nlq: natural-language questions over SQL databases
//!
//! Facade over the workspace crates. Most callers only need
//! [`QuerySession`]; the member crates are re-exported for finer control.

pub use nlq_command as command;
pub use nlq_core as core;
pub use nlq_model as model;
pub use nlq_reasoner as reasoner;
pub use nlq_schema as schema;
pub use nlq_session as session;
pub use nlq_telemetry as telemetry;

pub use nlq_core::{
    CommandPayload, DatabaseType, Dialect, Error, Intent, NlqConfig, ReasonerOutput, Result,
};
pub use nlq_reasoner::Reasoner;
pub use nlq_schema::{ConnectionParams, SchemaManager};
pub use nlq_session::{AskOptions, QuerySession};
