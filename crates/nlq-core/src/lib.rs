//! Core contracts for the nlq pipeline
//!
//! This crate holds the pieces every other crate agrees on: the error taxonomy,
//! configuration loading, and the request/result types that cross the reasoning
//! boundary.

pub mod config;
pub mod error;
pub mod types;

// Re-exports
pub use config::{
    ModelConfig, NlqConfig, ObservabilityConfig, ReasonerConfig, SchemaConfig,
};
pub use error::{Error, Result};
pub use types::{
    BLOCKED_DESTRUCTIVE_ERROR, BLOCKED_DESTRUCTIVE_WARNING, CommandPayload, DatabaseType, Dialect, Intent,
    OutputMetadata, ReasonerOutput,
};
