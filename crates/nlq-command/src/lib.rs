//! Command processing for nlq
//!
//! Turns raw user text into hints for the reasoner: a normalized form, a
//! coarse intent with its own confidence, and the tables, columns and
//! conditions the text mentions. Nothing here is required for the reasoner
//! to work; a [`CommandPayload`](nlq_core::CommandPayload) can be built by
//! hand just as well.

pub mod document;
pub mod entities;
pub mod intent;
pub mod normalize;
pub mod processor;

pub use document::SchemaDocument;
pub use entities::{Condition, Entities, extract_entities};
pub use intent::{IntentClassifier, IntentRule};
pub use normalize::normalize;
pub use processor::{CommandProcessor, ProcessedCommand};
