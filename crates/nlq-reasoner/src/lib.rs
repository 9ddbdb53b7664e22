//! NL→SQL reasoning for nlq
//!
//! [`Reasoner`] turns a [`nlq_core::CommandPayload`] into a
//! [`nlq_core::ReasonerOutput`]: it builds a prompt around the active schema
//! text, asks a backend for a JSON answer, validates the SQL inside it and
//! applies the destructive-operation gate.
//!
//! Without a configured backend the [`RuleBasedModel`] answers instead, so
//! the whole pipeline runs without network access.

pub mod gate;
pub mod offline;
pub mod prompt;
pub mod reasoner;
pub mod response;
pub mod testing;
pub mod validator;

pub use gate::{decide, output_confidence};
pub use offline::RuleBasedModel;
pub use prompt::{NO_SCHEMA_PLACEHOLDER, PromptBuilder, TRUNCATION_MARKER};
pub use reasoner::Reasoner;
pub use response::{ModelReply, parse_reply, strip_code_fences};
pub use validator::{SqlValidator, Validation, ValidationMode};
