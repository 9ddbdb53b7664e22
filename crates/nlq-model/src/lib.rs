//! Language model backends for nlq
//!
//! Every backend answers one prompt with one block of text. No streaming and
//! no conversation state: the prompt carries all context.

pub mod factory;
pub mod gemini;
pub mod model;
pub mod openai;
pub mod types;

pub use factory::{ModelFactory, Provider};
pub use gemini::GeminiModel;
pub use model::LanguageModel;
pub use openai::OpenAIModel;
