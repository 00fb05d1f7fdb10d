//! Prompt construction for ragline.
//!
//! This crate turns a question, its retrieved context and the source list
//! into the system instruction and user message sent to the model:
//! - Fixed system instruction and refusal phrase
//! - Immutable `GenerationRequest`
//! - Handlebars rendering of the user message

pub mod builder;
pub mod instruction;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use instruction::{REFUSAL_PHRASE, RESPONSE_SHAPE, SYSTEM_INSTRUCTION};
pub use types::{BuiltPrompt, BuiltPromptMetadata, GenerationRequest};
