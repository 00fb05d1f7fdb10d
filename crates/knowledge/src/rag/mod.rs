//! Retrieval-augmented answering.
//!
//! Validates a question, retrieves context, asks the model and normalizes
//! whatever comes back into an `AnswerResult`.

pub mod generate;
pub mod normalize;
pub mod pipeline;
pub mod types;

pub use generate::AnswerGenerator;
pub use normalize::normalize_response;
pub use pipeline::{Question, RagPipeline, MIN_QUESTION_CHARS};
pub use types::{AnswerPolicy, AnswerResult};
