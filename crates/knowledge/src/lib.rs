//! Retrieval and answering over a pre-built knowledge index.
//!
//! The index is a SQLite file produced by a separate ingestion job. This
//! crate loads it once into memory, embeds questions, ranks chunks by
//! cosine similarity and runs the answering pipeline on top.

pub mod embeddings;
pub mod index;
pub mod rag;
pub mod retriever;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use index::IndexSnapshot;
pub use rag::{AnswerGenerator, AnswerPolicy, AnswerResult, Question, RagPipeline};
pub use retriever::{IndexRetriever, Retriever, DEFAULT_TOP_K};
pub use types::{ContextChunk, RetrievalResult, ScoredChunk, SourceStats};
