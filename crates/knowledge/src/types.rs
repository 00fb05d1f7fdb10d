//! Knowledge system type definitions.

use serde::{Deserialize, Serialize};

/// Separator placed between chunk texts when building the context blob.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// A chunk loaded from the on-disk index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedChunk {
    /// Chunk identifier
    pub id: String,

    /// Source identifier (URL or `file://` reference)
    pub source: String,

    /// Chunk text
    pub text: String,

    /// Embedding vector
    pub embedding: Vec<f32>,
}

/// A unit of retrieved text with the source it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextChunk {
    pub text: String,
    pub source: String,
}

/// A retrieved chunk with its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    #[serde(flatten)]
    pub chunk: ContextChunk,

    /// Cosine similarity to the query
    pub score: f32,
}

/// Everything retrieval produced for one question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Chunk texts joined with `CONTEXT_SEPARATOR`; empty when nothing matched
    pub context: String,

    /// De-duplicated source identifiers, first occurrence first
    pub sources: Vec<String>,
}

impl RetrievalResult {
    /// Aggregate chunks into a context blob and a de-duplicated source list.
    pub fn from_chunks<'a, I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = &'a ContextChunk>,
    {
        let mut texts = Vec::new();
        let mut sources: Vec<String> = Vec::new();

        for chunk in chunks {
            texts.push(chunk.text.as_str());
            if !sources.iter().any(|s| s == &chunk.source) {
                sources.push(chunk.source.clone());
            }
        }

        Self {
            context: texts.join(CONTEXT_SEPARATOR),
            sources,
        }
    }

    /// Whether retrieval found no evidence at all.
    pub fn is_empty(&self) -> bool {
        self.context.trim().is_empty()
    }
}

/// Chunk count for one source, as reported by index inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStats {
    pub source: String,
    pub chunks: usize,
}
