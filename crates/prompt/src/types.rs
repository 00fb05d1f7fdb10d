//! Prompt types for ragline.

use serde::{Deserialize, Serialize};

/// Everything the generator needs for one question.
///
/// Built once per pipeline run from the validated question and the
/// retrieval result, then handed to the generator once. Fields are
/// private so the request cannot change after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    question: String,
    context: String,
    sources: Vec<String>,
}

impl GenerationRequest {
    /// Create a new generation request.
    pub fn new(question: impl Into<String>, context: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            question: question.into(),
            context: context.into(),
            sources,
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    /// Concatenated retrieved passages; empty means "no evidence".
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Source identifiers supplied by retrieval.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System instruction
    pub system: String,

    /// User message: question, context and sources
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltPromptMetadata {
    /// Characters of retrieved context included
    pub context_chars: usize,

    /// Number of source identifiers listed
    pub source_count: usize,
}

impl BuiltPrompt {
    /// The system instruction inlined ahead of the user message.
    ///
    /// Used for providers without a dedicated system channel.
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}
