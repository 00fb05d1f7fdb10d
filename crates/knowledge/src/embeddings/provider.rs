//! Embedding provider trait and factory.

use super::providers::{OllamaEmbeddingProvider, TrigramProvider};
use ragline_core::config::{EmbeddingSettings, KNOWN_EMBEDDING_PROVIDERS};
use ragline_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "trigram", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Knowledge("No embedding returned".to_string()))
    }
}

/// Create an embedding provider from the `retrieval.embedding` settings.
pub fn create_provider(settings: &EmbeddingSettings) -> AppResult<Arc<dyn EmbeddingProvider>> {
    if settings.dimensions == 0 {
        return Err(AppError::Config(
            "Embedding dimensions must be greater than zero".to_string(),
        ));
    }

    tracing::debug!(
        provider = %settings.provider,
        model = %settings.model,
        dimensions = settings.dimensions,
        "Creating embedding provider"
    );

    match settings.provider.to_lowercase().as_str() {
        "trigram" => Ok(Arc::new(TrigramProvider::new(settings.dimensions))),

        "ollama" => {
            let provider = OllamaEmbeddingProvider::new(
                settings.endpoint.as_deref(),
                &settings.model,
                settings.dimensions,
            )?;
            Ok(Arc::new(provider))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: {}",
            settings.provider,
            KNOWN_EMBEDDING_PROVIDERS.join(", ")
        ))),
    }
}
