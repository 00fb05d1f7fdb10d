//! Retrieval over the loaded index.

use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::index::IndexSnapshot;
use crate::types::{RetrievalResult, ScoredChunk};
use ragline_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;

/// Number of chunks retrieved per question unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 4;

/// Given a query, return the most similar chunks.
#[async_trait::async_trait]
pub trait Retriever: Send + Sync {
    /// Top-k chunks with scores, best first.
    async fn search(&self, query: &str, k: usize) -> AppResult<Vec<ScoredChunk>>;

    /// Top-k chunks aggregated into a context blob and source list.
    async fn get_context(&self, query: &str, k: usize) -> AppResult<RetrievalResult> {
        let hits = self.search(query, k).await?;
        Ok(RetrievalResult::from_chunks(hits.iter().map(|hit| &hit.chunk)))
    }
}

/// Cosine-similarity retriever over an in-memory index snapshot.
pub struct IndexRetriever {
    index: Arc<IndexSnapshot>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl IndexRetriever {
    /// Pair an index with the embedder used for queries.
    ///
    /// # Errors
    /// `AppError::RetrieverUnavailable` when the embedder's dimensions do
    /// not match the vectors stored in the index.
    pub fn new(index: Arc<IndexSnapshot>, embedder: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        if let Some(stored) = index.dimensions() {
            if stored != embedder.dimensions() {
                return Err(AppError::RetrieverUnavailable(format!(
                    "Index at {:?} stores {}-dimensional embeddings but provider '{}' (model '{}') produces {}",
                    index.path(),
                    stored,
                    embedder.provider_name(),
                    embedder.model_name(),
                    embedder.dimensions()
                )));
            }
        }

        Ok(Self { index, embedder })
    }

    /// Open the configured index and query embedder.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let index = Arc::new(IndexSnapshot::open(&config.retrieval.index_path)?);
        let embedder = create_provider(&config.retrieval.embedding)?;
        Self::new(index, embedder)
    }

    pub fn index(&self) -> &IndexSnapshot {
        &self.index
    }
}

#[async_trait::async_trait]
impl Retriever for IndexRetriever {
    async fn search(&self, query: &str, k: usize) -> AppResult<Vec<ScoredChunk>> {
        if self.index.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        Ok(self.index.search(&query_embedding, k))
    }
}
