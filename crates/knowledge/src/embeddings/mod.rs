//! Query embeddings.
//!
//! Questions are embedded with the same provider that built the index so
//! that cosine similarity against stored chunk vectors is meaningful.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
