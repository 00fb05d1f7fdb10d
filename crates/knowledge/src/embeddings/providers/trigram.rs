//! Offline trigram embeddings.
//!
//! Deterministic, content-dependent vectors built from hashed character
//! trigrams and whole words. Not semantically accurate like a neural
//! model, but it needs no network and matches indexes built with the
//! `trigram-v1` model.

use crate::embeddings::provider::EmbeddingProvider;
use ragline_core::AppResult;
use std::collections::HashMap;

const MODEL_NAME: &str = "trigram-v1";

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them",
];

/// Trigram-based embedding provider for local, offline operation.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
}

impl TrigramProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Embed one text; the result is unit length unless the text has no
    /// usable words, in which case it is all zeros.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return embedding;
        }

        let lower = text.to_lowercase();
        let mut frequencies: HashMap<&str, u32> = HashMap::new();
        for word in lower
            .split_whitespace()
            .filter(|w| w.len() > 2 && !STOP_WORDS.contains(w))
        {
            *frequencies.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &frequencies {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                let bucket = bucket(&trigram, 37, self.dimensions);
                embedding[bucket] += (*freq as f32).sqrt();
            }

            embedding[bucket(word, 31, self.dimensions)] += *freq as f32;
        }

        normalize(&mut embedding);
        embedding
    }
}

/// Polynomial byte hash reduced to a dimension index.
fn bucket(token: &str, multiplier: u64, dimensions: usize) -> usize {
    let hash = token
        .bytes()
        .fold(0u64, |acc, b| acc.wrapping_mul(multiplier).wrapping_add(b as u64));
    (hash as usize) % dimensions
}

fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}
