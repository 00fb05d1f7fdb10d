//! Read-only access to the pre-built SQLite index.
//!
//! The index is produced by an external ingestion job. At startup the
//! whole chunk table is loaded into an immutable in-memory snapshot that
//! is shared across requests without locking.

use crate::types::{IndexedChunk, ScoredChunk, SourceStats};
use ragline_core::{AppError, AppResult};
use rusqlite::{Connection, OpenFlags};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Source identifier used when a source row has neither URL nor path.
pub const UNKNOWN_SOURCE: &str = "unknown";

const LOAD_CHUNKS_SQL: &str = "SELECT c.id, c.text, c.embedding, s.url, s.path
     FROM chunks c
     LEFT JOIN sources s ON s.id = c.source_id
     ORDER BY c.rowid";

/// Immutable in-memory copy of the index.
#[derive(Debug)]
pub struct IndexSnapshot {
    path: PathBuf,
    chunks: Vec<IndexedChunk>,
    dimensions: Option<usize>,
}

impl IndexSnapshot {
    /// Open the index at `path` read-only and load every chunk.
    ///
    /// # Errors
    /// `AppError::RetrieverUnavailable` when the file is missing, is not a
    /// valid index, or holds embeddings of inconsistent size.
    pub fn open(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Err(AppError::RetrieverUnavailable(format!(
                "Index not found at {:?}",
                path
            )));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| unavailable(path, "open", e))?;

        let chunks = load_chunks(&conn).map_err(|e| unavailable(path, "read", e))?;
        let snapshot = Self::from_chunks(path.to_path_buf(), chunks)?;

        if snapshot.is_empty() {
            tracing::warn!("Index at {:?} contains no chunks", path);
        }

        tracing::info!(
            chunks = snapshot.len(),
            dimensions = ?snapshot.dimensions,
            "Loaded index from {:?}",
            path
        );

        Ok(snapshot)
    }

    /// Build a snapshot from already-loaded chunks.
    pub fn from_chunks(path: PathBuf, chunks: Vec<IndexedChunk>) -> AppResult<Self> {
        let dimensions = chunks.first().map(|c| c.embedding.len());

        if let Some(expected) = dimensions {
            if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != expected) {
                return Err(AppError::RetrieverUnavailable(format!(
                    "Index at {:?} mixes embedding sizes: chunk '{}' has {}, expected {}",
                    path,
                    bad.id,
                    bad.embedding.len(),
                    expected
                )));
            }
        }

        Ok(Self {
            path,
            chunks,
            dimensions,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Embedding size shared by all chunks; `None` for an empty index.
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    /// Top-k chunks by cosine similarity, best first.
    ///
    /// Ties keep index order.
    pub fn search(&self, query_embedding: &[f32], top_k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<(usize, f32)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| (i, cosine_similarity(query_embedding, &chunk.embedding)))
            .collect();

        // sort_by is stable, so equal scores stay in index order
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        tracing::debug!(
            "Retrieved {} chunks (requested top-{})",
            scored.len(),
            top_k
        );

        scored
            .into_iter()
            .map(|(i, score)| {
                let chunk = &self.chunks[i];
                ScoredChunk {
                    chunk: crate::types::ContextChunk {
                        text: chunk.text.clone(),
                        source: chunk.source.clone(),
                    },
                    score,
                }
            })
            .collect()
    }

    /// Chunk counts per source, largest first.
    pub fn stats(&self) -> Vec<SourceStats> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for chunk in &self.chunks {
            *counts.entry(chunk.source.as_str()).or_insert(0) += 1;
        }

        let mut stats: Vec<SourceStats> = counts
            .into_iter()
            .map(|(source, chunks)| SourceStats {
                source: source.to_string(),
                chunks,
            })
            .collect();

        stats.sort_by(|a, b| b.chunks.cmp(&a.chunks).then_with(|| a.source.cmp(&b.source)));
        stats
    }
}

fn unavailable(path: &Path, action: &str, err: rusqlite::Error) -> AppError {
    AppError::RetrieverUnavailable(format!(
        "Failed to {} index at {:?}: {}",
        action, path, err
    ))
}

fn load_chunks(conn: &Connection) -> rusqlite::Result<Vec<IndexedChunk>> {
    let mut stmt = conn.prepare(LOAD_CHUNKS_SQL)?;

    let rows = stmt.query_map([], |row| {
        let embedding_bytes: Vec<u8> = row.get(2)?;
        let embedding = bytes_to_embedding(&embedding_bytes).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Blob, Box::new(e))
        })?;

        let url: Option<String> = row.get(3)?;
        let path: Option<String> = row.get(4)?;

        Ok(IndexedChunk {
            id: row.get(0)?,
            text: row.get(1)?,
            embedding,
            source: source_identifier(url.as_deref(), path.as_deref()),
        })
    })?;

    let chunks = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(chunks)
}

/// Source identifier for a source row: URL, else `file://<name>`, else `unknown`.
pub fn source_identifier(url: Option<&str>, path: Option<&str>) -> String {
    if let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) {
        return url.to_string();
    }

    if let Some(path) = path.map(str::trim).filter(|p| !p.is_empty()) {
        let name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());
        return format!("file://{}", name);
    }

    UNKNOWN_SOURCE.to_string()
}

/// Convert little-endian f32 bytes back to an embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(format!(
            "Invalid embedding blob length {}",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
