//! In-memory vector index with brute-force cosine search.
//!
//! Records are kept in insertion order next to a `chunk id → Chunk`
//! lookup; both structures are only ever mutated together. Search is a
//! full scan followed by a stable sort, so a query costs
//! `O(n·d + n log n)`. That is fine for one statute (tens to a few
//! thousand sections) and is not meant to scale beyond it.
//!
//! The index is a plain owned value with `&mut self` mutation. It is built
//! and queried from one control flow; callers that share it across tasks
//! wrap it themselves.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::{CoreError, Result};
use crate::models::{Chunk, SearchResult};

struct VectorRecord {
    chunk_id: String,
    embedding: Vec<f32>,
}

/// Owned in-memory index of chunk embeddings.
#[derive(Default)]
pub struct VectorIndex {
    records: Vec<VectorRecord>,
    chunks: HashMap<String, Chunk>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `chunk` with its embedding.
    ///
    /// Identifiers are unique: inserting an id that is already present
    /// fails with [`CoreError::DuplicateChunk`] and leaves the index as it was.
    pub fn insert(&mut self, chunk: Chunk, embedding: Vec<f32>) -> Result<()> {
        if self.chunks.contains_key(&chunk.id) {
            return Err(CoreError::DuplicateChunk(chunk.id));
        }
        self.records.push(VectorRecord {
            chunk_id: chunk.id.clone(),
            embedding,
        });
        self.chunks.insert(chunk.id.clone(), chunk);
        Ok(())
    }

    /// Drop every record and chunk.
    pub fn clear(&mut self) {
        self.records.clear();
        self.chunks.clear();
    }

    /// Number of stored vector records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, chunk_id: &str) -> Option<&Chunk> {
        self.chunks.get(chunk_id)
    }

    /// Indexed chunks in insertion order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.records
            .iter()
            .filter_map(move |r| self.chunks.get(&r.chunk_id))
    }

    /// Return the `k` records most similar to `query`, best first.
    ///
    /// Ties keep insertion order. A zero-magnitude vector on either side
    /// scores NaN; NaN scores rank after every real score. Returns fewer
    /// than `k` results when the index is smaller, and none when it is empty.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let mut scored = Vec::with_capacity(self.records.len());
        for record in &self.records {
            if record.embedding.len() != query.len() {
                return Err(CoreError::DimensionMismatch {
                    chunk_id: record.chunk_id.clone(),
                    query: query.len(),
                    stored: record.embedding.len(),
                });
            }
            scored.push((record, cosine_similarity(query, &record.embedding)));
        }

        scored.sort_by(|a, b| descending(a.1, b.1));

        scored
            .into_iter()
            .take(k)
            .map(|(record, similarity)| {
                let chunk = self
                    .chunks
                    .get(&record.chunk_id)
                    .ok_or_else(|| CoreError::MissingChunk(record.chunk_id.clone()))?;
                Ok(SearchResult {
                    chunk: chunk.clone(),
                    similarity,
                })
            })
            .collect()
    }
}

/// Total descending order on similarity scores with NaN last.
fn descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// Cosine similarity of two equal-length vectors.
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
///
/// A zero-magnitude input yields NaN; it is not guarded.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}
