//! Core data models shared by the chunker, the vector index, and the
//! orchestrators.

use serde::{Deserialize, Serialize};

/// Span of a chunk in the source line sequence.
///
/// `start_line` is the zero-based index of the first source line that
/// belongs to the chunk; `end_line` is exclusive (the next header's line
/// index, or the total line count for the last chunk).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub start_line: usize,
    pub end_line: usize,
}

/// One addressable section of the statute.
///
/// Immutable once produced by the chunker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// `chunk-<n>`, zero-based within one chunking pass.
    pub id: String,
    /// The verbatim (trimmed) header line, or `"Preamble"`.
    pub title: String,
    /// Every kept source line of the section, newline-joined and trimmed.
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// A retrieved chunk with its cosine similarity to the query.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub similarity: f32,
}

/// A `(title, content)` pair handed to the analysis provider as grounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextPassage {
    pub title: String,
    pub content: String,
}

impl From<&Chunk> for ContextPassage {
    fn from(chunk: &Chunk) -> Self {
        Self {
            title: chunk.title.clone(),
            content: chunk.content.clone(),
        }
    }
}

/// Build the grounding passages for a set of search results, best match first.
pub fn passages(results: &[SearchResult]) -> Vec<ContextPassage> {
    results.iter().map(|r| ContextPassage::from(&r.chunk)).collect()
}
