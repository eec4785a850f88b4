//! Error type for the retrieval core.
//!
//! Provider implementations return `anyhow::Result`; the orchestrators
//! translate those failures into the variants below so callers can tell a
//! broken knowledge base apart from a single failed query.

/// Errors raised by chunking, the vector index, and the orchestrators.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("no sections found in the source text")]
    NoSections,
    #[error("knowledge base is not ready")]
    NotReady,
    #[error("query must not be empty")]
    EmptyQuery,
    #[error("batch size must be greater than zero")]
    InvalidBatchSize,
    #[error("chunk already indexed: {0}")]
    DuplicateChunk(String),
    #[error("vector record {0} has no chunk in the lookup")]
    MissingChunk(String),
    #[error("embedding dimension mismatch: query has {query}, record {chunk_id} has {stored}")]
    DimensionMismatch {
        chunk_id: String,
        query: usize,
        stored: usize,
    },
    #[error("query embedding failed: {0}")]
    QueryEmbedding(String),
    #[error("analysis provider failed: {0}")]
    Analysis(String),
    #[error("drafting provider failed: {0}")]
    Drafting(String),
}

/// Result alias used across the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
