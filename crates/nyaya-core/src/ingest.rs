//! Indexing orchestrator: chunk → embed → insert, in batches.
//!
//! Chunks are embedded in fixed-size batches. Inside a batch every chunk is
//! embedded concurrently and the batch is joined before anything is
//! inserted, so batch `N` is fully committed before batch `N + 1` starts
//! and at most `batch_size` embedding calls are in flight.
//!
//! A chunk whose embedding fails is logged and skipped. The run still
//! completes; the [`IndexReport`] says exactly which chunks are missing.

use futures_util::future::join_all;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::embedding::EmbeddingProvider;
use crate::error::{CoreError, Result};
use crate::index::VectorIndex;
use crate::models::Chunk;
use crate::progress::{IndexProgressEvent, IndexProgressReporter};

pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(50);

/// Batching knobs for [`index_chunks`].
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Embedding calls issued concurrently per batch. Must be > 0.
    pub batch_size: usize,
    /// Pause between batches to smooth the request rate. Zero disables it.
    pub batch_delay: Duration,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
        }
    }
}

/// A chunk that did not make it into the index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedChunk {
    pub id: String,
    pub error: String,
}

/// Coverage of one indexing run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexReport {
    pub total: usize,
    pub indexed: usize,
    pub failed: Vec<FailedChunk>,
    pub batches: usize,
}

impl IndexReport {
    /// Fraction of chunks that were indexed, `1.0` for an empty run.
    pub fn coverage(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.indexed as f64 / self.total as f64
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Embed `chunks` and insert them into `index`.
///
/// The index is not cleared first; callers start a fresh session with
/// [`VectorIndex::clear`]. Only an invalid batch size fails the call.
/// Embedding errors and duplicate identifiers are recorded per chunk.
pub async fn index_chunks(
    index: &mut VectorIndex,
    chunks: &[Chunk],
    embedder: &dyn EmbeddingProvider,
    options: &IndexOptions,
    reporter: &dyn IndexProgressReporter,
) -> Result<IndexReport> {
    if options.batch_size == 0 {
        return Err(CoreError::InvalidBatchSize);
    }

    let total = chunks.len();
    let batches = total.div_ceil(options.batch_size);
    let mut report = IndexReport {
        total,
        ..IndexReport::default()
    };

    info!(
        total,
        batches,
        batch_size = options.batch_size,
        model = embedder.model_name(),
        "indexing started"
    );

    let mut processed = 0usize;
    for (n, batch) in chunks.chunks(options.batch_size).enumerate() {
        let vectors = join_all(batch.iter().map(|chunk| embedder.embed(&chunk.content))).await;

        for (chunk, result) in batch.iter().zip(vectors) {
            let outcome = match result {
                Ok(vector) => index.insert(chunk.clone(), vector).map_err(|e| e.to_string()),
                Err(e) => Err(format!("{:#}", e)),
            };
            match outcome {
                Ok(()) => report.indexed += 1,
                Err(error) => {
                    warn!(chunk_id = %chunk.id, title = %chunk.title, %error, "skipping chunk");
                    report.failed.push(FailedChunk {
                        id: chunk.id.clone(),
                        error,
                    });
                }
            }
        }

        processed = (processed + options.batch_size).min(total);
        report.batches += 1;
        debug!(batch = n + 1, batches, processed, total, "batch committed");
        reporter.report(IndexProgressEvent::Batch {
            batch: (n + 1) as u64,
            batches: batches as u64,
            processed: processed as u64,
            total: total as u64,
        });

        if n + 1 < batches && !options.batch_delay.is_zero() {
            tokio::time::sleep(options.batch_delay).await;
        }
    }

    info!(
        indexed = report.indexed,
        failed = report.failed.len(),
        total,
        "indexing finished"
    );
    reporter.report(IndexProgressEvent::Finished {
        indexed: report.indexed as u64,
        failed: report.failed.len() as u64,
        total: total as u64,
    });

    Ok(report)
}
