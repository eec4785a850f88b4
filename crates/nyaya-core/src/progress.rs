//! Indexing progress events.
//!
//! The indexing orchestrator reports through an [`IndexProgressReporter`]
//! after chunking, after every batch, and once at the end. The app crate
//! provides terminal reporters; the core only ships [`NoProgress`].

/// A single progress event for an indexing run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexProgressEvent {
    /// Chunking finished; `total` sections will be embedded.
    Chunked { total: u64 },
    /// Batch `batch` of `batches` is done; `processed` chunks attempted so far.
    Batch {
        batch: u64,
        batches: u64,
        processed: u64,
        total: u64,
    },
    /// Run complete. `indexed + failed == total`.
    Finished { indexed: u64, failed: u64, total: u64 },
}

/// Receives progress events from the indexing pipeline.
pub trait IndexProgressReporter: Send + Sync {
    fn report(&self, event: IndexProgressEvent);
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl IndexProgressReporter for NoProgress {
    fn report(&self, _event: IndexProgressEvent) {}
}
