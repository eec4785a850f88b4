//! Knowledge base lifecycle.
//!
//! [`KnowledgeBase`] owns the vector index for one statute and moves
//! through three states:
//!
//! ```text
//!   NotReady ──build()──▶ Indexing ──▶ Ready
//!      ▲                     │           │
//!      └──── no sections ────┘           │
//!      └────────────── reset() ──────────┘
//! ```
//!
//! Building always starts from an empty index. A failed query leaves the
//! index as it was, so the next query can run immediately.

use serde::Serialize;
use tracing::{info, warn};

use crate::analysis::{AnalysisProvider, AnalysisRequest};
use crate::chunk::Chunker;
use crate::embedding::EmbeddingProvider;
use crate::error::{CoreError, Result};
use crate::index::VectorIndex;
use crate::ingest::{index_chunks, IndexOptions, IndexReport};
use crate::models::Chunk;
use crate::progress::{IndexProgressEvent, IndexProgressReporter};
use crate::query::{self, QueryOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KbState {
    NotReady,
    Indexing,
    Ready,
}

/// An owned, in-memory knowledge base over one statute.
pub struct KnowledgeBase {
    chunker: Chunker,
    index: VectorIndex,
    chunks: Vec<Chunk>,
    report: Option<IndexReport>,
    state: KbState,
}

impl KnowledgeBase {
    pub fn new(chunker: Chunker) -> Self {
        Self {
            chunker,
            index: VectorIndex::new(),
            chunks: Vec::new(),
            report: None,
            state: KbState::NotReady,
        }
    }

    pub fn state(&self) -> KbState {
        self.state
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Sections produced by the last successful chunking pass.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn last_report(&self) -> Option<&IndexReport> {
        self.report.as_ref()
    }

    /// Chunk `text`, embed every section, and become ready.
    ///
    /// Fails with [`CoreError::NoSections`] when chunking yields nothing;
    /// the knowledge base is then empty and `NotReady`. Per-chunk embedding
    /// failures do not fail the build; see the returned report.
    pub async fn build(
        &mut self,
        text: &str,
        embedder: &dyn EmbeddingProvider,
        options: &IndexOptions,
        reporter: &dyn IndexProgressReporter,
    ) -> Result<IndexReport> {
        self.reset();

        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            warn!("chunking produced no sections");
            return Err(CoreError::NoSections);
        }
        reporter.report(IndexProgressEvent::Chunked {
            total: chunks.len() as u64,
        });

        self.state = KbState::Indexing;
        let report = match index_chunks(&mut self.index, &chunks, embedder, options, reporter).await
        {
            Ok(report) => report,
            Err(e) => {
                self.reset();
                return Err(e);
            }
        };

        info!(
            sections = chunks.len(),
            indexed = report.indexed,
            "knowledge base ready"
        );
        self.chunks = chunks;
        self.report = Some(report.clone());
        self.state = KbState::Ready;
        Ok(report)
    }

    /// Drop all indexed state and return to `NotReady`.
    pub fn reset(&mut self) {
        self.index.clear();
        self.chunks.clear();
        self.report = None;
        self.state = KbState::NotReady;
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.state == KbState::Ready {
            Ok(())
        } else {
            Err(CoreError::NotReady)
        }
    }

    pub async fn ask(
        &self,
        embedder: &dyn EmbeddingProvider,
        analyzer: &dyn AnalysisProvider,
        query: &str,
        k: usize,
    ) -> Result<QueryOutcome> {
        self.ensure_ready()?;
        query::ask(&self.index, embedder, analyzer, query, k).await
    }

    pub async fn classify(
        &self,
        embedder: &dyn EmbeddingProvider,
        analyzer: &dyn AnalysisProvider,
        request: &AnalysisRequest,
        k: usize,
    ) -> Result<QueryOutcome> {
        self.ensure_ready()?;
        query::classify(&self.index, embedder, analyzer, request, k).await
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new(Chunker::default())
    }
}
