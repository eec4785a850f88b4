//! Query orchestrator: embed → retrieve → analyze.
//!
//! Two entry points, one per reply shape:
//!
//! | Function | Provider call | Answer |
//! |----------|---------------|--------|
//! | [`ask`] | [`AnalysisProvider::answer`] | [`Answer::Text`] |
//! | [`classify`] | [`AnalysisProvider::analyze`] | [`Answer::Structured`] |
//!
//! A query that cannot be embedded cannot be answered, so embedding
//! failures are returned to the caller, not swallowed. The index is only
//! read.

use serde::Serialize;
use tracing::{debug, info};

use crate::analysis::{
    AnalysisProvider, AnalysisRequest, Answer, DraftingProvider, LegalAnalysis,
};
use crate::embedding::EmbeddingProvider;
use crate::error::{CoreError, Result};
use crate::index::VectorIndex;
use crate::models::{passages, SearchResult};

/// Retrieved sections plus the provider's reply, unmodified.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub results: Vec<SearchResult>,
    pub answer: Answer,
}

impl QueryOutcome {
    pub fn analysis(&self) -> Option<&LegalAnalysis> {
        match &self.answer {
            Answer::Structured(a) => Some(a),
            Answer::Text(_) => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.answer {
            Answer::Text(t) => Some(t),
            Answer::Structured(_) => None,
        }
    }
}

/// Embed `text` and return the top `k` sections.
pub async fn retrieve(
    index: &VectorIndex,
    embedder: &dyn EmbeddingProvider,
    text: &str,
    k: usize,
) -> Result<Vec<SearchResult>> {
    if text.trim().is_empty() {
        return Err(CoreError::EmptyQuery);
    }
    let vector = embedder
        .embed(text)
        .await
        .map_err(|e| CoreError::QueryEmbedding(format!("{:#}", e)))?;
    let results = index.search(&vector, k)?;
    debug!(
        k,
        hits = results.len(),
        top = results.first().map(|r| r.chunk.title.as_str()).unwrap_or(""),
        "retrieved sections"
    );
    Ok(results)
}

/// Free-text question answering over the indexed statute.
pub async fn ask(
    index: &VectorIndex,
    embedder: &dyn EmbeddingProvider,
    analyzer: &dyn AnalysisProvider,
    query: &str,
    k: usize,
) -> Result<QueryOutcome> {
    let results = retrieve(index, embedder, query, k).await?;
    let context = passages(&results);
    let answer = analyzer
        .answer(query, &context)
        .await
        .map_err(|e| CoreError::Analysis(format!("{:#}", e)))?;
    info!(hits = results.len(), "answered query");
    Ok(QueryOutcome {
        results,
        answer: Answer::Text(answer),
    })
}

/// Structured classification of a complaint narrative.
///
/// A reply that does not parse becomes [`LegalAnalysis::fallback`]; only
/// transport failures surface as [`CoreError::Analysis`].
pub async fn classify(
    index: &VectorIndex,
    embedder: &dyn EmbeddingProvider,
    analyzer: &dyn AnalysisProvider,
    request: &AnalysisRequest,
    k: usize,
) -> Result<QueryOutcome> {
    let results = retrieve(index, embedder, &request.narrative, k).await?;
    let context = passages(&results);
    let raw = analyzer
        .analyze(request, &context)
        .await
        .map_err(|e| CoreError::Analysis(format!("{:#}", e)))?;
    let analysis = LegalAnalysis::from_response(&raw);
    info!(
        classification = %analysis.classification,
        section = %analysis.bns_section,
        confidence = analysis.confidence_score,
        "classified complaint"
    );
    Ok(QueryOutcome {
        results,
        answer: Answer::Structured(analysis),
    })
}

/// Draft a report from a narrative and its analysis.
pub async fn draft_report(
    drafter: &dyn DraftingProvider,
    narrative: &str,
    analysis: &LegalAnalysis,
) -> Result<String> {
    if narrative.trim().is_empty() {
        return Err(CoreError::EmptyQuery);
    }
    drafter
        .draft(narrative, analysis)
        .await
        .map_err(|e| CoreError::Drafting(format!("{:#}", e)))
}
