//! In-process fake providers shared by the unit tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::analysis::{AnalysisProvider, AnalysisRequest, DraftingProvider, LegalAnalysis};
use crate::embedding::EmbeddingProvider;
use crate::models::ContextPassage;
use crate::progress::{IndexProgressEvent, IndexProgressReporter};

/// Embeds text as `[len, vowels, 1]`, or a pinned vector; fails for
/// configured texts.
pub struct FakeEmbedder {
    pub fail_on: HashSet<String>,
    pub pinned: HashMap<String, Vec<f32>>,
    pub delay: Duration,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self {
            fail_on: HashSet::new(),
            pinned: HashMap::new(),
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(texts: &[&str]) -> Self {
        let mut e = Self::new();
        e.fail_on = texts.iter().map(|s| s.to_string()).collect();
        e
    }

    pub fn pin(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.pinned.insert(text.to_string(), vector);
        self
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    fn model_name(&self) -> &str {
        "fake"
    }
    fn dims(&self) -> usize {
        3
    }
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.fail_on.contains(text) {
            anyhow::bail!("HTTP 503 for {}", text);
        }
        if let Some(v) = self.pinned.get(text) {
            return Ok(v.clone());
        }
        let vowels = text.chars().filter(|c| "aeiouAEIOU".contains(*c)).count();
        Ok(vec![text.len() as f32, vowels as f32, 1.0])
    }
}

/// Returns canned replies and records what it was given.
pub struct FakeAnalyzer {
    pub text_reply: String,
    pub structured_reply: String,
    pub fail: bool,
    pub seen_context: Mutex<Vec<Vec<ContextPassage>>>,
    pub seen_narratives: Mutex<Vec<String>>,
}

impl FakeAnalyzer {
    pub fn new(structured_reply: &str) -> Self {
        Self {
            text_reply: "Section 303 applies.".to_string(),
            structured_reply: structured_reply.to_string(),
            fail: false,
            seen_context: Mutex::new(Vec::new()),
            seen_narratives: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AnalysisProvider for FakeAnalyzer {
    async fn answer(&self, query: &str, context: &[ContextPassage]) -> anyhow::Result<String> {
        if self.fail {
            anyhow::bail!("generation quota exceeded");
        }
        self.seen_narratives.lock().unwrap().push(query.to_string());
        self.seen_context.lock().unwrap().push(context.to_vec());
        Ok(self.text_reply.clone())
    }

    async fn analyze(
        &self,
        request: &AnalysisRequest,
        context: &[ContextPassage],
    ) -> anyhow::Result<String> {
        if self.fail {
            anyhow::bail!("generation quota exceeded");
        }
        self.seen_narratives
            .lock()
            .unwrap()
            .push(request.narrative.clone());
        self.seen_context.lock().unwrap().push(context.to_vec());
        Ok(self.structured_reply.clone())
    }
}

#[async_trait]
impl DraftingProvider for FakeAnalyzer {
    async fn draft(&self, narrative: &str, analysis: &LegalAnalysis) -> anyhow::Result<String> {
        if self.fail {
            anyhow::bail!("drafting unavailable");
        }
        Ok(format!(
            "FIR\nSection: {}\nNarrative: {}",
            analysis.bns_section, narrative
        ))
    }
}

#[derive(Default)]
pub struct RecordingProgress(pub Mutex<Vec<IndexProgressEvent>>);

impl IndexProgressReporter for RecordingProgress {
    fn report(&self, event: IndexProgressEvent) {
        self.0.lock().unwrap().push(event);
    }
}
