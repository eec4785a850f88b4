//! Analysis and drafting provider contracts and the structured legal
//! analysis record.
//!
//! The generation side is a black box. It is asked either for a free-text
//! answer ([`AnalysisProvider::answer`]) or for a structured classification
//! ([`AnalysisProvider::analyze`]). Which shape comes back is fixed by the
//! call that was made, never by inspecting the reply. Structured replies are
//! parsed here; anything that does not parse becomes
//! [`LegalAnalysis::fallback`] so a bad reply never takes the session down.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::ContextPassage;

/// Outcome of classifying a complaint narrative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "Cognizable Offense")]
    CognizableOffense,
    #[serde(rename = "Non-Cognizable/Civil Dispute")]
    NonCognizable,
    #[serde(rename = "Ambiguous/Need More Info")]
    Ambiguous,
}

impl Classification {
    pub fn label(&self) -> &'static str {
        match self {
            Classification::CognizableOffense => "Cognizable Offense",
            Classification::NonCognizable => "Non-Cognizable/Civil Dispute",
            Classification::Ambiguous => "Ambiguous/Need More Info",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Structured result of the analysis provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegalAnalysis {
    pub classification: Classification,
    /// Free-form section reference, e.g. `"BNS 303(2)"`.
    #[serde(default)]
    pub bns_section: String,
    /// 0–100.
    #[serde(default)]
    pub confidence_score: f64,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub missing_details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_narrative: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_analysis: Option<String>,
}

impl LegalAnalysis {
    /// The record used whenever a structured reply cannot be parsed.
    pub fn fallback() -> Self {
        Self {
            classification: Classification::Ambiguous,
            bns_section: "N/A".to_string(),
            confidence_score: 0.0,
            reasoning: "Could not process the analysis response.".to_string(),
            missing_details: "Please restate the complaint with more detail.".to_string(),
            detected_language: None,
            translated_narrative: None,
            transcription: None,
            visual_analysis: None,
        }
    }

    /// Parse a raw provider reply, falling back instead of failing.
    ///
    /// Accepts bare JSON or JSON wrapped in a Markdown code fence.
    pub fn from_response(raw: &str) -> Self {
        let body = strip_code_fence(raw);
        match serde_json::from_str::<LegalAnalysis>(body) {
            Ok(mut analysis) => {
                analysis.confidence_score = analysis.confidence_score.clamp(0.0, 100.0);
                analysis
            }
            Err(e) => {
                tracing::warn!(error = %e, "malformed analysis response, using fallback");
                Self::fallback()
            }
        }
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line (```json).
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// What a query produced, tagged by the entry point that produced it.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Answer {
    Text(String),
    Structured(LegalAnalysis),
}

/// Binary evidence attached to a complaint (voice note, photo).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// e.g. `"audio/webm"`, `"image/jpeg"`.
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Everything the analysis provider needs for a structured classification.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub narrative: String,
    pub audio: Option<Attachment>,
    pub image: Option<Attachment>,
}

impl AnalysisRequest {
    pub fn text(narrative: impl Into<String>) -> Self {
        Self {
            narrative: narrative.into(),
            audio: None,
            image: None,
        }
    }
}

/// Generation backend used by the query orchestrator.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Free-text answer to `query`, grounded in `context`.
    async fn answer(&self, query: &str, context: &[ContextPassage]) -> Result<String>;

    /// Raw structured classification of a complaint; parsed by the caller
    /// with [`LegalAnalysis::from_response`].
    async fn analyze(
        &self,
        request: &AnalysisRequest,
        context: &[ContextPassage],
    ) -> Result<String>;
}

/// Backend that turns a narrative and its analysis into a formatted report.
#[async_trait]
pub trait DraftingProvider: Send + Sync {
    async fn draft(&self, narrative: &str, analysis: &LegalAnalysis) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let raw = r#"{
            "classification": "Cognizable Offense",
            "bns_section": "BNS 304",
            "confidence_score": 87,
            "reasoning": "Chain snatched by force.",
            "missing_details": "None",
            "detected_language": "Hindi"
        }"#;
        let a = LegalAnalysis::from_response(raw);
        assert_eq!(a.classification, Classification::CognizableOffense);
        assert_eq!(a.bns_section, "BNS 304");
        assert_eq!(a.confidence_score, 87.0);
        assert_eq!(a.detected_language.as_deref(), Some("Hindi"));
        assert!(a.transcription.is_none());
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = "```json\n{\"classification\": \"Non-Cognizable/Civil Dispute\", \"bns_section\": \"None\", \"confidence_score\": 70, \"reasoning\": \"Deposit dispute.\", \"missing_details\": \"\"}\n```";
        let a = LegalAnalysis::from_response(raw);
        assert_eq!(a.classification, Classification::NonCognizable);
        assert_eq!(a.reasoning, "Deposit dispute.");
    }

    #[test]
    fn test_malformed_falls_back() {
        for raw in [
            "",
            "The complaint looks like theft.",
            "{\"classification\": \"Felony\"}",
            "{\"bns_section\": \"303\"}",
            "```json\n{ broken\n```",
        ] {
            assert_eq!(LegalAnalysis::from_response(raw), LegalAnalysis::fallback());
        }
    }

    #[test]
    fn test_fallback_is_lowest_confidence_ambiguous() {
        let f = LegalAnalysis::fallback();
        assert_eq!(f.classification, Classification::Ambiguous);
        assert_eq!(f.confidence_score, 0.0);
    }

    #[test]
    fn test_confidence_clamped() {
        let a = LegalAnalysis::from_response(
            r#"{"classification": "Ambiguous/Need More Info", "confidence_score": 140}"#,
        );
        assert_eq!(a.confidence_score, 100.0);
    }

    #[test]
    fn test_classification_labels_round_trip_through_serde() {
        for c in [
            Classification::CognizableOffense,
            Classification::NonCognizable,
            Classification::Ambiguous,
        ] {
            let json = serde_json::to_string(&c).unwrap();
            assert_eq!(json, format!("\"{}\"", c.label()));
        }
    }

    #[test]
    fn test_answer_tagging() {
        let v = serde_json::to_value(Answer::Text("ok".to_string())).unwrap();
        assert_eq!(v["kind"], "text");
        assert_eq!(v["value"], "ok");
        let v = serde_json::to_value(Answer::Structured(LegalAnalysis::fallback())).unwrap();
        assert_eq!(v["kind"], "structured");
        assert_eq!(v["value"]["classification"], "Ambiguous/Need More Info");
    }
}
