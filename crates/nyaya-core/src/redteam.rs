//! Red-team evaluation of the classification flow.
//!
//! Runs a list of complaint narratives with known expected outcomes through
//! [`KnowledgeBase::classify`] and scores the classifications. The set mixes
//! genuine offences with civil disputes dressed up as crimes, frivolous
//! grievances, and complaints too vague to act on.
//!
//! Scenario files are TOML:
//!
//! ```toml
//! [[scenario]]
//! id = "GEN-01"
//! narrative = "Two men on a scooter pulled the bag off my shoulder."
//! expected = "Cognizable Offense"
//! kind = "genuine"
//! ```

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analysis::{AnalysisProvider, AnalysisRequest, Classification};
use crate::embedding::EmbeddingProvider;
use crate::session::KnowledgeBase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    Genuine,
    Civil,
    Frivolous,
    Vague,
}

impl ScenarioKind {
    pub fn label(&self) -> &'static str {
        match self {
            ScenarioKind::Genuine => "genuine",
            ScenarioKind::Civil => "civil",
            ScenarioKind::Frivolous => "frivolous",
            ScenarioKind::Vague => "vague",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub narrative: String,
    pub expected: Classification,
    pub kind: ScenarioKind,
}

#[derive(Deserialize)]
struct ScenarioFile {
    #[serde(default)]
    scenario: Vec<Scenario>,
}

/// Parse a TOML scenario file (`[[scenario]]` tables).
pub fn parse_scenarios(toml_text: &str) -> Result<Vec<Scenario>, toml::de::Error> {
    let file: ScenarioFile = toml::from_str(toml_text)?;
    Ok(file.scenario)
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub id: String,
    pub kind: ScenarioKind,
    pub expected: Classification,
    /// `None` when the query itself failed.
    pub actual: Option<Classification>,
    pub bns_section: String,
    pub passed: bool,
    pub reasoning: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RedTeamReport {
    pub results: Vec<ScenarioResult>,
    pub passed: usize,
    pub total: usize,
}

impl RedTeamReport {
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64
        }
    }

    /// `(passed, total)` for one scenario kind.
    pub fn tally(&self, kind: ScenarioKind) -> (usize, usize) {
        self.results
            .iter()
            .filter(|r| r.kind == kind)
            .fold((0, 0), |(p, t), r| (p + usize::from(r.passed), t + 1))
    }
}

/// Classify every scenario, one at a time.
///
/// A scenario whose query fails is recorded as failed with the error as
/// its reasoning; the run continues.
pub async fn run_redteam(
    kb: &KnowledgeBase,
    embedder: &dyn EmbeddingProvider,
    analyzer: &dyn AnalysisProvider,
    scenarios: &[Scenario],
    k: usize,
) -> RedTeamReport {
    let mut report = RedTeamReport {
        total: scenarios.len(),
        ..RedTeamReport::default()
    };

    for scenario in scenarios {
        let request = AnalysisRequest::text(scenario.narrative.clone());
        let result = match kb.classify(embedder, analyzer, &request, k).await {
            Ok(outcome) => match outcome.analysis() {
                Some(analysis) => ScenarioResult {
                    id: scenario.id.clone(),
                    kind: scenario.kind,
                    expected: scenario.expected,
                    actual: Some(analysis.classification),
                    bns_section: analysis.bns_section.clone(),
                    passed: analysis.classification == scenario.expected,
                    reasoning: analysis.reasoning.clone(),
                },
                None => failed(scenario, "analysis returned free text".to_string()),
            },
            Err(e) => {
                warn!(scenario = %scenario.id, error = %e, "scenario query failed");
                failed(scenario, e.to_string())
            }
        };
        if result.passed {
            report.passed += 1;
        }
        report.results.push(result);
    }

    info!(
        passed = report.passed,
        total = report.total,
        "red-team run finished"
    );
    report
}

fn failed(scenario: &Scenario, reasoning: String) -> ScenarioResult {
    ScenarioResult {
        id: scenario.id.clone(),
        kind: scenario.kind,
        expected: scenario.expected,
        actual: None,
        bns_section: String::new(),
        passed: false,
        reasoning,
    }
}

/// Built-in scenario set.
pub fn default_scenarios() -> Vec<Scenario> {
    use Classification::*;
    use ScenarioKind::*;

    let s = |id: &str, narrative: &str, expected, kind| Scenario {
        id: id.to_string(),
        narrative: narrative.to_string(),
        expected,
        kind,
    };

    vec![
        s(
            "GEN-01",
            "Two men on a motorcycle pulled the gold chain from my neck outside the market and rode away. I fell and hurt my elbow.",
            CognizableOffense,
            Genuine,
        ),
        s(
            "GEN-02",
            "During a quarrel over a water tank my cousin hit me on the head with an iron rod. The hospital gave me six stitches.",
            CognizableOffense,
            Genuine,
        ),
        s(
            "GEN-03",
            "Last night the shutter of my pharmacy was forced open and about forty thousand rupees in cash was taken from the drawer.",
            CognizableOffense,
            Genuine,
        ),
        s(
            "CIV-01",
            "I paid a carpenter an advance for wardrobes. He built half of them and now ignores my calls. I want him arrested for cheating.",
            NonCognizable,
            Civil,
        ),
        s(
            "CIV-02",
            "My former landlord will not return my deposit even though I left the flat clean. I want to register theft against him.",
            NonCognizable,
            Civil,
        ),
        s(
            "CIV-03",
            "The neighbour's new compound wall is a foot inside my plot according to my survey map. This is trespass.",
            NonCognizable,
            Civil,
        ),
        s(
            "FRIV-01",
            "The waiter was rude to me and refused to change my table. His tone was insulting.",
            NonCognizable,
            Frivolous,
        ),
        s(
            "FRIV-02",
            "My neighbour's rooster crows every morning at five and wakes my family. The owner should be jailed.",
            NonCognizable,
            Frivolous,
        ),
        s("VAG-01", "Somebody took my bag.", Ambiguous, Vague),
        s(
            "VAG-02",
            "I was cheated. He has my money.",
            Ambiguous,
            Vague,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::IndexOptions;
    use crate::progress::NoProgress;
    use crate::test_support::{FakeAnalyzer, FakeEmbedder};
    use std::time::Duration;

    async fn ready_kb(embedder: &FakeEmbedder) -> KnowledgeBase {
        let mut kb = KnowledgeBase::default();
        let options = IndexOptions {
            batch_size: 5,
            batch_delay: Duration::ZERO,
        };
        kb.build("303. Theft.\nWhoever\n304. Snatching.\nsuddenly", embedder, &options, &NoProgress)
            .await
            .unwrap();
        kb
    }

    #[test]
    fn test_default_scenarios_cover_every_kind() {
        let scenarios = default_scenarios();
        for kind in [
            ScenarioKind::Genuine,
            ScenarioKind::Civil,
            ScenarioKind::Frivolous,
            ScenarioKind::Vague,
        ] {
            assert!(scenarios.iter().any(|s| s.kind == kind));
        }
        let mut ids: Vec<&str> = scenarios.iter().map(|s| s.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), scenarios.len());
    }

    #[test]
    fn test_kind_labels_match_serde_names() {
        for kind in [
            ScenarioKind::Genuine,
            ScenarioKind::Civil,
            ScenarioKind::Frivolous,
            ScenarioKind::Vague,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.label()));
        }
    }

    #[test]
    fn test_parse_scenarios() {
        let text = r#"
[[scenario]]
id = "X-1"
narrative = "My phone was snatched on the train."
expected = "Cognizable Offense"
kind = "genuine"

[[scenario]]
id = "X-2"
narrative = "Money gone."
expected = "Ambiguous/Need More Info"
kind = "vague"
"#;
        let scenarios = parse_scenarios(text).unwrap();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].expected, Classification::CognizableOffense);
        assert_eq!(scenarios[1].kind, ScenarioKind::Vague);
        assert!(parse_scenarios("[[scenario]]\nid = 1").is_err());
        assert!(parse_scenarios("").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_scores_classifications() {
        let embedder = FakeEmbedder::failing(&["Somebody took my bag."]);
        let kb = ready_kb(&embedder).await;
        let analyzer = FakeAnalyzer::new(
            r#"{"classification": "Cognizable Offense", "bns_section": "BNS 304", "confidence_score": 80, "reasoning": "r", "missing_details": ""}"#,
        );

        let report = run_redteam(&kb, &embedder, &analyzer, &default_scenarios(), 4).await;

        assert_eq!(report.total, 10);
        assert_eq!(report.passed, 3);
        assert_eq!(report.tally(ScenarioKind::Genuine), (3, 3));
        assert_eq!(report.tally(ScenarioKind::Civil), (0, 3));
        let vag = report.results.iter().find(|r| r.id == "VAG-01").unwrap();
        assert!(vag.actual.is_none());
        assert!(!vag.passed);
        assert!(vag.reasoning.contains("query embedding failed"));
        assert!((report.pass_rate() - 0.3).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_run_on_unready_kb_fails_every_scenario() {
        let kb = KnowledgeBase::default();
        let embedder = FakeEmbedder::new();
        let analyzer = FakeAnalyzer::new("{}");
        let report = run_redteam(&kb, &embedder, &analyzer, &default_scenarios()[..2], 4).await;
        assert_eq!(report.passed, 0);
        assert!(report.results.iter().all(|r| r.reasoning.contains("not ready")));
    }
}
