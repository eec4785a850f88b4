//! CLI command implementations.
//!
//! Each `run_*` function backs one `nyaya` subcommand. Commands that query
//! the statute build a fresh in-memory knowledge base first; indexing
//! coverage is printed to stderr so `--json` output on stdout stays clean.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nyaya_core::analysis::{AnalysisRequest, Attachment};
use nyaya_core::chunk::{ChunkStats, Chunker};
use nyaya_core::embedding::EmbeddingProvider;
use nyaya_core::ingest::IndexReport;
use nyaya_core::query::{draft_report, QueryOutcome};
use nyaya_core::redteam::{self, RedTeamReport, ScenarioKind};
use nyaya_core::session::KnowledgeBase;

use crate::config::Config;
use crate::embedding::create_provider;
use crate::generation::{create_generator, Generator};
use crate::progress::ProgressMode;
use crate::server::{self, AppState};

/// Options shared by every command that builds a knowledge base.
pub struct BuildOptions {
    /// Overrides `[corpus].path`.
    pub corpus: Option<PathBuf>,
    pub progress: ProgressMode,
}

/// A built knowledge base with the providers that serve it.
pub struct Runtime {
    pub kb: KnowledgeBase,
    pub embedder: Box<dyn EmbeddingProvider>,
    pub generator: Generator,
}

fn corpus_path(cfg: &Config, opts: &BuildOptions) -> Result<PathBuf> {
    opts.corpus
        .clone()
        .or_else(|| cfg.corpus.path.clone())
        .ok_or_else(|| anyhow::anyhow!("No corpus configured: set [corpus].path or pass --corpus"))
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read statute text: {}", path.display()))
}

/// Create the providers, read the corpus, and index it.
pub async fn build_runtime(cfg: &Config, opts: &BuildOptions) -> Result<Runtime> {
    if !cfg.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding].provider to gemini, openai, or ollama.");
    }
    let embedder = create_provider(&cfg.embedding)?;
    let generator = create_generator(&cfg.generation)?;
    tracing::info!(
        embedding = embedder.model_name(),
        dims = embedder.dims(),
        generator = generator.name(),
        "providers ready"
    );

    let path = corpus_path(cfg, opts)?;
    let text = read_text(&path)?;

    let mut kb = KnowledgeBase::new(Chunker::new(cfg.chunking.patterns()?));
    let reporter = opts.progress.reporter();
    let report = kb
        .build(
            &text,
            embedder.as_ref(),
            &cfg.indexing.options(),
            reporter.as_ref(),
        )
        .await
        .with_context(|| format!("Failed to index {}", path.display()))?;
    print_coverage(&report);

    Ok(Runtime {
        kb,
        embedder,
        generator,
    })
}

fn print_coverage(report: &IndexReport) {
    eprintln!(
        "Indexed {}/{} sections ({:.1}%)",
        report.indexed,
        report.total,
        report.coverage() * 100.0
    );
    if !report.failed.is_empty() {
        let ids: Vec<&str> = report.failed.iter().map(|f| f.id.as_str()).collect();
        eprintln!("Failed: {}", ids.join(", "));
    }
}

// ============ chunk ============

pub fn run_chunk(cfg: &Config, file: &Path, json: bool) -> Result<()> {
    let text = read_text(file)?;
    let chunker = Chunker::new(cfg.chunking.patterns()?);
    let chunks = chunker.chunk(&text);
    if chunks.is_empty() {
        bail!("No sections found in {}", file.display());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&chunks)?);
        return Ok(());
    }

    for chunk in &chunks {
        println!(
            "{:<10} lines {:>5}-{:<5} {:>7} bytes  {}",
            chunk.id,
            chunk.metadata.start_line,
            chunk.metadata.end_line,
            chunk.content.len(),
            chunk.title
        );
    }
    let stats = ChunkStats::from_chunks(&chunks);
    let kept = chunker.kept_lines(&text).len();
    println!();
    println!(
        "{} sections from {} lines, {} bytes. Longest: {} ({} bytes)",
        stats.sections,
        kept,
        stats.content_bytes,
        stats.longest_title.as_deref().unwrap_or("-"),
        stats.longest_bytes
    );
    Ok(())
}

// ============ ask ============

pub async fn run_ask(
    cfg: &Config,
    opts: &BuildOptions,
    query: &str,
    top_k: Option<usize>,
    json: bool,
) -> Result<()> {
    let rt = build_runtime(cfg, opts).await?;
    let k = top_k.unwrap_or(cfg.retrieval.top_k);
    let outcome = rt
        .kb
        .ask(rt.embedder.as_ref(), &rt.generator, query, k)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    print_sources(&outcome);
    if let Some(text) = outcome.text() {
        println!("{}", text);
    }
    Ok(())
}

fn print_sources(outcome: &QueryOutcome) {
    if outcome.results.is_empty() {
        println!("No sections retrieved.");
        println!();
        return;
    }
    println!("Sources:");
    for (i, r) in outcome.results.iter().enumerate() {
        println!(
            "  {}. {} ({:.1}%)",
            i + 1,
            r.chunk.title,
            r.similarity * 100.0
        );
    }
    println!();
}

// ============ analyze ============

/// Guess an attachment's MIME type from its extension.
fn mime_for(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    Ok(match ext.as_str() {
        "webm" => "audio/webm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        _ => bail!("Unsupported attachment type: {}", path.display()),
    })
}

fn read_attachment(path: &Path) -> Result<Attachment> {
    let mime_type = mime_for(path)?;
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read attachment: {}", path.display()))?;
    Ok(Attachment {
        mime_type: mime_type.to_string(),
        data,
    })
}

pub struct AnalyzeArgs {
    pub narrative: String,
    pub audio: Option<PathBuf>,
    pub image: Option<PathBuf>,
    pub top_k: Option<usize>,
    pub draft: bool,
    pub json: bool,
}

pub async fn run_analyze(cfg: &Config, opts: &BuildOptions, args: AnalyzeArgs) -> Result<()> {
    let request = AnalysisRequest {
        narrative: args.narrative,
        audio: args.audio.as_deref().map(read_attachment).transpose()?,
        image: args.image.as_deref().map(read_attachment).transpose()?,
    };

    let rt = build_runtime(cfg, opts).await?;
    let k = args.top_k.unwrap_or(cfg.retrieval.top_k);
    let outcome = rt
        .kb
        .classify(rt.embedder.as_ref(), &rt.generator, &request, k)
        .await?;

    let report = match (args.draft, outcome.analysis()) {
        (true, Some(analysis)) => {
            Some(draft_report(&rt.generator, &request.narrative, analysis).await?)
        }
        _ => None,
    };

    if args.json {
        let value = serde_json::json!({
            "results": outcome.results,
            "answer": outcome.answer,
            "report": report,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    print_sources(&outcome);
    if let Some(a) = outcome.analysis() {
        println!("Classification: {}", a.classification);
        println!("Section:        {}", a.bns_section);
        println!("Confidence:     {:.0}%", a.confidence_score);
        println!("Reasoning:      {}", a.reasoning);
        println!("Missing:        {}", a.missing_details);
        if let Some(lang) = &a.detected_language {
            println!("Language:       {}", lang);
        }
        if let Some(t) = &a.translated_narrative {
            println!("Translation:    {}", t);
        }
        if let Some(t) = &a.transcription {
            println!("Transcription:  {}", t);
        }
        if let Some(v) = &a.visual_analysis {
            println!("Visual:         {}", v);
        }
    }
    if let Some(report) = report {
        println!();
        println!("{}", report);
    }
    Ok(())
}

// ============ redteam ============

pub async fn run_redteam(
    cfg: &Config,
    opts: &BuildOptions,
    scenarios: Option<&Path>,
    json: bool,
) -> Result<()> {
    let scenarios = match scenarios {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read scenarios: {}", path.display()))?;
            redteam::parse_scenarios(&text)
                .with_context(|| format!("Failed to parse scenarios: {}", path.display()))?
        }
        None => redteam::default_scenarios(),
    };
    if scenarios.is_empty() {
        bail!("No scenarios to run");
    }

    let rt = build_runtime(cfg, opts).await?;
    let report = redteam::run_redteam(
        &rt.kb,
        rt.embedder.as_ref(),
        &rt.generator,
        &scenarios,
        cfg.retrieval.top_k,
    )
    .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_redteam(&report);
    }
    Ok(())
}

fn print_redteam(report: &RedTeamReport) {
    for r in &report.results {
        let actual = r
            .actual
            .map(|c| c.label().to_string())
            .unwrap_or_else(|| "error".to_string());
        println!(
            "{}  {:<8} expected {:<30} got {:<30} {}",
            if r.passed { "PASS" } else { "FAIL" },
            r.id,
            r.expected.label(),
            actual,
            r.bns_section
        );
    }
    println!();
    for kind in [
        ScenarioKind::Genuine,
        ScenarioKind::Civil,
        ScenarioKind::Frivolous,
        ScenarioKind::Vague,
    ] {
        let (passed, total) = report.tally(kind);
        if total > 0 {
            println!("  {:<10} {}/{}", kind.label(), passed, total);
        }
    }
    println!(
        "Passed {}/{} ({:.1}%)",
        report.passed,
        report.total,
        report.pass_rate() * 100.0
    );
}

// ============ serve ============

pub async fn run_serve(cfg: &Config, opts: &BuildOptions) -> Result<()> {
    let rt = build_runtime(cfg, opts).await?;
    let generator = Arc::new(rt.generator);
    let state = AppState {
        kb: Arc::new(tokio::sync::RwLock::new(rt.kb)),
        embedder: Arc::from(rt.embedder),
        analyzer: generator.clone(),
        drafter: generator,
        top_k: cfg.retrieval.top_k,
    };
    server::run_server(&cfg.server.bind, state).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for(Path::new("note.WEBM")).unwrap(), "audio/webm");
        assert_eq!(mime_for(Path::new("scene.jpg")).unwrap(), "image/jpeg");
        assert!(mime_for(Path::new("statement.pdf")).is_err());
        assert!(mime_for(Path::new("noext")).is_err());
    }

    #[test]
    fn test_corpus_override_wins() {
        let mut cfg = Config::default();
        cfg.corpus.path = Some(PathBuf::from("configured.txt"));
        let opts = BuildOptions {
            corpus: Some(PathBuf::from("cli.txt")),
            progress: ProgressMode::Off,
        };
        assert_eq!(corpus_path(&cfg, &opts).unwrap(), PathBuf::from("cli.txt"));

        let opts = BuildOptions {
            corpus: None,
            progress: ProgressMode::Off,
        };
        assert_eq!(
            corpus_path(&cfg, &opts).unwrap(),
            PathBuf::from("configured.txt")
        );
        assert!(corpus_path(&Config::default(), &opts).is_err());
    }
}
