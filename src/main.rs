//! # Nyaya CLI (`nyaya`)
//!
//! Statute question answering and complaint triage over a plain-text copy
//! of the Bharatiya Nyaya Sanhita (or any statute with numbered sections).
//!
//! ## Usage
//!
//! ```bash
//! nyaya --config ./config/nyaya.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `nyaya chunk <file>` | Split a statute into sections and print them |
//! | `nyaya ask "<query>"` | Answer a question from the most relevant sections |
//! | `nyaya analyze "<narrative>"` | Classify a complaint, optionally drafting a report |
//! | `nyaya redteam` | Score classification against known scenarios |
//! | `nyaya serve` | Start the HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! # Inspect how the statute is split
//! nyaya chunk data/bns.txt
//!
//! # Ask a question
//! nyaya ask "what is the punishment for snatching?" --corpus data/bns.txt
//!
//! # Classify a complaint with a photo and draft an FIR
//! nyaya analyze "my phone was snatched near the bus stand" --image scene.jpg --draft
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use nyaya::commands::{self, AnalyzeArgs, BuildOptions};
use nyaya::config;
use nyaya::progress::ProgressMode;

/// Nyaya: retrieval-grounded statute answers and complaint triage.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/nyaya.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "nyaya",
    about = "Nyaya: retrieval-grounded statute answers and complaint triage",
    version,
    long_about = "Nyaya splits a statute into sections, embeds them into an in-memory vector \
    index, and answers questions or classifies complaints using only the most relevant \
    sections as context."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/nyaya.toml`. A missing file means all defaults.
    #[arg(long, global = true, default_value = "./config/nyaya.toml")]
    config: PathBuf,

    /// Statute text to index. Overrides `[corpus].path`.
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    /// Indexing progress on stderr: `auto` (human on a TTY), `human`, `json`, or `off`.
    #[arg(long, global = true, default_value = "auto")]
    progress: String,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Split a statute into sections without embedding anything.
    ///
    /// Prints one line per section (id, line span, size, title) and a
    /// summary. Useful for tuning `[chunking]` patterns against a new
    /// source text.
    Chunk {
        /// Plain-text statute file.
        file: PathBuf,

        /// Print the sections as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Answer a question from the most relevant statute sections.
    ///
    /// Builds the knowledge base, retrieves the top `k` sections, and
    /// prints them with their similarity before the generated answer.
    Ask {
        /// The question or complaint text.
        query: String,

        /// Number of sections to retrieve. Defaults to `[retrieval].top_k`.
        #[arg(long)]
        top_k: Option<usize>,

        /// Print the sources and answer as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Classify a complaint narrative.
    ///
    /// Returns the classification, the most relevant section, a confidence
    /// score, reasoning, and what details are missing.
    Analyze {
        /// The complainant's account.
        narrative: String,

        /// Voice recording of the complaint (webm, mp3, wav, m4a, ogg).
        #[arg(long)]
        audio: Option<PathBuf>,

        /// Photo evidence (jpg, png, webp).
        #[arg(long)]
        image: Option<PathBuf>,

        /// Number of sections to retrieve. Defaults to `[retrieval].top_k`.
        #[arg(long)]
        top_k: Option<usize>,

        /// Also draft a First Information Report from the analysis.
        #[arg(long)]
        draft: bool,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Run the red-team scenario set and report the pass rate.
    Redteam {
        /// TOML file of `[[scenario]]` tables. Defaults to the built-in set.
        #[arg(long)]
        scenarios: Option<PathBuf>,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Build the knowledge base once and start the HTTP API.
    ///
    /// Binds to the address configured in `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let opts = BuildOptions {
        corpus: cli.corpus,
        progress: ProgressMode::from_flag(&cli.progress)?,
    };

    match cli.command {
        Commands::Chunk { file, json } => {
            commands::run_chunk(&cfg, &file, json)?;
        }
        Commands::Ask { query, top_k, json } => {
            commands::run_ask(&cfg, &opts, &query, top_k, json).await?;
        }
        Commands::Analyze {
            narrative,
            audio,
            image,
            top_k,
            draft,
            json,
        } => {
            let args = AnalyzeArgs {
                narrative,
                audio,
                image,
                top_k,
                draft,
                json,
            };
            commands::run_analyze(&cfg, &opts, args).await?;
        }
        Commands::Redteam { scenarios, json } => {
            commands::run_redteam(&cfg, &opts, scenarios.as_deref(), json).await?;
        }
        Commands::Serve => {
            commands::run_serve(&cfg, &opts).await?;
        }
    }

    Ok(())
}
