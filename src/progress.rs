//! Indexing progress reporting for the CLI.
//!
//! Reports observable progress while the knowledge base is built, so users
//! see how many sections were found, how many batches are left, and how many
//! sections made it into the index. Progress is emitted on **stderr** so
//! stdout remains parseable for scripts.

use std::io::Write;

use nyaya_core::progress::{IndexProgressEvent, IndexProgressReporter, NoProgress};

/// Human-friendly progress on stderr: "index  batch 2 / 3  10 / 11 sections".
pub struct StderrProgress;

impl IndexProgressReporter for StderrProgress {
    fn report(&self, event: IndexProgressEvent) {
        let line = human_line(&event);
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(line.as_bytes());
        let _ = err.flush();
    }
}

fn human_line(event: &IndexProgressEvent) -> String {
    match event {
        IndexProgressEvent::Chunked { total } => {
            format!("index  chunked  {} sections\n", format_number(*total))
        }
        IndexProgressEvent::Batch {
            batch,
            batches,
            processed,
            total,
        } => format!(
            "index  batch {} / {}  {} / {} sections\n",
            batch,
            batches,
            format_number(*processed),
            format_number(*total)
        ),
        IndexProgressEvent::Finished {
            indexed,
            failed,
            total,
        } => format!(
            "index  done  {} / {} indexed, {} failed\n",
            format_number(*indexed),
            format_number(*total),
            format_number(*failed)
        ),
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl IndexProgressReporter for JsonProgress {
    fn report(&self, event: IndexProgressEvent) {
        let obj = json_event(&event);
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut err = std::io::stderr().lock();
            let _ = writeln!(err, "{}", line);
            let _ = err.flush();
        }
    }
}

fn json_event(event: &IndexProgressEvent) -> serde_json::Value {
    match event {
        IndexProgressEvent::Chunked { total } => serde_json::json!({
            "event": "progress",
            "phase": "chunked",
            "total": total
        }),
        IndexProgressEvent::Batch {
            batch,
            batches,
            processed,
            total,
        } => serde_json::json!({
            "event": "progress",
            "phase": "embedding",
            "batch": batch,
            "batches": batches,
            "n": processed,
            "total": total
        }),
        IndexProgressEvent::Finished {
            indexed,
            failed,
            total,
        } => serde_json::json!({
            "event": "progress",
            "phase": "finished",
            "indexed": indexed,
            "failed": failed,
            "total": total
        }),
    }
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Parse the `--progress` flag; `auto` picks by TTY.
    pub fn from_flag(flag: &str) -> anyhow::Result<Self> {
        match flag {
            "auto" => Ok(Self::default_for_tty()),
            "human" => Ok(ProgressMode::Human),
            "json" => Ok(ProgressMode::Json),
            "off" => Ok(ProgressMode::Off),
            other => anyhow::bail!(
                "Unknown progress mode: '{}'. Must be auto, human, json, or off.",
                other
            ),
        }
    }

    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn IndexProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
