//! Structural chunker for statute text.
//!
//! Splits a loosely formatted legal document into titled sections. A
//! section starts at every header line (a chapter marker, `Section N`, or a
//! numbered clause such as `303. Theft.`) and runs until the next header.
//! Noise lines (page numbers, filler rules, table-of-contents leaders) are
//! dropped and never touch a section's content or title.
//!
//! What counts as a header or as noise is decided by a [`LineClassifier`],
//! so a corpus whose numbering trips the default grammar can supply its own
//! policy without changing the scan itself.
//!
//! # Algorithm
//!
//! 1. Split the text on `\n` and trim every line.
//! 2. Skip blank and noise lines.
//! 3. On a header line, emit the open section (if it has content) with
//!    `end_line` set to the header's index, then open a new section titled
//!    by the header and seeded with the header line.
//! 4. Append any other line to the open section.
//! 5. At end of input, emit the open section with `end_line` set to the
//!    total line count.
//!
//! # Example
//!
//! ```rust
//! use nyaya_core::chunk::chunk_text;
//!
//! let text = "CHAPTER I\nPRELIMINARY\n1. Short title.\nThis Act may be called X.";
//! let chunks = chunk_text(text);
//! assert_eq!(chunks.len(), 2);
//! assert_eq!(chunks[1].title, "1. Short title.");
//! ```

use regex::Regex;
use std::sync::LazyLock;

use crate::models::{Chunk, ChunkMetadata};

/// Title given to text that precedes the first header.
pub const PREAMBLE_TITLE: &str = "Preamble";

/// Default header grammar: `Section 10`, `10. Defamation`, `303. (1) Whoever`,
/// `CHAPTER IV` (OCR output often drops the space: `CHAPTERIV`).
pub const DEFAULT_HEADER_PATTERN: &str =
    r"^(?:Section\s+\d+|\d+\.\s+[A-Z(]|CHAPTER\s*[IVXLCDM]+\b)";

/// Default noise grammar: filler rules, bare page numbers, `Page N of M`,
/// and table-of-contents rows with dot or underscore leaders.
pub const DEFAULT_NOISE_PATTERN: &str =
    r"^(?:[-_=.*~·•–—\s]{4,}|\d{1,4}|(?i:page)\s+\d+(?:\s+of\s+\d+)?)$|[._]{8,}";

static DEFAULT_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_HEADER_PATTERN).expect("invalid default header pattern"));

static DEFAULT_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_NOISE_PATTERN).expect("invalid default noise pattern"));

/// How the chunker treats one trimmed source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Noise,
    Header,
    Body,
}

/// Header/noise policy consulted for every trimmed line.
pub trait LineClassifier: Send + Sync {
    fn classify(&self, line: &str) -> LineKind;
}

/// Regex-driven [`LineClassifier`] for statute text.
///
/// Noise is checked before headers, so a filler line that happens to start
/// with digits is still discarded.
#[derive(Debug, Clone)]
pub struct StatutePatterns {
    header: Regex,
    noise: Option<Regex>,
}

impl StatutePatterns {
    /// Compile a custom policy. `noise = None` disables noise filtering.
    pub fn new(header: &str, noise: Option<&str>) -> Result<Self, regex::Error> {
        Ok(Self {
            header: Regex::new(header)?,
            noise: noise.map(Regex::new).transpose()?,
        })
    }

    /// Compile a policy where either pattern may fall back to the default.
    pub fn with_overrides(
        header: Option<&str>,
        noise: Option<&str>,
    ) -> Result<Self, regex::Error> {
        Self::new(
            header.unwrap_or(DEFAULT_HEADER_PATTERN),
            Some(noise.unwrap_or(DEFAULT_NOISE_PATTERN)),
        )
    }
}

impl Default for StatutePatterns {
    fn default() -> Self {
        Self {
            header: DEFAULT_HEADER.clone(),
            noise: Some(DEFAULT_NOISE.clone()),
        }
    }
}

impl LineClassifier for StatutePatterns {
    fn classify(&self, line: &str) -> LineKind {
        if line.is_empty() {
            LineKind::Blank
        } else if self.noise.as_ref().is_some_and(|re| re.is_match(line)) {
            LineKind::Noise
        } else if self.header.is_match(line) {
            LineKind::Header
        } else {
            LineKind::Body
        }
    }
}

/// Splits statute text into [`Chunk`]s using a [`LineClassifier`].
pub struct Chunker {
    classifier: Box<dyn LineClassifier>,
}

impl Chunker {
    pub fn new(classifier: impl LineClassifier + 'static) -> Self {
        Self {
            classifier: Box::new(classifier),
        }
    }

    /// Chunk `text` into ordered, non-empty sections.
    ///
    /// Returns an empty vector only when no line survives blank/noise
    /// filtering.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let lines: Vec<&str> = text.split('\n').collect();
        let mut chunks = Vec::new();
        let mut open = OpenSection::new(PREAMBLE_TITLE.to_string(), 0);

        for (i, raw) in lines.iter().enumerate() {
            let line = raw.trim();
            match self.classifier.classify(line) {
                LineKind::Blank | LineKind::Noise => continue,
                LineKind::Header => {
                    let closed = std::mem::replace(&mut open, OpenSection::new(line.to_string(), i));
                    if let Some(chunk) = closed.close(chunks.len(), i) {
                        chunks.push(chunk);
                    }
                    open.push(line);
                }
                LineKind::Body => open.push(line),
            }
        }

        if let Some(chunk) = open.close(chunks.len(), lines.len()) {
            chunks.push(chunk);
        }

        chunks
    }

    /// The lines the chunker keeps (trimmed, blank and noise removed), in order.
    pub fn kept_lines<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.split('\n')
            .map(str::trim)
            .filter(|line| {
                matches!(
                    self.classifier.classify(line),
                    LineKind::Header | LineKind::Body
                )
            })
            .collect()
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(StatutePatterns::default())
    }
}

struct OpenSection {
    title: String,
    start_line: usize,
    content: String,
}

impl OpenSection {
    fn new(title: String, start_line: usize) -> Self {
        Self {
            title,
            start_line,
            content: String::new(),
        }
    }

    fn push(&mut self, line: &str) {
        self.content.push_str(line);
        self.content.push('\n');
    }

    fn close(self, index: usize, end_line: usize) -> Option<Chunk> {
        if self.content.is_empty() {
            return None;
        }
        Some(Chunk {
            id: format!("chunk-{}", index),
            title: self.title,
            content: self.content.trim().to_string(),
            metadata: ChunkMetadata {
                start_line: self.start_line,
                end_line,
            },
        })
    }
}

/// Chunk with the default [`StatutePatterns`] policy.
pub fn chunk_text(text: &str) -> Vec<Chunk> {
    Chunker::default().chunk(text)
}

/// Summary of a chunking pass, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkStats {
    pub sections: usize,
    pub content_bytes: usize,
    pub longest_title: Option<String>,
    pub longest_bytes: usize,
}

impl ChunkStats {
    pub fn from_chunks(chunks: &[Chunk]) -> Self {
        let longest = chunks.iter().max_by_key(|c| c.content.len());
        Self {
            sections: chunks.len(),
            content_bytes: chunks.iter().map(|c| c.content.len()).sum(),
            longest_title: longest.map(|c| c.title.clone()),
            longest_bytes: longest.map(|c| c.content.len()).unwrap_or(0),
        }
    }
}
