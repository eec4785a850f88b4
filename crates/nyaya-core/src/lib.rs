//! # Nyaya Core
//!
//! Retrieval core for statute question answering: structural chunking,
//! an in-memory vector index, batched embedding, and query orchestration
//! against pluggable embedding and generation providers.
//!
//! This crate performs no network or filesystem I/O. Providers come in
//! through the traits in [`embedding`] and [`analysis`]; the `nyaya` binary
//! supplies HTTP-backed implementations.
//!
//! ```text
//!   statute text ─▶ chunk ─▶ ingest (embed in batches) ─▶ index
//!                                                          │
//!   query ─▶ embed ─▶ index.search(k) ─▶ analysis provider ─▶ Answer
//! ```

pub mod analysis;
pub mod chunk;
pub mod embedding;
pub mod error;
pub mod index;
pub mod ingest;
pub mod models;
pub mod progress;
pub mod query;
pub mod redteam;
pub mod session;

#[cfg(test)]
mod test_support;

pub use error::{CoreError, Result};
