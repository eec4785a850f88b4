//! # Nyaya
//!
//! Retrieval-grounded question answering and complaint triage over a
//! statute.
//!
//! The retrieval core (chunking, vector index, indexing and query
//! orchestration) lives in `nyaya-core`. This crate wires it to the outside
//! world: TOML configuration, HTTP embedding and generation providers,
//! terminal progress, the `nyaya` CLI, and an HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ statute.txt │──▶│ chunk+embed  │──▶│ VectorIndex  │
//! └─────────────┘   │ (batched)    │   │ (in memory)  │
//!                   └──────────────┘   └──────┬───────┘
//!                                             │ top k
//!                      ┌──────────────────────┤
//!                      ▼                      ▼
//!                 ┌──────────┐          ┌──────────┐
//!                 │   CLI    │          │   HTTP   │
//!                 │ (nyaya)  │          │  (axum)  │
//!                 └──────────┘          └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`embedding`] | Gemini, OpenAI, and Ollama embedding providers |
//! | [`generation`] | Gemini and OpenAI answer, analysis, and drafting |
//! | [`progress`] | Indexing progress on stderr |
//! | [`commands`] | CLI command implementations |
//! | [`server`] | HTTP API |

pub mod commands;
pub mod config;
pub mod embedding;
pub mod generation;
mod http;
pub mod progress;
pub mod server;
