//! # ragrank
//!
//! Hybrid BM25 + semantic retrieval and ranking for retrieval-augmented
//! generation.
//!
//! The ranking engine lives in [`ragrank_core`]; this crate adds the
//! application layer: TOML configuration, filesystem ingestion, an async
//! service with concurrent batch ingestion and optional LLM document
//! selection, snapshot persistence, and the `ragrank` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────┐   ┌───────────────┐
//! │ Filesystem  │──▶│ RetrievalService │──▶│ RetrievalIndex│
//! │ NewDocument │   │ workers + RwLock │   │ BM25 + vectors│
//! └─────────────┘   └────────┬─────────┘   └───────┬───────┘
//!                            │                     │
//!                            ▼                     ▼
//!                   ┌──────────────────┐   ┌───────────────┐
//!                   │ DocumentSelector │   │ JSON snapshot │
//!                   │ (optional LLM)   │   │ on disk       │
//!                   └──────────────────┘   └───────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ragrank ingest ./docs
//! ragrank search "ownership rules" --explain
//! ragrank ask "how does the borrow checker work?"
//! ragrank stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`connector_fs`] | Filesystem ingestion source |
//! | [`service`] | Async retrieval service |
//! | [`selector`] | LLM document selection and strict reply parsing |
//! | [`persist`] | Snapshot load/save |
//! | [`ingest`], [`search`], [`get`], [`stats`] | CLI commands |

pub mod config;
pub mod connector_fs;
pub mod get;
pub mod ingest;
pub mod persist;
pub mod search;
pub mod selector;
pub mod service;
pub mod stats;
