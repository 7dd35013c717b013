//! # ragrank CLI
//!
//! ```bash
//! ragrank --config ./config/ragrank.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragrank ingest <path>...` | Index files or directories |
//! | `ragrank search "<query>"` | Hybrid search with rerank boosts |
//! | `ragrank similar <id>` | Documents similar to an indexed one |
//! | `ragrank ask "<question>"` | Sources and confidence for a question |
//! | `ragrank get <id>` | Show a document and its chunks |
//! | `ragrank remove <id>` | Remove a document |
//! | `ragrank stats` | Index statistics |
//!
//! Logging goes to stderr and is controlled by `RAGRANK_LOG`
//! (default `warn`), e.g. `RAGRANK_LOG=ragrank=debug`.

use clap::{Parser, Subcommand};
use ragrank::{config, get, ingest, search, stats};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ragrank: hybrid BM25 + semantic retrieval for RAG.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means defaults.
#[derive(Parser)]
#[command(
    name = "ragrank",
    about = "ragrank: hybrid BM25 + semantic retrieval and ranking for RAG",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ragrank.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index files or directories.
    ///
    /// Directories are scanned with `[ingest]` include/exclude globs.
    /// Documents whose id (relative path) already exists are replaced.
    Ingest {
        /// Files or directories to ingest.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// List what would be ingested without touching the index.
        #[arg(long)]
        dry_run: bool,
    },

    /// Search indexed documents.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,

        /// Only return results with relevance above this value.
        #[arg(long)]
        threshold: Option<f64>,

        /// Print the score breakdown for each result.
        #[arg(long)]
        explain: bool,
    },

    /// Find documents similar to an indexed document.
    Similar {
        /// Document id.
        id: String,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Gather sources for a question and report confidence.
    Ask {
        /// The question.
        question: String,

        /// Maximum number of sources.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show a document and its chunks.
    Get {
        /// Document id.
        id: String,
    },

    /// Remove a document from the index.
    Remove {
        /// Document id.
        id: String,
    },

    /// Show index statistics.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RAGRANK_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest { paths, dry_run } => {
            ingest::run_ingest(&cfg, &paths, dry_run).await?;
        }
        Commands::Search {
            query,
            limit,
            threshold,
            explain,
        } => {
            search::run_search(&cfg, &query, limit, threshold, explain).await?;
        }
        Commands::Similar { id, limit } => {
            search::run_similar(&cfg, &id, limit).await?;
        }
        Commands::Ask { question, limit } => {
            search::run_ask(&cfg, &question, limit).await?;
        }
        Commands::Get { id } => {
            get::run_get(&cfg, &id).await?;
        }
        Commands::Remove { id } => {
            get::run_remove(&cfg, &id).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
