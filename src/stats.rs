//! Index statistics overview for `ragrank stats`.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::service::RetrievalService;

pub async fn run_stats(config: &Config) -> Result<()> {
    let service = RetrievalService::from_config(config)?;
    let stats = service.stats().await;

    let metadata = std::fs::metadata(&config.index.snapshot_path).ok();
    let snapshot_size = metadata.as_ref().map(|m| m.len()).unwrap_or(0);
    let saved = metadata
        .and_then(|m| m.modified().ok())
        .map(|t| DateTime::<Utc>::from(t).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "never".to_string());

    println!("ragrank: Index Stats");
    println!("=====================");
    println!();
    println!("  Snapshot:    {}", config.index.snapshot_path.display());
    println!("  Size:        {}", format_bytes(snapshot_size));
    println!("  Saved:       {}", saved);
    println!();
    println!("  Documents:   {}", stats.documents);
    println!("  Chunks:      {}", stats.chunks);
    println!("  Vectors:     {}", stats.vectors);
    println!("  Avg tokens:  {:.1}", stats.avg_chunk_length);
    println!("  Embedder:    {} ({} dims)", stats.model, stats.dims);
    println!(
        "  Reranker:    {}",
        if config.reranker.is_enabled() {
            config.reranker.model.as_deref().unwrap_or("(unset)")
        } else {
            "disabled"
        }
    );
    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
