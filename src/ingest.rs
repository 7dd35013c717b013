//! `ragrank ingest`: load files into the index and save the snapshot.
//!
//! Each path may be a directory (scanned with the configured globs) or a
//! single file. Documents with an existing id are replaced.

use anyhow::Result;
use ragrank_core::NewDocument;
use std::path::PathBuf;

use crate::config::Config;
use crate::connector_fs;
use crate::persist;
use crate::service::RetrievalService;

pub async fn run_ingest(config: &Config, paths: &[PathBuf], dry_run: bool) -> Result<()> {
    let mut inputs: Vec<NewDocument> = Vec::new();
    for path in paths {
        if path.is_dir() {
            inputs.extend(connector_fs::scan_directory(path, &config.ingest)?);
        } else {
            inputs.push(connector_fs::read_file(path)?);
        }
    }

    if dry_run {
        println!("ingest (dry-run)");
        println!("  files found: {}", inputs.len());
        for input in &inputs {
            println!("  {}", input.id.as_deref().unwrap_or("(generated id)"));
        }
        return Ok(());
    }

    let service = RetrievalService::from_config(config)?;
    let found = inputs.len();
    let report = service.ingest_batch(inputs).await;

    persist::save_snapshot(&config.index.snapshot_path, &service.snapshot().await)?;

    let stats = service.stats().await;
    println!("ingest");
    println!("  files found: {}", found);
    println!("  indexed: {}", report.indexed.len());
    println!("  rejected: {}", report.failed.len());
    for failure in &report.failed {
        println!(
            "    {}: {}",
            failure.id.as_deref().unwrap_or("(no id)"),
            failure.error
        );
    }
    println!("  documents in index: {}", stats.documents);
    println!("  chunks in index: {}", stats.chunks);
    println!("ok");
    Ok(())
}
