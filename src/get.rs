//! `ragrank get` and `ragrank remove`.

use anyhow::Result;

use crate::config::Config;
use crate::persist;
use crate::service::RetrievalService;

pub async fn run_get(config: &Config, id: &str) -> Result<()> {
    let service = RetrievalService::from_config(config)?;
    let Some((doc, chunks)) = service.get_document(id).await else {
        anyhow::bail!("document not found: {}", id);
    };

    println!("--- Document ---");
    println!("id:           {}", doc.id);
    println!("title:        {}", doc.title);
    println!(
        "created_at:   {}",
        doc.created_at.format("%Y-%m-%dT%H:%M:%SZ")
    );
    println!("words:        {}", doc.word_count());
    println!("metadata:     {}", serde_json::to_string(&doc.metadata)?);
    println!();

    println!("--- Body ---");
    println!("{}", doc.content);
    println!();

    println!("--- Chunks ({}) ---", chunks.len());
    for chunk in &chunks {
        println!(
            "[chunk {} words {}..{}]",
            chunk.id,
            chunk.start_index,
            chunk.end_index()
        );
        println!("{}", chunk.content);
        println!();
    }

    Ok(())
}

pub async fn run_remove(config: &Config, id: &str) -> Result<()> {
    let service = RetrievalService::from_config(config)?;
    let removed = service.remove_document(id).await?;
    persist::save_snapshot(&config.index.snapshot_path, &service.snapshot().await)?;
    println!("removed {} ({})", removed.id, removed.title);
    Ok(())
}
