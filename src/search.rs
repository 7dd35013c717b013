//! `ragrank search`, `ragrank similar`, and `ragrank ask`.

use anyhow::Result;
use ragrank_core::{RetrievalError, SearchResult};

use crate::config::Config;
use crate::service::RetrievalService;

pub async fn run_search(
    config: &Config,
    query: &str,
    limit: Option<usize>,
    threshold: Option<f64>,
    explain: bool,
) -> Result<()> {
    let options = config
        .search_options_with(limit, threshold)?
        .with_explain(explain);
    let service = RetrievalService::from_config(config)?;

    let results = service.search(query, &options).await?;
    print_results(&results);
    Ok(())
}

pub async fn run_similar(config: &Config, id: &str, limit: Option<usize>) -> Result<()> {
    let limit = config.search_options_with(limit, None)?.top_k;
    let service = RetrievalService::from_config(config)?;
    let results = service.find_similar_documents(id, limit).await?;
    print_results(&results);
    Ok(())
}

pub async fn run_ask(config: &Config, question: &str, limit: Option<usize>) -> Result<()> {
    let options = config.search_options_with(limit, None)?;
    let service = RetrievalService::from_config(config)?;

    let answer = match service.answer(question, &options).await {
        Ok(answer) => answer,
        Err(RetrievalError::EmptyCorpus) => {
            println!("No documents indexed. Run `ragrank ingest <path>` first.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!("question:   {}", answer.question);
    println!("confidence: {:.2}", answer.confidence);
    println!("sources:    {}", answer.sources.len());
    println!();
    if answer.sources.is_empty() {
        println!("No relevant sources.");
    } else {
        println!("{}", answer.context());
    }
    Ok(())
}

fn print_results(results: &[SearchResult]) {
    if results.is_empty() {
        println!("No results.");
        return;
    }

    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [{:.2}] {}",
            i + 1,
            result.relevance,
            result.title
        );
        println!("    score: {:.4}", result.score);
        if let Some(ref reason) = result.relevance_reason {
            println!("    boosted: {}", reason);
        }
        println!(
            "    excerpt: \"{}\"",
            excerpt(&result.content).replace('\n', " ").trim()
        );
        println!("    id: {}", result.document_id);
        if let Some(ref explain) = result.explain {
            println!(
                "    explain: semantic={:.4} keyword={:.4} base={:.4} boost={:.3}",
                explain.semantic_score, explain.keyword_score, explain.base_score, explain.boost
            );
        }
        println!();
    }
}

fn excerpt(text: &str) -> String {
    const MAX_CHARS: usize = 240;
    if text.chars().count() <= MAX_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX_CHARS).collect();
    format!("{}…", cut.trim_end())
}
