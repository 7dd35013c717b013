use anyhow::{Context, Result};
use ragrank_core::{Bm25Params, ChunkOptions, IndexOptions, RankingParams, SearchOptions, SemanticSignal};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub reranker: RerankerConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
        }
    }
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("./data/ragrank.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    500
}
fn default_overlap() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default = "default_k1")]
    pub k1: f64,
    #[serde(default = "default_b")]
    pub b: f64,
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f64,
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f64,
    #[serde(default = "default_title_boost")]
    pub title_boost: f64,
    #[serde(default = "default_exact_match_boost")]
    pub exact_match_boost: f64,
    #[serde(default = "default_tag_boost")]
    pub tag_boost: f64,
    #[serde(default = "default_relevance_scale")]
    pub relevance_scale: f64,
    #[serde(default)]
    pub semantic_signal: SemanticSignal,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            threshold: 0.0,
            k1: default_k1(),
            b: default_b(),
            semantic_weight: default_semantic_weight(),
            keyword_weight: default_keyword_weight(),
            title_boost: default_title_boost(),
            exact_match_boost: default_exact_match_boost(),
            tag_boost: default_tag_boost(),
            relevance_scale: default_relevance_scale(),
            semantic_signal: SemanticSignal::default(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_k1() -> f64 {
    1.5
}
fn default_b() -> f64 {
    0.75
}
fn default_semantic_weight() -> f64 {
    0.6
}
fn default_keyword_weight() -> f64 {
    0.4
}
fn default_title_boost() -> f64 {
    1.3
}
fn default_exact_match_boost() -> f64 {
    1.5
}
fn default_tag_boost() -> f64 {
    1.2
}
fn default_relevance_scale() -> f64 {
    10.0
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            dims: default_dims(),
        }
    }
}

fn default_embedding_provider() -> String {
    "hash".to_string()
}
fn default_dims() -> usize {
    384
}

#[derive(Debug, Deserialize, Clone)]
pub struct RerankerConfig {
    #[serde(default = "default_reranker_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_reranker_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            provider: default_reranker_provider(),
            model: None,
            endpoint: default_endpoint(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_reranker_timeout_secs(),
            max_candidates: default_max_candidates(),
        }
    }
}

impl RerankerConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_reranker_provider() -> String {
    "disabled".to_string()
}
fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_reranker_timeout_secs() -> u64 {
    10
}
fn default_max_candidates() -> usize {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_workers() -> usize {
    4
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string(), "**/*.txt".to_string()]
}

impl Config {
    pub fn chunk_options(&self) -> ChunkOptions {
        ChunkOptions {
            chunk_size: self.chunking.chunk_size,
            overlap: self.chunking.overlap,
        }
    }

    pub fn ranking_params(&self) -> RankingParams {
        let r = &self.retrieval;
        RankingParams {
            semantic_weight: r.semantic_weight,
            keyword_weight: r.keyword_weight,
            title_boost: r.title_boost,
            exact_match_boost: r.exact_match_boost,
            tag_boost: r.tag_boost,
            relevance_scale: r.relevance_scale,
            bm25: Bm25Params { k1: r.k1, b: r.b },
            semantic_signal: r.semantic_signal,
        }
    }

    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            chunking: self.chunk_options(),
            ranking: self.ranking_params(),
        }
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            top_k: self.retrieval.top_k,
            threshold: self.retrieval.threshold,
            explain: false,
        }
    }

    /// [`Config::search_options`] with command-line overrides applied and
    /// checked against the same bounds as the config file.
    pub fn search_options_with(
        &self,
        limit: Option<usize>,
        threshold: Option<f64>,
    ) -> Result<SearchOptions> {
        let mut options = self.search_options();
        if let Some(limit) = limit {
            check_top_k(limit).context("Invalid --limit")?;
            options.top_k = limit;
        }
        if let Some(threshold) = threshold {
            check_threshold(threshold).context("Invalid --threshold")?;
            options.threshold = threshold;
        }
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        self.index_options()
            .validate()
            .context("Invalid [chunking] or [retrieval] settings")?;

        check_top_k(self.retrieval.top_k).context("Invalid retrieval.top_k")?;
        check_threshold(self.retrieval.threshold).context("Invalid retrieval.threshold")?;

        match self.embedding.provider.as_str() {
            "hash" => {}
            other => anyhow::bail!("Unknown embedding provider: '{}'. Must be hash.", other),
        }
        if self.embedding.dims == 0 {
            anyhow::bail!("embedding.dims must be > 0");
        }

        match self.reranker.provider.as_str() {
            "disabled" => {}
            "openai" => {
                if self.reranker.model.as_deref().map_or(true, |m| m.trim().is_empty()) {
                    anyhow::bail!("reranker.model must be specified when provider is 'openai'");
                }
            }
            other => anyhow::bail!(
                "Unknown reranker provider: '{}'. Must be disabled or openai.",
                other
            ),
        }
        if self.reranker.timeout_secs == 0 {
            anyhow::bail!("reranker.timeout_secs must be > 0");
        }
        if self.reranker.max_candidates == 0 {
            anyhow::bail!("reranker.max_candidates must be > 0");
        }

        if self.ingest.workers == 0 {
            anyhow::bail!("ingest.workers must be > 0");
        }

        Ok(())
    }
}

/// Parse and validate TOML config text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Load the config at `path`, or the defaults if the file does not exist.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found; using defaults");
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

fn check_top_k(top_k: usize) -> Result<()> {
    if top_k < 1 {
        anyhow::bail!("top_k must be >= 1, got {}", top_k);
    }
    Ok(())
}

fn check_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        anyhow::bail!("threshold must be in [0.0, 1.0], got {}", threshold);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.threshold, 0.0);
        assert_eq!(config.chunk_options(), ChunkOptions::default());
        assert_eq!(config.ranking_params(), RankingParams::default());
        assert_eq!(config.embedding.dims, 384);
        assert!(!config.reranker.is_enabled());
        assert_eq!(config.ingest.workers, 4);
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = parse_config(
            r#"
[index]
snapshot_path = "/tmp/idx.json"

[chunking]
chunk_size = 200
overlap = 20

[retrieval]
top_k = 3
threshold = 0.2
semantic_signal = "embedding"

[reranker]
provider = "openai"
model = "gpt-4o-mini"
"#,
        )
        .unwrap();
        assert_eq!(config.index.snapshot_path, PathBuf::from("/tmp/idx.json"));
        assert_eq!(config.chunk_options().chunk_size, 200);
        assert_eq!(config.search_options().top_k, 3);
        assert_eq!(config.ranking_params().semantic_signal, SemanticSignal::Embedding);
        assert!(config.reranker.is_enabled());
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let cases = [
            "[chunking]\nchunk_size = 10\noverlap = 10",
            "[retrieval]\ntop_k = 0",
            "[retrieval]\nthreshold = 1.5",
            "[retrieval]\nkeyword_weight = -0.1",
            "[embedding]\nprovider = \"magic\"",
            "[reranker]\nprovider = \"openai\"",
            "[reranker]\nprovider = \"other\"\nmodel = \"m\"",
            "[ingest]\nworkers = 0",
        ];
        for case in cases {
            assert!(parse_config(case).is_err(), "accepted: {case}");
        }
    }

    #[test]
    fn test_search_overrides_checked() {
        let config = Config::default();
        let options = config.search_options_with(Some(2), Some(0.3)).unwrap();
        assert_eq!(options.top_k, 2);
        assert_eq!(options.threshold, 0.3);
        assert_eq!(config.search_options_with(None, None).unwrap().top_k, 5);

        assert!(config.search_options_with(Some(0), None).is_err());
        assert!(config.search_options_with(None, Some(5.0)).is_err());
        assert!(config.search_options_with(None, Some(-0.1)).is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.retrieval.top_k, 5);
    }
}
