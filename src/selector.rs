//! Optional LLM document selection.
//!
//! A [`DocumentSelector`] is shown the query and the top locally-ranked
//! candidates and replies with raw text. That text only counts if
//! [`parse_selection`] accepts it: a JSON array of distinct, known document
//! ids, optionally wrapped in one Markdown code fence. Anything else is an
//! [`RetrievalError::ExternalProvider`] and the caller keeps its local
//! ranking.
//!
//! [`OpenAiSelector`] talks to any OpenAI-compatible chat-completions
//! endpoint.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use ragrank_core::{Result, RetrievalError, SearchResult};

use crate::config::RerankerConfig;

/// Characters of chunk text shown to the selector per candidate.
const SNIPPET_CHARS: usize = 300;

/// What the selector sees of one locally-ranked result.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionCandidate {
    pub id: String,
    pub title: String,
    pub snippet: String,
}

impl SelectionCandidate {
    pub fn from_result(result: &SearchResult) -> Self {
        Self {
            id: result.document_id.clone(),
            title: result.title.clone(),
            snippet: result.content.chars().take(SNIPPET_CHARS).collect(),
        }
    }
}

/// External collaborator that picks the documents worth keeping.
#[async_trait]
pub trait DocumentSelector: Send + Sync {
    fn name(&self) -> &str;

    /// Raw reply for `query` over `candidates`. Parsed by the caller.
    async fn select(&self, query: &str, candidates: &[SelectionCandidate]) -> Result<String>;
}

pub fn build_selection_prompt(query: &str, candidates: &[SelectionCandidate]) -> String {
    let mut prompt = format!(
        "Query: {query}\n\n\
         Choose the documents that help answer the query. Reply with a JSON array \
         of their ids, most useful first, and nothing else.\n\nDocuments:\n"
    );
    for c in candidates {
        prompt.push_str(&format!("\nid: {}\ntitle: {}\n{}\n", c.id, c.title, c.snippet));
    }
    prompt
}

/// Strictly parse a selector reply into document ids.
///
/// Accepts a JSON array of strings, optionally inside a single ```` ``` ````
/// fence. The array must be non-empty, contain no duplicates, and name only
/// ids in `known_ids`.
pub fn parse_selection(raw: &str, known_ids: &[&str]) -> Result<Vec<String>> {
    let body = strip_code_fence(raw.trim());
    let ids: Vec<String> = serde_json::from_str(body).map_err(|e| {
        RetrievalError::external(format!("selector reply is not a JSON array of ids: {e}"))
    })?;

    if ids.is_empty() {
        return Err(RetrievalError::external("selector chose no documents"));
    }

    let known: HashSet<&str> = known_ids.iter().copied().collect();
    let mut seen = HashSet::new();
    for id in &ids {
        if !known.contains(id.as_str()) {
            return Err(RetrievalError::external(format!(
                "selector returned unknown id '{id}'"
            )));
        }
        if !seen.insert(id.as_str()) {
            return Err(RetrievalError::external(format!(
                "selector returned '{id}' more than once"
            )));
        }
    }
    Ok(ids)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return text;
    };
    // Drop an info string such as `json` on the opening line.
    match inner.split_once('\n') {
        Some((info, body)) if !info.trim_start().starts_with('[') => body.trim(),
        _ => inner.trim(),
    }
}

/// Selector backed by an OpenAI-compatible chat-completions API.
pub struct OpenAiSelector {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiSelector {
    /// # Errors
    ///
    /// Returns an error if `model` is not set or the HTTP client cannot be
    /// built. A missing API key is allowed for local endpoints.
    pub fn new(config: &RerankerConfig) -> anyhow::Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("reranker.model required for OpenAI selector"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model,
            api_key: std::env::var(&config.api_key_env).ok(),
        })
    }
}

#[async_trait]
impl DocumentSelector for OpenAiSelector {
    fn name(&self) -> &str {
        &self.model
    }

    async fn select(&self, query: &str, candidates: &[SelectionCandidate]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                {
                    "role": "system",
                    "content": "You rank search results. Reply only with a JSON array of document ids."
                },
                { "role": "user", "content": build_selection_prompt(query, candidates) }
            ]
        });

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| RetrievalError::external(format!("selector request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RetrievalError::external(format!(
                "selector API error {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RetrievalError::external(format!("selector response unreadable: {e}")))?;
        parse_chat_response(&json)
    }
}

/// Extract `choices[0].message.content`.
fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| RetrievalError::external("invalid chat response: missing choices[0].message.content"))
}

/// Build the configured selector, or `None` when reranking is disabled.
pub fn create_selector(config: &RerankerConfig) -> anyhow::Result<Option<Arc<dyn DocumentSelector>>> {
    match config.provider.as_str() {
        "disabled" => Ok(None),
        "openai" => Ok(Some(Arc::new(OpenAiSelector::new(config)?))),
        other => bail!("Unknown reranker provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN: &[&str] = &["a", "b", "c"];

    #[test]
    fn test_parse_plain_array() {
        assert_eq!(parse_selection(r#"["b","a"]"#, KNOWN).unwrap(), vec!["b", "a"]);
        assert_eq!(parse_selection("  [\"c\"]\n", KNOWN).unwrap(), vec!["c"]);
    }

    #[test]
    fn test_parse_fenced_array() {
        let raw = "```json\n[\"a\", \"c\"]\n```";
        assert_eq!(parse_selection(raw, KNOWN).unwrap(), vec!["a", "c"]);
        let bare = "```\n[\"b\"]\n```";
        assert_eq!(parse_selection(bare, KNOWN).unwrap(), vec!["b"]);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        let bad = [
            "",
            "a, b",
            "Sure! Here are the ids: [\"a\"]",
            r#"{"ids": ["a"]}"#,
            "[1, 2]",
            "[]",
            r#"["a", "a"]"#,
            r#"["a", "zzz"]"#,
            "```json\n[\"a\"]",
        ];
        for raw in bad {
            let err = parse_selection(raw, KNOWN).unwrap_err();
            assert!(
                matches!(err, RetrievalError::ExternalProvider { .. }),
                "accepted: {raw}"
            );
        }
    }

    #[test]
    fn test_prompt_lists_candidates() {
        let candidates = vec![
            SelectionCandidate {
                id: "a".into(),
                title: "Alpha".into(),
                snippet: "first".into(),
            },
            SelectionCandidate {
                id: "b".into(),
                title: "Beta".into(),
                snippet: "second".into(),
            },
        ];
        let prompt = build_selection_prompt("what?", &candidates);
        assert!(prompt.starts_with("Query: what?"));
        assert!(prompt.contains("id: a\ntitle: Alpha\nfirst"));
        assert!(prompt.contains("id: b\ntitle: Beta\nsecond"));
    }

    #[test]
    fn test_parse_chat_response() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "[\"a\"]" } }]
        });
        assert_eq!(parse_chat_response(&json).unwrap(), "[\"a\"]");
        assert!(parse_chat_response(&serde_json::json!({})).is_err());
    }

    #[test]
    fn test_create_selector_disabled() {
        assert!(create_selector(&RerankerConfig::default()).unwrap().is_none());
    }
}
