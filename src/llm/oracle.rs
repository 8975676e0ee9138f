//! The LLM oracle: an injectable capability producing structured `{summary, tags}`
//! output from `{title, url}`, so the enrichment pipeline and the agent can be tested
//! against deterministic stubs (SPEC_FULL §9).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::EnrichmentResult;

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("oracle not configured: {0}")]
    NotConfigured(String),

    #[error("oracle api error: {0}")]
    ApiError(String),

    #[error("oracle response parsing error: {0}")]
    ParseError(String),

    #[error("oracle timeout after {0}s")]
    Timeout(u64),
}

/// A capability producing summary+tag output for a single story. Implementations
/// must never let a transport/timeout/parse failure escape as a panic; the
/// enrichment pipeline treats a returned `Err` identically to "no enrichment this
/// tick" and moves on.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn summarize_and_tag(&self, title: &str, url: Option<&str>) -> Result<EnrichmentResult, OracleError>;

    /// Given candidate sparse tags, propose conservative merge/create/retire actions.
    /// Returns an empty vec on any failure rather than raising (SPEC_FULL §4.5).
    async fn propose_tag_actions(&self, sparse_tags: &[String]) -> Vec<TagActionSuggestion>;
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TagActionSuggestion {
    Merge { sources: Vec<String>, target: String },
    Create { name: String, category: Option<String> },
    Retire { name: String, replacement: Option<String> },
}

const TAXONOMY_PROMPT_PREFIX: &str = "You are tagging a tech-news story into a fixed taxonomy. \
L1 (pick 0-1): Tech, Business, Science, Society. \
L2 (pick 0-2, must match a known category exactly): Region, Tech Stacks, Tech Topics, Business, Science tags. \
L3 (pick 0-3): any specific, long-tail topic. \
Return strict JSON: {\"summary\": string, \"tags\": {\"l1\": [], \"l2\": [], \"l3\": []}}.";

const SPARSE_TAG_PROMPT_PREFIX: &str = "You maintain a tag taxonomy for a tech news aggregator. \
Given this list of low-usage tags, be conservative: only propose merging near-duplicates into a \
canonical form, creating a tag if truly missing a category, or retiring genuinely useless tags. \
Return strict JSON: {\"actions\": [{\"action\": \"merge\"|\"create\"|\"retire\", ...}]}.";

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    response_format: ResponseFormat,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct SparseTagResponse {
    #[serde(default)]
    actions: Vec<TagActionSuggestion>,
}

/// OpenAI-compatible chat-completions oracle. Degrades to `Err`/empty-vec on any
/// transport, status, or parse failure rather than propagating an exception into
/// the scheduler.
pub struct OpenAiOracle {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiOracle {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("reqwest client config is valid"),
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    async fn chat(&self, system_prompt: &str, user_content: String) -> Result<String, OracleError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage { role: "system", content: system_prompt.to_string() },
                ChatMessage { role: "user", content: user_content },
            ],
            temperature: 0.2,
            response_format: ResponseFormat { r#type: "json_object" },
        };

        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout(60)
                } else {
                    OracleError::ApiError(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(OracleError::ApiError(format!("status {}", response.status())));
        }

        let parsed: ChatCompletionResponse =
            response.json().await.map_err(|e| OracleError::ParseError(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OracleError::ParseError("empty choices".to_string()))
    }
}

#[async_trait]
impl Oracle for OpenAiOracle {
    async fn summarize_and_tag(&self, title: &str, url: Option<&str>) -> Result<EnrichmentResult, OracleError> {
        if self.api_key.is_empty() {
            return Err(OracleError::NotConfigured("no api key set".to_string()));
        }

        let user_content = format!("Title: {}\nURL: {}", title, url.unwrap_or("(none)"));
        let content = self.chat(TAXONOMY_PROMPT_PREFIX, user_content).await?;

        serde_json::from_str(&content).map_err(|e| OracleError::ParseError(e.to_string()))
    }

    async fn propose_tag_actions(&self, sparse_tags: &[String]) -> Vec<TagActionSuggestion> {
        if self.api_key.is_empty() || sparse_tags.is_empty() {
            return Vec::new();
        }

        let user_content = format!("Tags: {}", sparse_tags.join(", "));
        let content = match self.chat(SPARSE_TAG_PROMPT_PREFIX, user_content).await {
            Ok(c) => c,
            Err(err) => {
                tracing::warn!("oracle sparse-tag proposal failed: {}", err);
                return Vec::new();
            },
        };

        match serde_json::from_str::<SparseTagResponse>(&content) {
            Ok(parsed) => parsed.actions,
            Err(err) => {
                tracing::warn!("oracle sparse-tag response unparseable: {}", err);
                Vec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubOracle {
        result: EnrichmentResult,
    }

    #[async_trait]
    impl Oracle for StubOracle {
        async fn summarize_and_tag(&self, _title: &str, _url: Option<&str>) -> Result<EnrichmentResult, OracleError> {
            Ok(self.result.clone())
        }

        async fn propose_tag_actions(&self, _sparse_tags: &[String]) -> Vec<TagActionSuggestion> {
            Vec::new()
        }
    }

    #[tokio::test]
    async fn stub_oracle_returns_deterministic_output() {
        let oracle = StubOracle {
            result: EnrichmentResult {
                summary: "a summary".to_string(),
                tags: crate::models::FlatTags {
                    l1: vec!["Tech".to_string()],
                    l2: vec!["Rust".to_string()],
                    l3: vec![],
                },
            },
        };

        let result = oracle.summarize_and_tag("title", None).await.unwrap();
        assert_eq!(result.summary, "a summary");
        assert_eq!(result.tags.l1, vec!["Tech"]);
    }
}
