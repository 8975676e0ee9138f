use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Summary {
    pub id: i64,
    pub story_id: i64,
    pub text: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

/// Structured output the LLM oracle is expected to return for a single story.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub summary: String,
    pub tags: FlatTags,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlatTags {
    #[serde(default)]
    pub l1: Vec<String>,
    #[serde(default)]
    pub l2: Vec<String>,
    #[serde(default)]
    pub l3: Vec<String>,
}

impl FlatTags {
    /// Iterates tags in the fixed L1, L2, L3 order, which is what downstream
    /// dedupe-by-slug-preserve-first-seen-order relies on.
    pub fn iter_all(&self) -> impl Iterator<Item = &str> {
        self.l1.iter().chain(self.l2.iter()).chain(self.l3.iter()).map(String::as_str)
    }
}
