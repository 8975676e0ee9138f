use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// A stored Hacker News story.
///
/// `upstream_id` is the HN item id and is the only externally meaningful identity;
/// `id` is a surrogate primary key used for joins.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Story {
    pub id: i64,
    pub upstream_id: i64,
    pub title: String,
    pub url: Option<String>,
    pub score: i32,
    pub author: String,
    pub comment_count: i32,
    pub upstream_created_at: DateTime<Utc>,
    pub is_summarized: bool,
    pub is_tagged: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields extracted from a raw upstream item, prior to persistence.
///
/// Defaults mirror the upstream API's own looseness: a deleted/incomplete item still
/// parses, just with empty/placeholder fields, so the scraper can record it was scanned.
#[derive(Debug, Clone)]
pub struct NewStory {
    pub upstream_id: i64,
    pub title: String,
    pub url: Option<String>,
    pub score: i32,
    pub author: String,
    pub comment_count: i32,
    pub upstream_created_at: DateTime<Utc>,
}

impl NewStory {
    /// Strips `url` to `None` unless its scheme is http(s), case-insensitively.
    pub fn sanitize_url(mut self) -> Self {
        let keep = self
            .url
            .as_deref()
            .map(|u| {
                let lower = u.to_ascii_lowercase();
                lower.starts_with("http://") || lower.starts_with("https://")
            })
            .unwrap_or(false);
        if !keep {
            self.url = None;
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StoryResponse {
    pub id: i64,
    pub upstream_id: i64,
    pub title: String,
    pub url: Option<String>,
    pub score: i32,
    pub author: String,
    pub comment_count: i32,
    pub upstream_created_at: DateTime<Utc>,
    pub is_summarized: bool,
    pub is_tagged: bool,
}

impl From<Story> for StoryResponse {
    fn from(s: Story) -> Self {
        Self {
            id: s.id,
            upstream_id: s.upstream_id,
            title: s.title,
            url: s.url,
            score: s.score,
            author: s.author,
            comment_count: s.comment_count,
            upstream_created_at: s.upstream_created_at,
            is_summarized: s.is_summarized,
            is_tagged: s.is_tagged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story(url: &str) -> NewStory {
        NewStory {
            upstream_id: 1,
            title: "t".into(),
            url: Some(url.to_string()),
            score: 0,
            author: "a".into(),
            comment_count: 0,
            upstream_created_at: Utc::now(),
        }
    }

    #[test]
    fn keeps_http_and_https() {
        assert_eq!(story("http://example.com").sanitize_url().url.as_deref(), Some("http://example.com"));
        assert_eq!(story("HTTPS://example.com").sanitize_url().url.as_deref(), Some("HTTPS://example.com"));
    }

    #[test]
    fn strips_other_schemes() {
        assert_eq!(story("ftp://example.com").sanitize_url().url, None);
        assert_eq!(story("javascript:alert(1)").sanitize_url().url, None);
    }
}
