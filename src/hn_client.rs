//! Client for the Firebase-shaped Hacker News upstream feed (SPEC_FULL §4.1, §6).

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::Semaphore;

const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF_MS: u64 = 200;

#[derive(Debug, thiserror::Error)]
pub enum HnClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawItem {
    pub id: i64,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub score: Option<i32>,
    #[serde(default)]
    pub by: Option<String>,
    #[serde(default)]
    pub descendants: Option<i32>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub dead: bool,
}

impl RawItem {
    pub fn is_live_story(&self) -> bool {
        self.item_type.as_deref() == Some("story") && !self.deleted && !self.dead
    }

    /// Projects a raw item into the ingestable shape, applying the original source's
    /// field defaults (title="", author="unknown", comment_count=0).
    pub fn into_new_story(self) -> crate::models::NewStory {
        let upstream_created_at = self
            .time
            .and_then(|t| DateTime::from_timestamp(t, 0))
            .unwrap_or_else(Utc::now);

        crate::models::NewStory {
            upstream_id: self.id,
            title: self.title.unwrap_or_default(),
            url: self.url,
            score: self.score.unwrap_or(0),
            author: self.by.unwrap_or_else(|| "unknown".to_string()),
            comment_count: self.descendants.unwrap_or(0),
            upstream_created_at,
        }
        .sanitize_url()
    }
}

#[derive(Clone)]
pub struct HnClient {
    http: reqwest::Client,
    base_url: String,
    semaphore: Arc<Semaphore>,
}

impl HnClient {
    pub fn new(base_url: impl Into<String>, max_concurrent: usize, timeout_secs: u64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("reqwest client config is valid");

        Self { http, base_url: base_url.into(), semaphore: Arc::new(Semaphore::new(max_concurrent)) }
    }

    async fn fetch_with_retry(&self, url: &str) -> Option<reqwest::Response> {
        let _permit = self.semaphore.acquire().await.ok()?;

        let mut attempt = 0;
        let mut backoff = Duration::from_millis(BASE_BACKOFF_MS);

        loop {
            attempt += 1;
            match self.http.get(url).send().await {
                Ok(resp) if resp.status().is_success() => return Some(resp),
                Ok(resp) if resp.status().as_u16() == 429 => {
                    if attempt >= MAX_ATTEMPTS {
                        return None;
                    }
                    tokio::time::sleep(backoff * 2).await;
                    backoff *= 2;
                },
                Ok(_) => return None,
                Err(err) => {
                    if !(err.is_timeout() || err.is_connect() || err.is_request()) || attempt >= MAX_ATTEMPTS {
                        tracing::warn!("hn client request to {} failed: {}", url, err);
                        return None;
                    }
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                },
            }
        }
    }

    async fn get_id_list(&self, path: &str) -> Vec<i64> {
        let url = format!("{}/{}.json", self.base_url, path);
        match self.fetch_with_retry(&url).await {
            Some(resp) => resp.json::<Vec<i64>>().await.unwrap_or_default(),
            None => Vec::new(),
        }
    }

    pub async fn get_top_ids(&self) -> Vec<i64> {
        self.get_id_list("topstories").await
    }

    pub async fn get_new_ids(&self) -> Vec<i64> {
        self.get_id_list("newstories").await
    }

    pub async fn get_best_ids(&self) -> Vec<i64> {
        self.get_id_list("beststories").await
    }

    /// Returns `None` when the payload is missing or not parseable as an integer.
    pub async fn get_max_item_id(&self) -> Option<i64> {
        let url = format!("{}/maxitem.json", self.base_url);
        let resp = self.fetch_with_retry(&url).await?;
        match resp.json::<i64>().await {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::warn!("maxitem payload was not an integer: {}", err);
                None
            },
        }
    }

    pub async fn get_item(&self, id: i64) -> Option<RawItem> {
        let url = format!("{}/item/{}.json", self.base_url, id);
        let resp = self.fetch_with_retry(&url).await?;
        resp.json::<RawItem>().await.ok()
    }

    /// Fetches `ids` concurrently (bounded by the shared semaphore) and returns only
    /// the live stories among them, in no particular order.
    pub async fn get_items_batch(&self, ids: &[i64]) -> Vec<RawItem> {
        let fetches = ids.iter().map(|&id| self.get_item(id));
        let items = futures::future::join_all(fetches).await;
        items.into_iter().flatten().filter(|item| item.is_live_story()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_story_requires_type_and_not_deleted_or_dead() {
        let mut item = RawItem {
            id: 1,
            item_type: Some("story".into()),
            title: None,
            url: None,
            score: None,
            by: None,
            descendants: None,
            time: None,
            deleted: false,
            dead: false,
        };
        assert!(item.is_live_story());

        item.deleted = true;
        assert!(!item.is_live_story());

        item.deleted = false;
        item.dead = true;
        assert!(!item.is_live_story());

        item.dead = false;
        item.item_type = Some("comment".into());
        assert!(!item.is_live_story());
    }

    #[test]
    fn new_story_applies_upstream_defaults() {
        let item = RawItem {
            id: 42,
            item_type: Some("story".into()),
            title: None,
            url: None,
            score: None,
            by: None,
            descendants: None,
            time: Some(1_700_000_000),
            deleted: false,
            dead: false,
        };
        let story = item.into_new_story();
        assert_eq!(story.title, "");
        assert_eq!(story.author, "unknown");
        assert_eq!(story.comment_count, 0);
        assert_eq!(story.upstream_id, 42);
    }
}
