//! Shared batch-processing kernel used by both backfill and continuous mode (SPEC_FULL §4.2).

use chrono::{DateTime, Utc};

use crate::hn_client::HnClient;
use crate::models::{BatchStats, NewStory};
use crate::repo::{ScraperStateRepo, StoryRepo};

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Scans `ids`, skipping ones already stored, fetches the rest from upstream, and
/// bulk-upserts the live stories found. `target_ts` (when set) truncates the batch at
/// the first story that predates it and reports `reached_target_date`.
pub async fn process_item_batch(
    client: &HnClient,
    stories: &StoryRepo,
    state: &ScraperStateRepo,
    ids: &[i64],
    target_ts: Option<DateTime<Utc>>,
) -> Result<BatchStats, ScraperError> {
    let mut stats = BatchStats { items_scanned: ids.len() as i64, ..Default::default() };

    if ids.is_empty() {
        return Ok(stats);
    }

    let existing = state.get_existing_ids(ids).await?;
    let novel: Vec<i64> = ids.iter().copied().filter(|id| !existing.contains(id)).collect();

    if novel.is_empty() {
        return Ok(stats);
    }

    let items = client.get_items_batch(&novel).await;
    let mut new_stories: Vec<NewStory> = items.into_iter().map(|item| item.into_new_story()).collect();

    if let Some(target) = target_ts {
        if new_stories.iter().any(|s| s.upstream_created_at < target) {
            new_stories.retain(|s| s.upstream_created_at >= target);
            stats.reached_target_date = true;
        }
    }

    stats.stories_found = new_stories.len() as i64;

    let inserted_ids = stories.upsert_many(&new_stories).await?;
    stats.stories_new = inserted_ids.len() as i64;

    Ok(stats)
}
