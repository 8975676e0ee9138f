//! Continuous mode: forward-walks from the last seen id to the upstream max, then
//! sweeps the curated top/new/best lists to catch stories the sequential walk missed
//! (SPEC_FULL §4.2).

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use crate::config::Config;
use crate::hn_client::HnClient;
use crate::models::ScraperStateType;
use crate::repo::{ScraperStateRepo, StoryRepo};
use crate::scraper::kernel::{process_item_batch, ScraperError};
use crate::utils::ScheduledTask;

pub struct ContinuousJob {
    client: HnClient,
    stories: StoryRepo,
    state: ScraperStateRepo,
    batch_size: i64,
}

impl ContinuousJob {
    pub fn new(client: HnClient, stories: StoryRepo, state: ScraperStateRepo, config: &Config) -> Self {
        Self { client, stories, state, batch_size: config.scraper.continuous_batch_size }
    }

    pub async fn run_once(&self) -> Result<(), ScraperError> {
        let state_type = ScraperStateType::Continuous.as_str();

        let max_id = match self.client.get_max_item_id().await {
            Some(id) => id,
            None => {
                tracing::warn!("continuous: could not determine upstream max item id, skipping tick");
                return Ok(());
            },
        };

        let (mut state, created) = self
            .state
            .get_or_create_state_with_lock(state_type, (max_id - 1).max(0), None)
            .await?;

        if created {
            tracing::info!("continuous state initialized at current_item_id={}", state.current_item_id);
        }

        let mut current = state.current_item_id;

        while current < max_id {
            let batch_end = (current + self.batch_size).min(max_id);
            let ids: Vec<i64> = (current + 1..=batch_end).collect();

            let stats =
                process_item_batch(&self.client, &self.stories, &self.state, &ids, None).await?;

            self.state
                .update_progress(state_type, batch_end, "active", stats.items_scanned, stats.stories_new)
                .await?;

            current = batch_end;
        }

        state.current_item_id = current;

        self.curated_sweep().await?;

        Ok(())
    }

    /// Fetches top/new/best ids (deduplicated), drops the ones already stored, and
    /// upserts whatever remains. Catches items that became popular before the
    /// sequential scan reached them.
    async fn curated_sweep(&self) -> Result<(), ScraperError> {
        let (top, new, best) =
            tokio::join!(self.client.get_top_ids(), self.client.get_new_ids(), self.client.get_best_ids());

        let mut ids: Vec<i64> = HashSet::<i64>::from_iter(top.into_iter().chain(new).chain(best))
            .into_iter()
            .collect();
        ids.sort_unstable();

        if ids.is_empty() {
            return Ok(());
        }

        let existing = self.state.get_existing_ids(&ids).await?;
        let novel: Vec<i64> = ids.into_iter().filter(|id| !existing.contains(id)).collect();

        if novel.is_empty() {
            return Ok(());
        }

        let items = self.client.get_items_batch(&novel).await;
        let new_stories: Vec<_> = items.into_iter().map(|item| item.into_new_story()).collect();
        self.stories.upsert_many(&new_stories).await?;

        Ok(())
    }
}

impl ScheduledTask for ContinuousJob {
    fn run(&self) -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send + '_>> {
        Box::pin(async move { self.run_once().await.map_err(anyhow::Error::from) })
    }
}
