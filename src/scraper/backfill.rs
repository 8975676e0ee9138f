//! Backfill mode: walks item ids downward from a ceiling toward a target timestamp
//! (SPEC_FULL §4.2).

use std::future::Future;
use std::pin::Pin;

use chrono::{Duration as ChronoDuration, Utc};

use crate::config::Config;
use crate::hn_client::HnClient;
use crate::models::ScraperStateType;
use crate::repo::{ScraperStateRepo, StoryRepo};
use crate::scraper::kernel::{process_item_batch, ScraperError};
use crate::utils::ScheduledTask;

pub struct BackfillJob {
    client: HnClient,
    stories: StoryRepo,
    state: ScraperStateRepo,
    batch_size: i64,
    max_batches: i64,
    backfill_days: i64,
    rate_limit_delay_ms: u64,
}

impl BackfillJob {
    pub fn new(
        client: HnClient,
        stories: StoryRepo,
        state: ScraperStateRepo,
        config: &Config,
    ) -> Self {
        Self {
            client,
            stories,
            state,
            batch_size: config.scraper.backfill_batch_size,
            max_batches: config.scraper.backfill_max_batches,
            backfill_days: config.scraper.backfill_days(config.environment),
            rate_limit_delay_ms: config.scraper.rate_limit_delay_ms,
        }
    }

    pub async fn run_once(&self) -> Result<(), ScraperError> {
        let state_type = ScraperStateType::Backfill.as_str();

        let existing = self.state.get_state(state_type).await?;

        let state = match existing {
            Some(s) if s.status == "completed" => {
                tracing::debug!("backfill already completed, nothing to do");
                return Ok(());
            },
            Some(s) => s,
            None => {
                let max_id = self.client.get_max_item_id().await.unwrap_or(0);
                let target = Utc::now() - ChronoDuration::days(self.backfill_days);
                let (state, _created) = self
                    .state
                    .get_or_create_state_with_lock(state_type, max_id, Some(target))
                    .await?;
                state
            },
        };

        let target_ts = state.target_timestamp;
        let mut current = state.current_item_id;

        for _ in 0..self.max_batches {
            if current <= 0 {
                self.state
                    .update_progress(state_type, 0, "completed", 0, 0)
                    .await?;
                break;
            }

            let batch_start = (current - self.batch_size + 1).max(1);
            let ids: Vec<i64> = (batch_start..=current).collect();

            let stats = process_item_batch(
                &self.client,
                &self.stories,
                &self.state,
                &ids,
                target_ts,
            )
            .await?;

            let next = batch_start - 1;
            let status = if next <= 0 || stats.reached_target_date { "completed" } else { "active" };

            self.state
                .update_progress(state_type, next.max(0), status, stats.items_scanned, stats.stories_new)
                .await?;

            current = next;

            if status == "completed" {
                break;
            }

            tokio::time::sleep(std::time::Duration::from_millis(self.rate_limit_delay_ms)).await;
        }

        Ok(())
    }
}

impl ScheduledTask for BackfillJob {
    fn run(&self) -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send + '_>> {
        Box::pin(async move { self.run_once().await.map_err(anyhow::Error::from) })
    }
}
