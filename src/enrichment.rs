//! Enrichment pipeline: summary + tag extraction via the LLM oracle (SPEC_FULL §4.3).
//!
//! Processing is strictly sequential, one story at a time. A prior revision of the
//! source this was ported from also had a concurrent, semaphore-fanned variant; that
//! was a known bug, not an alternate valid implementation (SPEC_FULL §9) — it is not
//! reproduced here.

use std::sync::Arc;

use crate::llm::Oracle;
use crate::repo::{StoryRepo, SummaryRepo, TagRepo};
use crate::taxonomy::TaxonomyService;

#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct EnrichmentPipeline {
    stories: StoryRepo,
    summaries: SummaryRepo,
    tags: TagRepo,
    oracle: Arc<dyn Oracle>,
    model_name: String,
}

impl EnrichmentPipeline {
    pub fn new(
        stories: StoryRepo,
        summaries: SummaryRepo,
        tags: TagRepo,
        oracle: Arc<dyn Oracle>,
        model_name: impl Into<String>,
    ) -> Self {
        Self { stories, summaries, tags, oracle, model_name: model_name.into() }
    }

    /// Selects up to `limit` stories missing a summary or tags (highest score first)
    /// and enriches each one in turn. Returns the count actually processed (a null
    /// oracle result still counts as "attempted", not "enriched" — the story is left
    /// untouched and will be retried by the recovery job).
    pub async fn generate_missing(&self, limit: i64) -> Result<i64, EnrichmentError> {
        let candidates = self.stories.select_unenriched(limit).await?;
        let mut enriched = 0;

        for story in candidates {
            match self.oracle.summarize_and_tag(&story.title, story.url.as_deref()).await {
                Ok(result) => {
                    self.summaries.upsert(story.id, &result.summary, &self.model_name).await?;

                    let mut taxonomy = TaxonomyService::new(&self.tags);
                    let resolved = taxonomy.resolve_tags(&result.tags).await?;
                    for tag in resolved {
                        self.tags.attach_to_story(story.id, tag.id).await?;
                    }

                    self.stories.mark_enriched(story.id).await?;
                    enriched += 1;
                },
                Err(err) => {
                    tracing::warn!("oracle produced no enrichment for story {}: {}", story.id, err);
                },
            }
        }

        Ok(enriched)
    }
}
