//! Scheduler: composes the backfill, continuous, recovery, and agent jobs as
//! independent periodic tasks (SPEC_FULL §4.7).
//!
//! Each job runs in its own spawned loop via `ScheduledExecutor`, so one job's
//! failure never unregisters the others, and a job never overlaps with its own
//! next tick (the executor awaits each run to completion before scheduling the next).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::agent::{Orchestrator, OrchestratorMode};
use crate::config::Config;
use crate::enrichment::EnrichmentPipeline;
use crate::hn_client::HnClient;
use crate::llm::Oracle;
use crate::repo::{AgentRepo, ScraperStateRepo, StoryRepo, SummaryRepo, TagRepo};
use crate::scraper::{BackfillJob, ContinuousJob};
use crate::utils::{ScheduledExecutor, ScheduledTask};

/// Wraps the continuous forward-walk with the "generate missing summaries" step the
/// spec bundles onto the same tick (SPEC_FULL §4.7).
struct ContinuousTickJob {
    continuous: ContinuousJob,
    enrichment: EnrichmentPipeline,
    batch_size: i64,
}

impl ScheduledTask for ContinuousTickJob {
    fn run(&self) -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send + '_>> {
        Box::pin(async move {
            self.continuous.run_once().await?;
            self.enrichment.generate_missing(self.batch_size).await?;
            Ok(())
        })
    }
}

/// The reconciliation loop: re-runs enrichment over any story still missing a summary
/// or tags, guaranteeing eventual completeness even after an oracle outage
/// (SPEC_FULL §4.7).
struct RecoveryJob {
    enrichment: EnrichmentPipeline,
    batch_size: i64,
}

impl ScheduledTask for RecoveryJob {
    fn run(&self) -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send + '_>> {
        Box::pin(async move {
            let processed = self.enrichment.generate_missing(self.batch_size).await?;
            tracing::debug!("recovery pass enriched {} stories", processed);
            Ok(())
        })
    }
}

struct AgentJob {
    orchestrator: Orchestrator,
    mode: OrchestratorMode,
}

impl ScheduledTask for AgentJob {
    fn run(&self) -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send + '_>> {
        Box::pin(async move {
            let (_run, proposals) = self.orchestrator.run(self.mode).await?;
            tracing::info!("agent run produced {} proposals", proposals.len());
            Ok(())
        })
    }
}

/// Constructed, not process-wide, dependency (SPEC_FULL §9): tests build a fresh
/// `Scheduler` per case rather than reaching into module statics.
pub struct Scheduler {
    config: Config,
    pool: PgPool,
    hn_client: HnClient,
    oracle: Arc<dyn Oracle>,
}

impl Scheduler {
    pub fn new(config: Config, pool: PgPool, hn_client: HnClient, oracle: Arc<dyn Oracle>) -> Self {
        Self { config, pool, hn_client, oracle }
    }

    /// Spawns the four jobs as independent background tasks and returns immediately;
    /// each loop runs until the process exits.
    pub fn start(&self) {
        let stories = StoryRepo::new(self.pool.clone());
        let tags = TagRepo::new(self.pool.clone());
        let summaries = SummaryRepo::new(self.pool.clone());
        let state = ScraperStateRepo::new(self.pool.clone());
        let agent_repo = AgentRepo::new(self.pool.clone());

        let backfill = BackfillJob::new(self.hn_client.clone(), stories.clone(), state.clone(), &self.config);
        tokio::spawn(
            ScheduledExecutor::new(
                "backfill",
                Duration::from_secs(self.config.scraper.backfill_interval_minutes * 60),
            )
            .start(backfill),
        );

        let continuous = ContinuousJob::new(self.hn_client.clone(), stories.clone(), state.clone(), &self.config);
        let continuous_enrichment = EnrichmentPipeline::new(
            stories.clone(),
            summaries.clone(),
            tags.clone(),
            self.oracle.clone(),
            self.config.enrichment.summarization_model.clone(),
        );
        let continuous_tick = ContinuousTickJob {
            continuous,
            enrichment: continuous_enrichment,
            batch_size: self.config.enrichment.summarization_batch_size,
        };
        tokio::spawn(
            ScheduledExecutor::new(
                "continuous",
                Duration::from_secs(self.config.scraper.continuous_interval_minutes * 60),
            )
            .start(continuous_tick),
        );

        let recovery = RecoveryJob {
            enrichment: EnrichmentPipeline::new(
                stories.clone(),
                summaries.clone(),
                tags.clone(),
                self.oracle.clone(),
                self.config.enrichment.summarization_model.clone(),
            ),
            batch_size: self.config.enrichment.summarization_batch_size,
        };
        tokio::spawn(
            ScheduledExecutor::new(
                "recovery",
                Duration::from_secs(self.config.scraper.recovery_interval_minutes * 60),
            )
            .start(recovery),
        );

        let analyzer = crate::agent::Analyzer::new(self.pool.clone());
        let orchestrator = Orchestrator::new(analyzer, agent_repo, tags, self.oracle.clone(), &self.config);
        let agent_mode = if self.config.agent.enable_auto_approve {
            OrchestratorMode::AutoApply
        } else {
            OrchestratorMode::Proposal
        };
        let agent_job = AgentJob { orchestrator, mode: agent_mode };
        tokio::spawn(
            ScheduledExecutor::new(
                "agent",
                Duration::from_secs(self.config.agent.run_interval_weeks * 7 * 24 * 60 * 60),
            )
            .start(agent_job),
        );
    }
}
