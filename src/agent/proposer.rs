//! Proposer: converts analyzer findings into bounded, prioritized proposals
//! (SPEC_FULL §4.5).

use chrono::{Duration as ChronoDuration, Utc};

use crate::agent::analyzer::AnalysisResult;
use crate::llm::{Oracle, TagActionSuggestion};
use crate::models::{ProposalData, ProposalPriority, TagProposal};
use crate::repo::{AgentRepo, TagRepo};

const DUPLICATE_HIGH_SIMILARITY: f64 = 0.9;
const BLOATED_CATEGORY_PRIORITY: &str = "low";

pub struct Proposer<'a> {
    agent_repo: &'a AgentRepo,
    tags: &'a TagRepo,
    oracle: &'a dyn Oracle,
}

impl<'a> Proposer<'a> {
    pub fn new(agent_repo: &'a AgentRepo, tags: &'a TagRepo, oracle: &'a dyn Oracle) -> Self {
        Self { agent_repo, tags, oracle }
    }

    /// Builds, persists (as `pending`), and returns proposals drawn from `analysis`,
    /// sorted by (priority asc, affected_stories_count desc) and truncated to
    /// `max_proposals`.
    pub async fn propose(
        &self,
        run_id: i64,
        analysis: &AnalysisResult,
        window_days: i64,
        max_proposals: i64,
    ) -> Result<Vec<TagProposal>, sqlx::Error> {
        let window_start = Utc::now() - ChronoDuration::days(window_days);
        let mut proposals = Vec::new();

        for dup in &analysis.duplicate_candidates {
            let usage_a = self.tags.usage_in_window(&dup.a, window_start).await?;
            let usage_b = self.tags.usage_in_window(&dup.b, window_start).await?;

            let (target, source, loser_usage) =
                if usage_a >= usage_b { (&dup.a, &dup.b, usage_b) } else { (&dup.b, &dup.a, usage_a) };

            let priority = if dup.similarity > DUPLICATE_HIGH_SIMILARITY {
                ProposalPriority::Medium
            } else {
                ProposalPriority::Low
            };

            let data = ProposalData::MergeTags {
                sources: vec![source.clone()],
                target: target.clone(),
            };
            let reason = format!(
                "'{}' and '{}' are {:.0}% similar by name",
                dup.a,
                dup.b,
                dup.similarity * 100.0
            );

            let proposal = self
                .agent_repo
                .create_proposal(run_id, &data, priority.as_str(), &reason, loser_usage as i32)
                .await?;
            proposals.push(proposal);
        }

        if !analysis.sparse_tags.is_empty() {
            let sparse_names: Vec<String> =
                analysis.sparse_tags.iter().map(|t| t.name.clone()).collect();

            for suggestion in self.oracle.propose_tag_actions(&sparse_names).await {
                let (data, priority) = match suggestion {
                    TagActionSuggestion::Merge { sources, target } => {
                        (ProposalData::MergeTags { sources, target }, ProposalPriority::Low)
                    },
                    TagActionSuggestion::Create { name, category } => {
                        (ProposalData::CreateTag { name, category }, ProposalPriority::Low)
                    },
                    TagActionSuggestion::Retire { name, replacement } => {
                        (ProposalData::RetireTag { name, replacement }, ProposalPriority::Low)
                    },
                };

                let affected = match &data {
                    ProposalData::MergeTags { sources, .. } => {
                        let mut total = 0i64;
                        for name in sources {
                            total += self.tags.usage_in_window(name, window_start).await?;
                        }
                        total
                    },
                    ProposalData::RetireTag { name, .. } => {
                        self.tags.usage_in_window(name, window_start).await?
                    },
                    _ => 0,
                };

                let proposal = self
                    .agent_repo
                    .create_proposal(
                        run_id,
                        &data,
                        priority.as_str(),
                        "oracle-suggested conservative tag action on sparse tags",
                        affected as i32,
                    )
                    .await?;
                proposals.push(proposal);
            }
        }

        for bloated in &analysis.bloated_categories {
            let data = ProposalData::ReviewCategory {
                category: bloated.category.clone(),
                tag_count: bloated.tag_count,
                tags: bloated.top_tags.clone(),
            };
            let reason = format!(
                "category '{}' has {} tags, above the bloat threshold",
                bloated.category, bloated.tag_count
            );

            let proposal = self
                .agent_repo
                .create_proposal(run_id, &data, BLOATED_CATEGORY_PRIORITY, &reason, 0)
                .await?;
            proposals.push(proposal);
        }

        proposals.sort_by(|a, b| {
            priority_rank(&a.priority)
                .cmp(&priority_rank(&b.priority))
                .then(b.affected_stories_count.cmp(&a.affected_stories_count))
        });
        proposals.truncate(max_proposals as usize);

        Ok(proposals)
    }
}

fn priority_rank(priority: &str) -> u8 {
    match priority {
        "high" => 0,
        "medium" => 1,
        _ => 2,
    }
}
