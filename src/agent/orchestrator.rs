//! Orchestrator: composes analyzer → proposer → (auto-approve) into the run modes the
//! scheduler drives (SPEC_FULL §4.5).

use serde_json::json;

use crate::agent::analyzer::{AnalysisResult, Analyzer};
use crate::agent::proposer::Proposer;
use crate::agent::reorganizer::AgentError;
use crate::config::Config;
use crate::llm::Oracle;
use crate::models::{is_low_risk, AgentRun, ProposalPriority, ProposalType, TagProposal};
use crate::repo::{AgentRepo, TagRepo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorMode {
    Analysis,
    Proposal,
    AutoApply,
}

impl OrchestratorMode {
    fn run_type(self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::Proposal | Self::AutoApply => "proposal",
        }
    }
}

pub struct Orchestrator {
    analyzer: Analyzer,
    agent_repo: AgentRepo,
    tags: TagRepo,
    oracle: std::sync::Arc<dyn Oracle>,
    window_days: i64,
    min_tag_usage: i64,
    max_proposals_per_run: i64,
    auto_approve_max_affected: i32,
}

impl Orchestrator {
    pub fn new(
        analyzer: Analyzer,
        agent_repo: AgentRepo,
        tags: TagRepo,
        oracle: std::sync::Arc<dyn Oracle>,
        config: &Config,
    ) -> Self {
        Self {
            analyzer,
            agent_repo,
            tags,
            oracle,
            window_days: config.agent.analysis_window_days,
            min_tag_usage: config.agent.min_tag_usage,
            max_proposals_per_run: config.agent.max_proposals_per_run,
            auto_approve_max_affected: config.agent.auto_approve_max_affected,
        }
    }

    /// Runs `mode`, persisting an `AgentRun` row that tracks its outcome. Returns that
    /// row alongside the proposals created (empty for `Analysis` mode, which instead
    /// persists the analyzer's findings onto the run's `result_data`, per SPEC_FULL §4.5).
    pub async fn run(&self, mode: OrchestratorMode) -> Result<(AgentRun, Vec<TagProposal>), AgentError> {
        let run = self.agent_repo.start_run(mode.run_type()).await?;

        let result = self.run_inner(mode, run.id).await;

        match &result {
            Ok((proposals, analysis)) => {
                let summary = if mode == OrchestratorMode::Analysis {
                    json!({ "analysis": analysis })
                } else {
                    json!({ "proposal_count": proposals.len() })
                };
                self.agent_repo.complete_run(run.id, summary).await?;
            },
            Err(err) => {
                self.agent_repo.fail_run(run.id, &err.to_string()).await?;
            },
        }

        let (proposals, _analysis) = result?;
        let run = self.agent_repo.get_run(run.id).await?.unwrap_or(run);
        Ok((run, proposals))
    }

    async fn run_inner(
        &self,
        mode: OrchestratorMode,
        run_id: i64,
    ) -> Result<(Vec<TagProposal>, AnalysisResult), AgentError> {
        let analysis = self.analyzer.analyze(self.window_days, self.min_tag_usage).await?;

        if mode == OrchestratorMode::Analysis {
            return Ok((Vec::new(), analysis));
        }

        let proposer = Proposer::new(&self.agent_repo, &self.tags, self.oracle.as_ref());
        let proposals = proposer
            .propose(run_id, &analysis, self.window_days, self.max_proposals_per_run)
            .await?;

        if mode != OrchestratorMode::AutoApply {
            return Ok((proposals, analysis));
        }

        let mut updated = Vec::with_capacity(proposals.len());
        for proposal in proposals {
            let proposal_type = ProposalType::parse(&proposal.proposal_type);
            let priority = parse_priority(&proposal.priority);

            let low_risk = match (proposal_type, priority) {
                (Some(pt), Some(pr)) => {
                    is_low_risk(pt, proposal.affected_stories_count, pr, self.auto_approve_max_affected)
                },
                _ => false,
            };

            if low_risk {
                self.agent_repo.set_status(proposal.id, "approved", Some("agent:auto-approve")).await?;
                updated.push(self.agent_repo.get_proposal(proposal.id).await?.unwrap_or(proposal));
            } else {
                updated.push(proposal);
            }
        }

        Ok((updated, analysis))
    }
}

fn parse_priority(s: &str) -> Option<ProposalPriority> {
    match s {
        "high" => Some(ProposalPriority::High),
        "medium" => Some(ProposalPriority::Medium),
        "low" => Some(ProposalPriority::Low),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_priorities() {
        assert_eq!(parse_priority("high"), Some(ProposalPriority::High));
        assert_eq!(parse_priority("bogus"), None);
    }
}
