//! Reorganizer: executes one approved proposal against the tag store (SPEC_FULL §4.5).
//!
//! This is the only actor permitted to delete or re-point Tags (SPEC_FULL §3), and it
//! only does so while executing an approved proposal.

use serde::Serialize;

use crate::models::{ProposalData, ProposalStatus, TagProposal};
use crate::repo::{AgentRepo, TagRepo};
use crate::taxonomy::category_for;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("proposal {0} is not approved")]
    NotApproved(i64),

    #[error("proposal {0} has already been executed")]
    AlreadyExecuted(i64),

    #[error("proposal references unknown tag '{0}'")]
    UnknownTag(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ReorganizeOutcome {
    pub proposal_id: i64,
    pub affected_stories_count: i64,
    pub dry_run: bool,
}

pub struct Reorganizer<'a> {
    agent_repo: &'a AgentRepo,
    tags: &'a TagRepo,
}

impl<'a> Reorganizer<'a> {
    pub fn new(agent_repo: &'a AgentRepo, tags: &'a TagRepo) -> Self {
        Self { agent_repo, tags }
    }

    /// Executes `proposal`. Re-executing an already-`executed` proposal is a
    /// programmer error (SPEC_FULL §4.5) and raises rather than silently no-opping.
    pub async fn execute(
        &self,
        proposal: &TagProposal,
        dry_run: bool,
    ) -> Result<ReorganizeOutcome, AgentError> {
        let status = ProposalStatus::parse(&proposal.status)
            .ok_or_else(|| AgentError::NotApproved(proposal.id))?;

        match status {
            ProposalStatus::Executed => return Err(AgentError::AlreadyExecuted(proposal.id)),
            ProposalStatus::Approved => {},
            _ => return Err(AgentError::NotApproved(proposal.id)),
        }

        let affected = match &proposal.data {
            ProposalData::MergeTags { sources, target } => {
                self.merge_tags(sources, target, dry_run).await?
            },
            ProposalData::CreateTag { name, category } => {
                self.create_tag(name, category.as_deref(), dry_run).await?
            },
            ProposalData::RetireTag { name, replacement } => {
                self.retire_tag(name, replacement.as_deref(), dry_run).await?
            },
            ProposalData::ReviewCategory { tag_count, .. } => *tag_count,
        };

        if !dry_run {
            self.agent_repo.mark_executed(proposal.id).await?;
        }

        Ok(ReorganizeOutcome { proposal_id: proposal.id, affected_stories_count: affected, dry_run })
    }

    async fn merge_tags(&self, sources: &[String], target: &str, dry_run: bool) -> Result<i64, AgentError> {
        let target_tag = self
            .tags
            .get_by_slug(&crate::taxonomy::normalize_slug(target))
            .await?
            .ok_or_else(|| AgentError::UnknownTag(target.to_string()))?;

        let mut affected = 0i64;
        let mut source_ids = Vec::with_capacity(sources.len());
        for source in sources {
            let source_tag = self
                .tags
                .get_by_slug(&crate::taxonomy::normalize_slug(source))
                .await?
                .ok_or_else(|| AgentError::UnknownTag(source.clone()))?;
            affected += self.tags.story_count_for_tag(source_tag.id).await?;
            source_ids.push(source_tag.id);
        }

        if dry_run {
            return Ok(affected);
        }

        for source_id in source_ids {
            self.tags.repoint_and_retire(source_id, target_tag.id).await?;
        }

        Ok(affected)
    }

    async fn create_tag(&self, name: &str, category: Option<&str>, dry_run: bool) -> Result<i64, AgentError> {
        let slug = crate::taxonomy::normalize_slug(name);
        if self.tags.get_by_slug(&slug).await?.is_some() {
            return Ok(0);
        }

        if dry_run {
            return Ok(0);
        }

        let category = category.or_else(|| category_for(name));
        self.tags.create(name, &slug, 2, category, false).await?;
        Ok(0)
    }

    async fn retire_tag(
        &self,
        name: &str,
        replacement: Option<&str>,
        dry_run: bool,
    ) -> Result<i64, AgentError> {
        let tag = self
            .tags
            .get_by_slug(&crate::taxonomy::normalize_slug(name))
            .await?
            .ok_or_else(|| AgentError::UnknownTag(name.to_string()))?;
        let affected = self.tags.story_count_for_tag(tag.id).await?;

        if dry_run {
            return Ok(affected);
        }

        match replacement {
            Some(replacement_name) => {
                let replacement_tag = self
                    .tags
                    .get_by_slug(&crate::taxonomy::normalize_slug(replacement_name))
                    .await?
                    .ok_or_else(|| AgentError::UnknownTag(replacement_name.to_string()))?;
                self.tags.repoint_and_retire(tag.id, replacement_tag.id).await?;
            },
            None => {
                self.tags.delete(tag.id).await?;
            },
        }

        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tag_error_names_the_tag() {
        let err = AgentError::UnknownTag("ghost".to_string());
        assert!(err.to_string().contains("ghost"));
    }
}
