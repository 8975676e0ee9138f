use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRunType {
    Analysis,
    Proposal,
    AutoApply,
    Execution,
}

impl AgentRunType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::Proposal => "proposal",
            Self::AutoApply => "auto-apply",
            Self::Execution => "execution",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRunStatus {
    Running,
    Completed,
    Failed,
}

impl AgentRunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct AgentRun {
    pub id: i64,
    pub run_type: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub result_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalType {
    CreateTag,
    MergeTags,
    RetireTag,
    ReviewCategory,
}

impl ProposalType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateTag => "create_tag",
            Self::MergeTags => "merge_tags",
            Self::RetireTag => "retire_tag",
            Self::ReviewCategory => "review_category",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create_tag" => Some(Self::CreateTag),
            "merge_tags" => Some(Self::MergeTags),
            "retire_tag" => Some(Self::RetireTag),
            "review_category" => Some(Self::ReviewCategory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalPriority {
    High,
    Medium,
    Low,
}

impl ProposalPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Approved,
    Rejected,
    Executed,
}

impl ProposalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Executed => "executed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "executed" => Some(Self::Executed),
            _ => None,
        }
    }
}

/// The sum type behind `tag_proposals.data` (SPEC_FULL §9: "dynamic proposal payloads
/// are a sum type in disguise"). `#[serde(tag = "proposal_type")]` makes the JSONB
/// column self-describing and lets callers deserialize without consulting the sibling
/// `proposal_type` column.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "proposal_type", rename_all = "snake_case")]
pub enum ProposalData {
    MergeTags { sources: Vec<String>, target: String },
    CreateTag { name: String, category: Option<String> },
    RetireTag { name: String, replacement: Option<String> },
    ReviewCategory { category: String, tag_count: i64, tags: Vec<String> },
}

impl ProposalData {
    pub fn proposal_type(&self) -> ProposalType {
        match self {
            Self::MergeTags { .. } => ProposalType::MergeTags,
            Self::CreateTag { .. } => ProposalType::CreateTag,
            Self::RetireTag { .. } => ProposalType::RetireTag,
            Self::ReviewCategory { .. } => ProposalType::ReviewCategory,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TagProposalRow {
    pub id: i64,
    pub agent_run_id: i64,
    pub proposal_type: String,
    pub status: String,
    pub priority: String,
    pub reason: String,
    pub data: serde_json::Value,
    pub affected_stories_count: i32,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub executed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TagProposal {
    pub id: i64,
    pub agent_run_id: i64,
    pub proposal_type: String,
    pub status: String,
    pub priority: String,
    pub reason: String,
    pub data: ProposalData,
    pub affected_stories_count: i32,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub executed_at: Option<DateTime<Utc>>,
}

impl TryFrom<TagProposalRow> for TagProposal {
    type Error = serde_json::Error;

    fn try_from(row: TagProposalRow) -> Result<Self, Self::Error> {
        let data: ProposalData = serde_json::from_value(row.data)?;
        Ok(Self {
            id: row.id,
            agent_run_id: row.agent_run_id,
            proposal_type: row.proposal_type,
            status: row.status,
            priority: row.priority,
            reason: row.reason,
            data,
            affected_stories_count: row.affected_stories_count,
            created_at: row.created_at,
            reviewed_at: row.reviewed_at,
            reviewed_by: row.reviewed_by,
            executed_at: row.executed_at,
        })
    }
}

/// `is_low_risk` per SPEC_FULL §4.5 / §8 ("Auto-approval policy").
pub fn is_low_risk(proposal_type: ProposalType, affected: i32, priority: ProposalPriority, max_affected: i32) -> bool {
    matches!(proposal_type, ProposalType::MergeTags | ProposalType::RetireTag)
        && affected <= max_affected
        && matches!(priority, ProposalPriority::Low | ProposalPriority::Medium)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_risk_requires_type_affected_and_priority() {
        assert!(is_low_risk(ProposalType::MergeTags, 5, ProposalPriority::Low, 5));
        assert!(is_low_risk(ProposalType::RetireTag, 5, ProposalPriority::Medium, 5));
        assert!(!is_low_risk(ProposalType::MergeTags, 6, ProposalPriority::Low, 5));
        assert!(!is_low_risk(ProposalType::MergeTags, 5, ProposalPriority::High, 5));
        assert!(!is_low_risk(ProposalType::CreateTag, 1, ProposalPriority::Low, 5));
        assert!(!is_low_risk(ProposalType::ReviewCategory, 1, ProposalPriority::Low, 5));
    }
}
