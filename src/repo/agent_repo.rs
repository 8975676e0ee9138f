//! Agent run and tag proposal persistence (SPEC_FULL §4.5, §9).

use chrono::Utc;
use sqlx::PgPool;

use crate::models::{AgentRun, ProposalData, TagProposal, TagProposalRow};

#[derive(Clone)]
pub struct AgentRepo {
    pool: PgPool,
}

impl AgentRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn start_run(&self, run_type: &str) -> Result<AgentRun, sqlx::Error> {
        sqlx::query_as::<_, AgentRun>(
            "INSERT INTO agent_runs (run_type, status) VALUES ($1, 'running') RETURNING *",
        )
        .bind(run_type)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn complete_run(
        &self,
        run_id: i64,
        result_data: serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE agent_runs
            SET status = 'completed', completed_at = now(), result_data = $2
            WHERE id = $1
            "#,
        )
        .bind(run_id)
        .bind(result_data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn fail_run(&self, run_id: i64, error_message: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE agent_runs
            SET status = 'failed', completed_at = now(), error_message = $2
            WHERE id = $1
            "#,
        )
        .bind(run_id)
        .bind(error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_run(&self, run_id: i64) -> Result<Option<AgentRun>, sqlx::Error> {
        sqlx::query_as::<_, AgentRun>("SELECT * FROM agent_runs WHERE id = $1")
            .bind(run_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list_runs(&self, limit: i64) -> Result<Vec<AgentRun>, sqlx::Error> {
        sqlx::query_as::<_, AgentRun>("SELECT * FROM agent_runs ORDER BY started_at DESC LIMIT $1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn create_proposal(
        &self,
        agent_run_id: i64,
        data: &ProposalData,
        priority: &str,
        reason: &str,
        affected_stories_count: i32,
    ) -> Result<TagProposal, sqlx::Error> {
        let payload =
            serde_json::to_value(data).expect("ProposalData always serializes");

        let row = sqlx::query_as::<_, TagProposalRow>(
            r#"
            INSERT INTO tag_proposals
                (agent_run_id, proposal_type, status, priority, reason, data, affected_stories_count)
            VALUES ($1, $2, 'pending', $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(agent_run_id)
        .bind(data.proposal_type().as_str())
        .bind(priority)
        .bind(reason)
        .bind(payload)
        .bind(affected_stories_count)
        .fetch_one(&self.pool)
        .await?;

        TagProposal::try_from(row)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))
    }

    pub async fn get_proposal(&self, id: i64) -> Result<Option<TagProposal>, sqlx::Error> {
        let row = sqlx::query_as::<_, TagProposalRow>("SELECT * FROM tag_proposals WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TagProposal::try_from)
            .transpose()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))
    }

    /// Lists proposals, newest first, optionally filtered by `status` and always
    /// capped at `limit`. `status = None` returns proposals of every status.
    pub async fn list_proposals(
        &self,
        status: Option<&str>,
        limit: i64,
    ) -> Result<Vec<TagProposal>, sqlx::Error> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, TagProposalRow>(
                    "SELECT * FROM tag_proposals WHERE status = $1 ORDER BY created_at DESC LIMIT $2",
                )
                .bind(status)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            },
            None => {
                sqlx::query_as::<_, TagProposalRow>(
                    "SELECT * FROM tag_proposals ORDER BY created_at DESC LIMIT $1",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            },
        };

        rows.into_iter()
            .map(TagProposal::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))
    }

    pub async fn set_status(
        &self,
        id: i64,
        status: &str,
        reviewed_by: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE tag_proposals SET status = $2, reviewed_at = now(), reviewed_by = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(reviewed_by)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_executed(&self, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tag_proposals SET status = 'executed', executed_at = $2 WHERE id = $1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
