//! Taxonomy-maintenance agent surface (SPEC_FULL §4.5, §6): inspect past runs and
//! proposals, review a pending proposal, and trigger a new run. Mounted only outside
//! production.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use crate::agent::{AgentError, Orchestrator, OrchestratorMode, Reorganizer};
use crate::models::{AgentRun, ProposalStatus, TagProposal};
use crate::repo::AgentRepo;
use crate::utils::{ApiError, ApiResult};
use crate::AppState;

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Database(e) => ApiError::from(e),
            AgentError::NotApproved(id) => {
                ApiError::invalid_state(format!("proposal {} is not approved", id))
            },
            AgentError::AlreadyExecuted(id) => {
                ApiError::invalid_state(format!("proposal {} has already been executed", id))
            },
            AgentError::UnknownTag(name) => ApiError::validation_error(format!("unknown tag '{}'", name)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListRunsParams {
    pub limit: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/agent/runs",
    params(("limit" = Option<i64>, Query)),
    responses((status = 200, description = "Recent agent runs, newest first", body = Vec<AgentRun>)),
    tag = "Agent"
)]
pub async fn list_runs(
    State(state): State<Arc<AppState>>,
    axum::extract::Query(params): axum::extract::Query<ListRunsParams>,
) -> ApiResult<Json<Vec<AgentRun>>> {
    let repo = AgentRepo::new(state.pool.clone());
    Ok(Json(repo.list_runs(params.limit.unwrap_or(50)).await?))
}

#[utoipa::path(
    get,
    path = "/api/agent/runs/{id}",
    params(("id" = i64, Path)),
    responses(
        (status = 200, description = "A single agent run", body = AgentRun),
        (status = 404, description = "No run with this id")
    ),
    tag = "Agent"
)]
pub async fn get_run(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<AgentRun>> {
    let repo = AgentRepo::new(state.pool.clone());
    let run = repo.get_run(id).await?.ok_or_else(|| ApiError::not_found("agent run not found"))?;
    Ok(Json(run))
}

#[derive(Debug, Deserialize)]
pub struct ListProposalsParams {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

/// `status` is optional and unfiltered when absent (SPEC_FULL §6:
/// `GET /api/agent/proposals?status=&limit=`), not a "pending"-only default.
#[utoipa::path(
    get,
    path = "/api/agent/proposals",
    params(("status" = Option<String>, Query), ("limit" = Option<i64>, Query)),
    responses((status = 200, description = "Proposals, optionally filtered by status", body = Vec<TagProposal>)),
    tag = "Agent"
)]
pub async fn list_proposals(
    State(state): State<Arc<AppState>>,
    axum::extract::Query(params): axum::extract::Query<ListProposalsParams>,
) -> ApiResult<Json<Vec<TagProposal>>> {
    let repo = AgentRepo::new(state.pool.clone());
    let proposals = repo.list_proposals(params.status.as_deref(), params.limit.unwrap_or(50)).await?;
    Ok(Json(proposals))
}

#[utoipa::path(
    get,
    path = "/api/agent/proposals/{id}",
    params(("id" = i64, Path)),
    responses(
        (status = 200, description = "A single proposal", body = TagProposal),
        (status = 404, description = "No proposal with this id")
    ),
    tag = "Agent"
)]
pub async fn get_proposal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<TagProposal>> {
    let repo = AgentRepo::new(state.pool.clone());
    let proposal =
        repo.get_proposal(id).await?.ok_or_else(|| ApiError::not_found("proposal not found"))?;
    Ok(Json(proposal))
}

fn require_pending(proposal: &TagProposal) -> ApiResult<()> {
    if proposal.status != ProposalStatus::Pending.as_str() {
        return Err(ApiError::validation_error(format!(
            "proposal {} is not pending (status: {})",
            proposal.id, proposal.status
        )));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/agent/proposals/{id}/approve",
    params(("id" = i64, Path)),
    responses(
        (status = 200, description = "Proposal approved", body = TagProposal),
        (status = 400, description = "Proposal is not pending")
    ),
    security(("api_key" = [])),
    tag = "Agent"
)]
pub async fn approve_proposal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<TagProposal>> {
    let repo = AgentRepo::new(state.pool.clone());
    let proposal =
        repo.get_proposal(id).await?.ok_or_else(|| ApiError::not_found("proposal not found"))?;
    require_pending(&proposal)?;

    repo.set_status(id, ProposalStatus::Approved.as_str(), Some("operator")).await?;
    let proposal = repo.get_proposal(id).await?.ok_or_else(|| ApiError::not_found("proposal not found"))?;
    Ok(Json(proposal))
}

#[utoipa::path(
    post,
    path = "/api/agent/proposals/{id}/reject",
    params(("id" = i64, Path)),
    responses(
        (status = 200, description = "Proposal rejected", body = TagProposal),
        (status = 400, description = "Proposal is not pending")
    ),
    security(("api_key" = [])),
    tag = "Agent"
)]
pub async fn reject_proposal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<TagProposal>> {
    let repo = AgentRepo::new(state.pool.clone());
    let proposal =
        repo.get_proposal(id).await?.ok_or_else(|| ApiError::not_found("proposal not found"))?;
    require_pending(&proposal)?;

    repo.set_status(id, ProposalStatus::Rejected.as_str(), Some("operator")).await?;
    let proposal = repo.get_proposal(id).await?.ok_or_else(|| ApiError::not_found("proposal not found"))?;
    Ok(Json(proposal))
}

#[derive(Debug, Deserialize)]
pub struct ExecuteParams {
    #[serde(default)]
    pub dry_run: bool,
}

#[utoipa::path(
    post,
    path = "/api/agent/proposals/{id}/execute",
    params(("id" = i64, Path), ("dry_run" = Option<bool>, Query)),
    responses(
        (status = 200, description = "Proposal executed"),
        (status = 400, description = "Proposal is not approved")
    ),
    security(("api_key" = [])),
    tag = "Agent"
)]
pub async fn execute_proposal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    axum::extract::Query(params): axum::extract::Query<ExecuteParams>,
) -> ApiResult<Json<serde_json::Value>> {
    let agent_repo = AgentRepo::new(state.pool.clone());
    let tags = crate::repo::TagRepo::new(state.pool.clone());

    let proposal =
        agent_repo.get_proposal(id).await?.ok_or_else(|| ApiError::not_found("proposal not found"))?;

    let reorganizer = Reorganizer::new(&agent_repo, &tags);
    let outcome = reorganizer.execute(&proposal, params.dry_run).await?;

    Ok(Json(serde_json::to_value(outcome).expect("ReorganizeOutcome always serializes")))
}

#[derive(Debug, Deserialize)]
pub struct TriggerRunParams {
    #[serde(default)]
    pub mode: TriggerMode,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerMode {
    Analysis,
    #[default]
    Proposal,
    AutoApply,
}

impl From<TriggerMode> for OrchestratorMode {
    fn from(mode: TriggerMode) -> Self {
        match mode {
            TriggerMode::Analysis => OrchestratorMode::Analysis,
            TriggerMode::Proposal => OrchestratorMode::Proposal,
            TriggerMode::AutoApply => OrchestratorMode::AutoApply,
        }
    }
}

/// Runs the orchestrator synchronously and returns the resulting `AgentRun`
/// (SPEC_FULL §6: `POST /api/agent/run?mode=analysis|proposal|auto-apply`).
#[utoipa::path(
    post,
    path = "/api/agent/run",
    params(("mode" = Option<String>, Query)),
    responses((status = 200, description = "The completed agent run", body = AgentRun)),
    security(("api_key" = [])),
    tag = "Agent"
)]
pub async fn trigger_run(
    State(state): State<Arc<AppState>>,
    axum::extract::Query(params): axum::extract::Query<TriggerRunParams>,
) -> ApiResult<Json<AgentRun>> {
    let analyzer = crate::agent::Analyzer::new(state.pool.clone());
    let agent_repo = AgentRepo::new(state.pool.clone());
    let tags = crate::repo::TagRepo::new(state.pool.clone());

    let orchestrator = Orchestrator::new(analyzer, agent_repo, tags, state.oracle.clone(), &state.config);
    let (run, _proposals) = orchestrator.run(params.mode.into()).await?;

    Ok(Json(run))
}
