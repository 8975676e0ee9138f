//! `/stories` query surface (SPEC_FULL §4.6, §6): plain pagination, single-story
//! lookup, a manual refresh trigger, and the advanced tag filter.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::filter::{self, TagFilter, DEFAULT_LIMIT, MAX_LIMIT};
use crate::models::StoryResponse;
use crate::repo::StoryRepo;
use crate::scraper::ContinuousJob;
use crate::utils::{ApiError, ApiResult};
use crate::AppState;
use utoipa::ToSchema;

#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

fn validate_pagination(offset: Option<i64>, limit: Option<i64>) -> ApiResult<(i64, i64)> {
    let offset = offset.unwrap_or(0);
    let limit = limit.unwrap_or(DEFAULT_LIMIT);

    if offset < 0 {
        return Err(ApiError::validation_error("offset must be non-negative"));
    }
    if limit < 1 || limit > MAX_LIMIT {
        return Err(ApiError::validation_error(format!("limit must be between 1 and {}", MAX_LIMIT)));
    }

    Ok((offset, limit))
}

#[utoipa::path(
    get,
    path = "/api/v1/stories",
    params(("offset" = Option<i64>, Query), ("limit" = Option<i64>, Query)),
    responses((status = 200, description = "Paginated stories", body = Vec<StoryResponse>)),
    tag = "Stories"
)]
pub async fn list_stories(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Json<Vec<StoryResponse>>> {
    let (offset, limit) = validate_pagination(params.offset, params.limit)?;

    let repo = StoryRepo::new(state.pool.clone());
    let stories = repo.list_paginated(offset, limit).await?;

    Ok(Json(stories.into_iter().map(StoryResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/stories/{id}",
    params(("id" = i64, Path)),
    responses(
        (status = 200, description = "A single story", body = StoryResponse),
        (status = 404, description = "No story with this id")
    ),
    tag = "Stories"
)]
pub async fn get_story(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<StoryResponse>> {
    let repo = StoryRepo::new(state.pool.clone());
    let story = repo.get_by_id(id).await?.ok_or_else(|| ApiError::not_found("story not found"))?;

    Ok(Json(story.into()))
}

#[utoipa::path(
    post,
    path = "/api/v1/stories/refresh",
    responses((status = 202, description = "Refresh triggered")),
    security(("api_key" = [])),
    tag = "Stories"
)]
pub async fn refresh_stories(State(state): State<Arc<AppState>>) -> ApiResult<Json<serde_json::Value>> {
    let stories = StoryRepo::new(state.pool.clone());
    let scraper_state = crate::repo::ScraperStateRepo::new(state.pool.clone());
    let job = ContinuousJob::new(state.hn_client.clone(), stories, scraper_state, &state.config);

    job.run_once().await.map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(Json(serde_json::json!({ "status": "refreshed" })))
}

#[derive(Debug, Deserialize)]
pub struct AdvancedFilterParams {
    pub l1_include: Option<String>,
    pub l1_exclude: Option<String>,
    pub l2_include: Option<String>,
    pub l2_exclude: Option<String>,
    pub l3_include: Option<String>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, serde::Serialize, ToSchema)]
pub struct AdvancedFilterResponse {
    pub stories: Vec<StoryResponse>,
    pub total: i64,
}

/// Malformed JSON in any of the filter parameters is silently treated as empty for
/// that clause, never a 400 (SPEC_FULL §4.6, §6).
#[utoipa::path(
    get,
    path = "/api/stories/advanced-filter.json",
    responses((status = 200, description = "Filtered, paginated stories", body = AdvancedFilterResponse)),
    tag = "Stories"
)]
pub async fn advanced_filter(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AdvancedFilterParams>,
) -> ApiResult<Json<AdvancedFilterResponse>> {
    let (offset, limit) = validate_pagination(params.offset, params.limit)?;

    let filter = TagFilter {
        l1_include: filter::parse_filter_param(params.l1_include.as_deref()),
        l1_exclude: filter::parse_filter_param(params.l1_exclude.as_deref()),
        l2_include: filter::parse_filter_param(params.l2_include.as_deref()),
        l2_exclude: filter::parse_filter_param(params.l2_exclude.as_deref()),
        l3_include: filter::parse_filter_param(params.l3_include.as_deref()),
    };

    let (stories, total) = tokio::try_join!(
        filter::list_stories(&state.pool, &filter, offset, limit),
        filter::count_stories(&state.pool, &filter),
    )?;

    Ok(Json(AdvancedFilterResponse {
        stories: stories.into_iter().map(StoryResponse::from).collect(),
        total,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_limit_above_ceiling() {
        assert!(validate_pagination(Some(0), Some(101)).is_err());
    }

    #[test]
    fn rejects_negative_offset() {
        assert!(validate_pagination(Some(-1), Some(10)).is_err());
    }

    #[test]
    fn defaults_apply_when_absent() {
        let (offset, limit) = validate_pagination(None, None).unwrap();
        assert_eq!(offset, 0);
        assert_eq!(limit, DEFAULT_LIMIT);
    }

    #[test]
    fn accepts_max_limit() {
        assert!(validate_pagination(Some(0), Some(MAX_LIMIT)).is_ok());
    }
}
