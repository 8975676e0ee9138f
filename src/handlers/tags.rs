//! Taxonomy introspection (SPEC_FULL §4.4, §6): the grouped L1/L2/L3 vocabulary a
//! client needs to build an advanced-filter UI.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::models::{GroupedTags, TagLevel};
use crate::repo::TagRepo;
use crate::taxonomy::L2_TAG_CATEGORIES;
use crate::utils::ApiResult;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/tags/grouped",
    responses((status = 200, description = "Tags grouped by level and L2 category", body = GroupedTags)),
    tag = "Tags"
)]
pub async fn grouped_tags(State(state): State<Arc<AppState>>) -> ApiResult<Json<GroupedTags>> {
    let repo = TagRepo::new(state.pool.clone());
    let all = repo.list_all().await?;

    let mut l1 = Vec::new();
    let mut l2 = Vec::new();
    let mut l3 = Vec::new();
    let mut categories: HashMap<String, Vec<String>> =
        L2_TAG_CATEGORIES.keys().map(|k| (k.to_string(), Vec::new())).collect();

    for tag in all {
        match tag.level() {
            TagLevel::L1 => l1.push(tag.name.clone()),
            TagLevel::L2 => l2.push(tag.name.clone()),
            TagLevel::L3 => l3.push(tag.name.clone()),
        }

        if let Some(category) = &tag.category {
            categories.entry(category.clone()).or_default().push(tag.name);
        }
    }

    Ok(Json(GroupedTags { l1, l2, l3, categories }))
}
