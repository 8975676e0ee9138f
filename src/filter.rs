//! Multi-level tag include/exclude query engine (SPEC_FULL §4.6).

use sqlx::postgres::Postgres;
use sqlx::{PgPool, QueryBuilder};

use crate::models::Story;

pub const MAX_LIMIT: i64 = 100;
pub const DEFAULT_LIMIT: i64 = 30;

#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    pub l1_include: Vec<String>,
    pub l1_exclude: Vec<String>,
    pub l2_include: Vec<String>,
    pub l2_exclude: Vec<String>,
    pub l3_include: Vec<String>,
}

impl TagFilter {
    pub fn is_empty(&self) -> bool {
        self.l1_include.is_empty()
            && self.l1_exclude.is_empty()
            && self.l2_include.is_empty()
            && self.l2_exclude.is_empty()
            && self.l3_include.is_empty()
    }
}

/// Parses a query-string parameter expected to be a JSON-encoded array of strings.
/// Anything that fails to parse, or parses to a non-array value, is silently treated
/// as the empty filter for that clause (never a 400) — mirrors the original view
/// layer's "silently returns `[]` on malformed input" behavior (SPEC_FULL §4.6).
pub fn parse_filter_param(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else { return Vec::new() };

    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn push_predicate(builder: &mut QueryBuilder<'_, Postgres>, level: i16, names: &[String], include: bool) {
    if names.is_empty() {
        return;
    }

    builder.push(" AND ");
    if !include {
        builder.push("NOT ");
    }
    builder.push("EXISTS (SELECT 1 FROM story_tags st JOIN tags t ON t.id = st.tag_id WHERE st.story_id = s.id AND t.level = ");
    builder.push_bind(level);
    builder.push(" AND t.name = ANY(");
    builder.push_bind(names.to_vec());
    builder.push("))");
}

fn build_where(builder: &mut QueryBuilder<'_, Postgres>, filter: &TagFilter) {
    push_predicate(builder, 1, &filter.l1_include, true);
    push_predicate(builder, 1, &filter.l1_exclude, false);
    push_predicate(builder, 2, &filter.l2_include, true);
    push_predicate(builder, 2, &filter.l2_exclude, false);
    push_predicate(builder, 3, &filter.l3_include, true);
}

pub async fn list_stories(
    pool: &PgPool,
    filter: &TagFilter,
    offset: i64,
    limit: i64,
) -> Result<Vec<Story>, sqlx::Error> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT s.* FROM stories s WHERE 1=1");

    build_where(&mut builder, filter);

    builder.push(" ORDER BY s.score DESC OFFSET ");
    builder.push_bind(offset);
    builder.push(" LIMIT ");
    builder.push_bind(limit.min(MAX_LIMIT));

    builder.build_query_as::<Story>().fetch_all(pool).await
}

pub async fn count_stories(pool: &PgPool, filter: &TagFilter) -> Result<i64, sqlx::Error> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM stories s WHERE 1=1");

    build_where(&mut builder, filter);

    let row: (i64,) = builder.build_query_as().fetch_one(pool).await?;
    Ok(row.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_has_no_clauses() {
        assert!(TagFilter::default().is_empty());
    }

    #[test]
    fn malformed_json_parses_to_empty() {
        assert!(parse_filter_param(Some("not json")).is_empty());
    }

    #[test]
    fn non_array_json_parses_to_empty() {
        assert!(parse_filter_param(Some("{\"a\":1}")).is_empty());
        assert!(parse_filter_param(Some("\"just a string\"")).is_empty());
    }

    #[test]
    fn valid_array_parses() {
        let parsed = parse_filter_param(Some(r#"["Tech", "Business"]"#));
        assert_eq!(parsed, vec!["Tech".to_string(), "Business".to_string()]);
    }

    #[test]
    fn missing_param_parses_to_empty() {
        assert!(parse_filter_param(None).is_empty());
    }
}
