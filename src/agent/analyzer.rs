//! Taxonomy analyzer: reads tag statistics within a rolling window and surfaces the
//! findings the proposer turns into proposals (SPEC_FULL §4.5).

use chrono::{Duration as ChronoDuration, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::taxonomy::L1_CATEGORIES;
use crate::utils::lcs_ratio;

const DUPLICATE_SIMILARITY_THRESHOLD: f64 = 0.85;
const BLOATED_CATEGORY_THRESHOLD: i64 = 15;
const UNEVEN_HIGH_SHARE: f64 = 0.30;
const UNEVEN_LOW_SHARE: f64 = 0.05;

#[derive(Debug, Clone, Serialize)]
pub struct TagShare {
    pub name: String,
    pub story_count: i64,
    pub share: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BloatedCategory {
    pub category: String,
    pub tag_count: i64,
    pub top_tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SparseTag {
    pub name: String,
    pub usage: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateCandidate {
    pub a: String,
    pub b: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisResult {
    pub window_days: i64,
    pub stories_in_window: i64,
    pub uneven_distribution: Vec<TagShare>,
    pub orphan_stories: i64,
    pub bloated_categories: Vec<BloatedCategory>,
    pub sparse_tags: Vec<SparseTag>,
    pub duplicate_candidates: Vec<DuplicateCandidate>,
}

pub struct Analyzer {
    pool: PgPool,
}

impl Analyzer {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn analyze(&self, window_days: i64, min_tag_usage: i64) -> Result<AnalysisResult, sqlx::Error> {
        let window_start = Utc::now() - ChronoDuration::days(window_days);

        let stories_in_window: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM stories WHERE upstream_created_at >= $1")
                .bind(window_start)
                .fetch_one(&self.pool)
                .await?;
        let stories_in_window = stories_in_window.0;

        let uneven_distribution =
            self.uneven_distribution(window_start, stories_in_window).await?;
        let orphan_stories = self.orphan_stories(window_start).await?;
        let bloated_categories = self.bloated_categories(window_start).await?;
        let sparse_tags = self.sparse_tags(window_start, min_tag_usage).await?;
        let duplicate_candidates = self.duplicate_candidates().await?;

        Ok(AnalysisResult {
            window_days,
            stories_in_window,
            uneven_distribution,
            orphan_stories,
            bloated_categories,
            sparse_tags,
            duplicate_candidates,
        })
    }

    /// L1 tags whose share of windowed stories is > 30% or in (0%, 5%).
    async fn uneven_distribution(
        &self,
        window_start: chrono::DateTime<Utc>,
        stories_in_window: i64,
    ) -> Result<Vec<TagShare>, sqlx::Error> {
        if stories_in_window == 0 {
            return Ok(Vec::new());
        }

        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT t.name, COUNT(DISTINCT st.story_id)
            FROM tags t
            JOIN story_tags st ON st.tag_id = t.id
            JOIN stories s ON s.id = st.story_id
            WHERE t.level = 1 AND s.upstream_created_at >= $1
            GROUP BY t.name
            "#,
        )
        .bind(window_start)
        .fetch_all(&self.pool)
        .await?;

        Ok(L1_CATEGORIES
            .iter()
            .map(|name| {
                let count = rows.iter().find(|(n, _)| n == name).map(|(_, c)| *c).unwrap_or(0);
                (name, count)
            })
            .filter_map(|(name, count)| {
                let share = count as f64 / stories_in_window as f64;
                if share > UNEVEN_HIGH_SHARE || (share > 0.0 && share < UNEVEN_LOW_SHARE) {
                    Some(TagShare { name: name.to_string(), story_count: count, share })
                } else {
                    None
                }
            })
            .collect())
    }

    async fn orphan_stories(&self, window_start: chrono::DateTime<Utc>) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM stories s
            WHERE s.upstream_created_at >= $1
              AND NOT EXISTS (
                  SELECT 1 FROM story_tags st
                  JOIN tags t ON t.id = st.tag_id
                  WHERE st.story_id = s.id AND t.level IN (1, 2)
              )
            "#,
        )
        .bind(window_start)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    /// Over-limit L2 categories, each with its top-10 tags by *windowed* usage — the
    /// same recent-activity count `sparse_tags`/`uneven_distribution` use, not lifetime
    /// `usage_count` (a category bloated by old, now-dormant tags would otherwise
    /// surface those as "top_tags" instead of the ones actually driving current bloat).
    async fn bloated_categories(
        &self,
        window_start: chrono::DateTime<Utc>,
    ) -> Result<Vec<BloatedCategory>, sqlx::Error> {
        let categories: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT category, COUNT(*) FROM tags
            WHERE level = 2 AND category IS NOT NULL
            GROUP BY category
            HAVING COUNT(*) > $1
            "#,
        )
        .bind(BLOATED_CATEGORY_THRESHOLD)
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::with_capacity(categories.len());
        for (category, tag_count) in categories {
            let top_tags: Vec<(String,)> = sqlx::query_as(
                r#"
                SELECT t.name
                FROM tags t
                LEFT JOIN story_tags st ON st.tag_id = t.id
                LEFT JOIN stories s ON s.id = st.story_id AND s.upstream_created_at >= $2
                WHERE t.category = $1
                GROUP BY t.id, t.name
                ORDER BY COUNT(DISTINCT s.id) DESC
                LIMIT 10
                "#,
            )
            .bind(&category)
            .bind(window_start)
            .fetch_all(&self.pool)
            .await?;

            result.push(BloatedCategory {
                category,
                tag_count,
                top_tags: top_tags.into_iter().map(|(n,)| n).collect(),
            });
        }

        Ok(result)
    }

    async fn sparse_tags(
        &self,
        window_start: chrono::DateTime<Utc>,
        min_tag_usage: i64,
    ) -> Result<Vec<SparseTag>, sqlx::Error> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT t.name, COUNT(DISTINCT s.id) AS usage_count
            FROM tags t
            LEFT JOIN story_tags st ON st.tag_id = t.id
            LEFT JOIN stories s ON s.id = st.story_id AND s.upstream_created_at >= $1
            WHERE t.level != 1
            GROUP BY t.id, t.name
            HAVING COUNT(DISTINCT s.id) < $2
            ORDER BY usage_count ASC
            "#,
        )
        .bind(window_start)
        .bind(min_tag_usage)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(name, usage)| SparseTag { name, usage }).collect())
    }

    /// O(n^2) pairwise LCS-similarity scan over non-L1 tags, acceptable at the
    /// taxonomy's expected scale of < 10^3 tags (SPEC_FULL §9).
    async fn duplicate_candidates(&self) -> Result<Vec<DuplicateCandidate>, sqlx::Error> {
        let names: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM tags WHERE level != 1 ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        let names: Vec<String> = names.into_iter().map(|(n,)| n).collect();

        let mut pairs = Vec::new();
        for i in 0..names.len() {
            for j in (i + 1)..names.len() {
                let similarity = lcs_ratio(&names[i], &names[j]);
                if similarity > DUPLICATE_SIMILARITY_THRESHOLD {
                    pairs.push(DuplicateCandidate {
                        a: names[i].clone(),
                        b: names[j].clone(),
                        similarity,
                    });
                }
            }
        }

        pairs.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap());
        Ok(pairs)
    }
}
