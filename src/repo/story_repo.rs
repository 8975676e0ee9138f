//! Story persistence, including the bulk upsert required by SPEC_FULL §4.2/§9: a single
//! `INSERT ... ON CONFLICT DO UPDATE` over unnested arrays rather than a per-row loop.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::{NewStory, Story};

#[derive(Clone)]
pub struct StoryRepo {
    pool: PgPool,
}

impl StoryRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts all `stories`, updating mutable fields (title, url, score, author,
    /// comment_count) on `upstream_id` conflict. Returns the surrogate ids of the rows
    /// that were newly inserted (as opposed to merely updated).
    pub async fn upsert_many(&self, stories: &[NewStory]) -> Result<Vec<i64>, sqlx::Error> {
        if stories.is_empty() {
            return Ok(Vec::new());
        }

        let upstream_ids: Vec<i64> = stories.iter().map(|s| s.upstream_id).collect();
        let titles: Vec<&str> = stories.iter().map(|s| s.title.as_str()).collect();
        let urls: Vec<Option<&str>> = stories.iter().map(|s| s.url.as_deref()).collect();
        let scores: Vec<i32> = stories.iter().map(|s| s.score).collect();
        let authors: Vec<&str> = stories.iter().map(|s| s.author.as_str()).collect();
        let comment_counts: Vec<i32> = stories.iter().map(|s| s.comment_count).collect();
        let created_ats: Vec<DateTime<Utc>> =
            stories.iter().map(|s| s.upstream_created_at).collect();

        let rows: Vec<(i64, bool)> = sqlx::query_as(
            r#"
            INSERT INTO stories
                (upstream_id, title, url, score, author, comment_count, upstream_created_at)
            SELECT * FROM UNNEST(
                $1::bigint[], $2::text[], $3::text[], $4::int[], $5::text[], $6::int[], $7::timestamptz[]
            )
            ON CONFLICT (upstream_id) DO UPDATE SET
                title = EXCLUDED.title,
                url = EXCLUDED.url,
                score = EXCLUDED.score,
                author = EXCLUDED.author,
                comment_count = EXCLUDED.comment_count,
                updated_at = now()
            RETURNING id, (xmax = 0) AS inserted
            "#,
        )
        .bind(&upstream_ids)
        .bind(&titles)
        .bind(&urls)
        .bind(&scores)
        .bind(&authors)
        .bind(&comment_counts)
        .bind(&created_ats)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().filter(|(_, inserted)| *inserted).map(|(id, _)| id).collect())
    }

    pub async fn get_by_upstream_id(&self, upstream_id: i64) -> Result<Option<Story>, sqlx::Error> {
        sqlx::query_as::<_, Story>("SELECT * FROM stories WHERE upstream_id = $1")
            .bind(upstream_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Story>, sqlx::Error> {
        sqlx::query_as::<_, Story>("SELECT * FROM stories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list_paginated(&self, offset: i64, limit: i64) -> Result<Vec<Story>, sqlx::Error> {
        sqlx::query_as::<_, Story>(
            "SELECT * FROM stories ORDER BY score DESC OFFSET $1 LIMIT $2",
        )
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Stories the enrichment pipeline should pick up: missing a summary or tags,
    /// highest score first (SPEC_FULL §4.3).
    pub async fn select_unenriched(&self, limit: i64) -> Result<Vec<Story>, sqlx::Error> {
        sqlx::query_as::<_, Story>(
            r#"
            SELECT s.* FROM stories s
            WHERE s.is_summarized = false OR s.is_tagged = false
            ORDER BY s.score DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn mark_enriched(&self, story_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE stories SET is_summarized = true, is_tagged = true WHERE id = $1")
            .bind(story_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
