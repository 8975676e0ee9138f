//! Summary persistence for the enrichment pipeline (SPEC_FULL §4.3).

use sqlx::PgPool;

use crate::models::Summary;

#[derive(Clone)]
pub struct SummaryRepo {
    pool: PgPool,
}

impl SummaryRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn upsert(&self, story_id: i64, text: &str, model: &str) -> Result<Summary, sqlx::Error> {
        sqlx::query_as::<_, Summary>(
            r#"
            INSERT INTO summaries (story_id, text, model)
            VALUES ($1, $2, $3)
            ON CONFLICT (story_id) DO UPDATE SET
                text = EXCLUDED.text,
                model = EXCLUDED.model,
                created_at = now()
            RETURNING *
            "#,
        )
        .bind(story_id)
        .bind(text)
        .bind(model)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get_for_story(&self, story_id: i64) -> Result<Option<Summary>, sqlx::Error> {
        sqlx::query_as::<_, Summary>("SELECT * FROM summaries WHERE story_id = $1")
            .bind(story_id)
            .fetch_optional(&self.pool)
            .await
    }
}
