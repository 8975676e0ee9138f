//! Tag persistence: lookup/creation for the taxonomy service and the mutations the
//! reorganizer applies when executing merge/create/retire proposals (SPEC_FULL §4.4, §4.5).

use sqlx::PgPool;

use crate::models::Tag;

#[derive(Clone)]
pub struct TagRepo {
    pool: PgPool,
}

impl TagRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>, sqlx::Error> {
        sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Tag>, sqlx::Error> {
        sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn create(
        &self,
        name: &str,
        slug: &str,
        level: i16,
        category: Option<&str>,
        is_misc: bool,
    ) -> Result<Tag, sqlx::Error> {
        sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (name, slug, level, category, is_misc)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(slug)
        .bind(level)
        .bind(category)
        .bind(is_misc)
        .fetch_one(&self.pool)
        .await
    }

    /// Attaches `tag_id` to `story_id`, incrementing usage on first attachment and
    /// marking the story tagged. Idempotent: re-attaching an existing pair is a no-op.
    pub async fn attach_to_story(&self, story_id: i64, tag_id: i64) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO story_tags (story_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(story_id)
        .bind(tag_id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if inserted {
            sqlx::query("UPDATE tags SET usage_count = usage_count + 1 WHERE id = $1")
                .bind(tag_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn list_by_level(&self, level: i16) -> Result<Vec<Tag>, sqlx::Error> {
        sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE level = $1 ORDER BY name")
            .bind(level)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn list_by_category(&self, category: &str) -> Result<Vec<Tag>, sqlx::Error> {
        sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE category = $1 ORDER BY name")
            .bind(category)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn list_all(&self) -> Result<Vec<Tag>, sqlx::Error> {
        sqlx::query_as::<_, Tag>("SELECT * FROM tags ORDER BY level, name").fetch_all(&self.pool).await
    }

    /// Windowed story count for a tag by name, used by the proposer to size merge
    /// proposals' `affected_stories_count` (the "loser's window count", SPEC_FULL §4.5).
    pub async fn usage_in_window(
        &self,
        name: &str,
        window_start: chrono::DateTime<chrono::Utc>,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(DISTINCT st.story_id)
            FROM tags t
            JOIN story_tags st ON st.tag_id = t.id
            JOIN stories s ON s.id = st.story_id
            WHERE t.name = $1 AND s.upstream_created_at >= $2
            "#,
        )
        .bind(name)
        .bind(window_start)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    /// Counts distinct stories tagged with `tag_id` (used by the analyzer to detect
    /// orphan/sparse tags and by review_category proposals).
    pub async fn story_count_for_tag(&self, tag_id: i64) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM story_tags WHERE tag_id = $1")
            .bind(tag_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    /// Re-points every `story_tags` row from `from_tag_id` to `to_tag_id`, skipping
    /// rows that would collide with an existing `(story_id, to_tag_id)` pair, then
    /// deletes `from_tag_id`. This is the "delete duplicates, then update" dance
    /// merges and retirements both need (SPEC_FULL §4.5, §9).
    pub async fn repoint_and_retire(&self, from_tag_id: i64, to_tag_id: i64) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM story_tags
            WHERE tag_id = $1
              AND story_id IN (SELECT story_id FROM story_tags WHERE tag_id = $2)
            "#,
        )
        .bind(from_tag_id)
        .bind(to_tag_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE story_tags SET tag_id = $2 WHERE tag_id = $1")
            .bind(from_tag_id)
            .bind(to_tag_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM tags WHERE id = $1").bind(from_tag_id).execute(&mut *tx).await?;

        sqlx::query(
            "UPDATE tags SET usage_count = (SELECT COUNT(*) FROM story_tags WHERE tag_id = $1) WHERE id = $1",
        )
        .bind(to_tag_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Deletes a tag outright with no replacement (retire with no successor).
    pub async fn delete(&self, tag_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM tags WHERE id = $1").bind(tag_id).execute(&self.pool).await?;
        Ok(())
    }
}
