//! Scraper state persistence, including the advisory-lock-protected get-or-create used to
//! race-safely initialize the `continuous` row (SPEC_FULL §4.2, §5, §9).

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::ScraperState;

/// Chunk size for `get_existing_ids`'s `= ANY($1)` batches, keeping IN-clause costs bounded
/// for very large backfill windows (SPEC_FULL §4.2, §8 "Chunking correctness").
const ID_CHUNK_SIZE: usize = 1000;

/// Stable (non-cryptographic) hash used to derive the `pg_advisory_xact_lock` key from
/// `"scraper_state_<type>"`, mirroring the original `hash(...) % 2147483647` scheme without
/// depending on Python's per-process hash randomization.
fn advisory_lock_key(state_type: &str) -> i64 {
    let input = format!("scraper_state_{state_type}");
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in input.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    (hash % 2_147_483_647) as i64
}

#[derive(Clone)]
pub struct ScraperStateRepo {
    pool: PgPool,
}

impl ScraperStateRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_state(&self, state_type: &str) -> Result<Option<ScraperState>, sqlx::Error> {
        sqlx::query_as::<_, ScraperState>("SELECT * FROM scraper_state WHERE state_type = $1")
            .bind(state_type)
            .fetch_optional(&self.pool)
            .await
    }

    /// Acquires a transaction-scoped advisory lock keyed by `state_type`, re-checks for an
    /// existing row, and creates one only if still absent. Returns `(state, created)`.
    pub async fn get_or_create_state_with_lock(
        &self,
        state_type: &str,
        initial_item_id: i64,
        target_timestamp: Option<DateTime<Utc>>,
    ) -> Result<(ScraperState, bool), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(advisory_lock_key(state_type))
            .execute(&mut *tx)
            .await?;

        if let Some(existing) =
            sqlx::query_as::<_, ScraperState>("SELECT * FROM scraper_state WHERE state_type = $1")
                .bind(state_type)
                .fetch_optional(&mut *tx)
                .await?
        {
            tx.commit().await?;
            return Ok((existing, false));
        }

        let created = sqlx::query_as::<_, ScraperState>(
            r#"
            INSERT INTO scraper_state (state_type, current_item_id, target_timestamp, status)
            VALUES ($1, $2, $3, 'active')
            RETURNING *
            "#,
        )
        .bind(state_type)
        .bind(initial_item_id)
        .bind(target_timestamp)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((created, true))
    }

    pub async fn update_progress(
        &self,
        state_type: &str,
        current_item_id: i64,
        status: &str,
        items_delta: i64,
        stories_delta: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE scraper_state
            SET current_item_id = $2,
                status = $3,
                items_processed = items_processed + $4,
                stories_found = stories_found + $5,
                last_run_at = now()
            WHERE state_type = $1
            "#,
        )
        .bind(state_type)
        .bind(current_item_id)
        .bind(status)
        .bind(items_delta)
        .bind(stories_delta)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Returns the subset of `ids` already present as `stories.upstream_id`, chunked to
    /// keep each query's parameter list bounded.
    pub async fn get_existing_ids(&self, ids: &[i64]) -> Result<std::collections::HashSet<i64>, sqlx::Error> {
        let mut existing = std::collections::HashSet::new();
        for chunk in ids.chunks(ID_CHUNK_SIZE) {
            let rows: Vec<(i64,)> =
                sqlx::query_as("SELECT upstream_id FROM stories WHERE upstream_id = ANY($1)")
                    .bind(chunk)
                    .fetch_all(&self.pool)
                    .await?;
            existing.extend(rows.into_iter().map(|(id,)| id));
        }
        Ok(existing)
    }

    pub async fn get_max_upstream_id(&self) -> Result<Option<i64>, sqlx::Error> {
        let row: (Option<i64>,) = sqlx::query_as("SELECT MAX(upstream_id) FROM stories")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    pub async fn get_story_count(&self) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM stories").fetch_one(&self.pool).await?;
        Ok(row.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_key_is_consistent_for_same_state_type() {
        assert_eq!(advisory_lock_key("continuous"), advisory_lock_key("continuous"));
    }

    #[test]
    fn different_state_types_get_different_keys() {
        assert_ne!(advisory_lock_key("continuous"), advisory_lock_key("backfill"));
    }

    #[test]
    fn lock_key_fits_postgres_bigint_range() {
        assert!(advisory_lock_key("continuous") >= 0);
        assert!(advisory_lock_key("backfill") < 2_147_483_647);
    }
}
