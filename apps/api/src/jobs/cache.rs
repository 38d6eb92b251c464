//! Idempotent posting cache keyed by (external_id, source).

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::CachedJobRecord;
use crate::providers::CanonicalJobPosting;

/// Cached postings live for 7 days. Expired rows are removed by the
/// periodic eviction sweep, never by the pipeline.
pub const CACHE_TTL_DAYS: i64 = 7;

/// Seam for the pipeline: create-or-refresh one posting.
#[async_trait]
pub trait JobCache: Send + Sync {
    async fn upsert(&self, posting: &CanonicalJobPosting) -> Result<CachedJobRecord, AppError>;
}

pub struct PgJobCache {
    pool: PgPool,
}

impl PgJobCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobCache for PgJobCache {
    /// Single-statement upsert: concurrent writers racing on the same
    /// (external_id, source) key refresh the one row instead of
    /// duplicating it. A refresh resets `fetched_at` and `expires_at`.
    async fn upsert(&self, posting: &CanonicalJobPosting) -> Result<CachedJobRecord, AppError> {
        let fetched_at = Utc::now();
        let expires_at = fetched_at + Duration::days(CACHE_TTL_DAYS);

        let record = sqlx::query_as::<_, CachedJobRecord>(
            r#"
            INSERT INTO jobs
                (id, external_id, source, title, company, location, description,
                 snippet, salary, experience_required, link, posted_date,
                 fetched_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (external_id, source) DO UPDATE SET
                title = EXCLUDED.title,
                company = EXCLUDED.company,
                location = EXCLUDED.location,
                description = EXCLUDED.description,
                snippet = EXCLUDED.snippet,
                salary = EXCLUDED.salary,
                experience_required = EXCLUDED.experience_required,
                link = EXCLUDED.link,
                posted_date = EXCLUDED.posted_date,
                fetched_at = EXCLUDED.fetched_at,
                expires_at = EXCLUDED.expires_at
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&posting.external_id)
        .bind(&posting.source)
        .bind(&posting.title)
        .bind(&posting.company)
        .bind(&posting.location)
        .bind(&posting.description)
        .bind(&posting.snippet)
        .bind(&posting.salary)
        .bind(&posting.experience_required)
        .bind(&posting.link)
        .bind(posting.posted_date)
        .bind(fetched_at)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }
}

/// Deletes cache rows whose `expires_at` has elapsed. Returns the number of
/// rows removed.
pub async fn evict_expired(pool: &PgPool) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM jobs WHERE expires_at <= now()")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
