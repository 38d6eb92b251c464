//! Match-history persistence: append-only inserts from the pipeline plus
//! the user-facing flag mutations and aggregate statistics.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::match_history::{
    MatchDetailRow, MatchStatistics, MatchedJobDetail, MatchedJobView, NewMatchRecord,
};

/// Seam for the pipeline: bulk-insert one matching run's records.
#[async_trait]
pub trait MatchHistoryStore: Send + Sync {
    async fn insert_matches(&self, records: &[NewMatchRecord]) -> Result<u64, AppError>;
}

pub struct PgMatchHistoryStore {
    pool: PgPool,
}

impl PgMatchHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MatchHistoryStore for PgMatchHistoryStore {
    /// Append-only: concurrent matching runs insert disjoint rows and cannot
    /// corrupt each other. The batch commits atomically.
    async fn insert_matches(&self, records: &[NewMatchRecord]) -> Result<u64, AppError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO match_history
                    (id, user_id, job_id, semantic_score, skills_score,
                     experience_score, composite_score, match_percentage,
                     matched_skills, ranking_position, viewed, saved, applied,
                     matched_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, FALSE, FALSE, FALSE, now())
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(record.user_id)
            .bind(record.job_id)
            .bind(record.semantic_score)
            .bind(record.skills_score)
            .bind(record.experience_score)
            .bind(record.composite_score)
            .bind(record.match_percentage)
            .bind(&record.matched_skills)
            .bind(record.ranking_position)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(records.len() as u64)
    }
}

/// Optional saved/applied filters for the matched-jobs listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchFilters {
    pub saved: Option<bool>,
    pub applied: Option<bool>,
}

/// Returns one page of a user's matched jobs (best match first) and the
/// total row count for the filter.
pub async fn get_matched_jobs(
    pool: &PgPool,
    user_id: Uuid,
    filters: MatchFilters,
    page: i64,
    limit: i64,
) -> Result<(Vec<MatchedJobView>, i64), AppError> {
    let offset = (page - 1) * limit;

    let jobs = sqlx::query_as::<_, MatchedJobView>(
        r#"
        SELECT j.id AS job_id, j.external_id, j.source, j.title, j.company,
               j.location, j.snippet, j.salary, j.experience_required, j.link,
               j.posted_date, mh.match_percentage, mh.matched_skills,
               mh.ranking_position, mh.viewed, mh.saved, mh.applied, mh.matched_at
        FROM match_history mh
        JOIN jobs j ON j.id = mh.job_id
        WHERE mh.user_id = $1
          AND ($2::boolean IS NULL OR mh.saved = $2)
          AND ($3::boolean IS NULL OR mh.applied = $3)
        ORDER BY mh.match_percentage DESC, mh.matched_at DESC
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(user_id)
    .bind(filters.saved)
    .bind(filters.applied)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM match_history
        WHERE user_id = $1
          AND ($2::boolean IS NULL OR saved = $2)
          AND ($3::boolean IS NULL OR applied = $3)
        "#,
    )
    .bind(user_id)
    .bind(filters.saved)
    .bind(filters.applied)
    .fetch_one(pool)
    .await?;

    Ok((jobs, total))
}

/// Returns the full detail for one matched job, marking it viewed.
/// `viewed_at` is set on the first view only.
pub async fn get_match_detail(
    pool: &PgPool,
    user_id: Uuid,
    job_id: Uuid,
) -> Result<MatchedJobDetail, AppError> {
    let updated = sqlx::query(
        r#"
        UPDATE match_history
        SET viewed = TRUE, viewed_at = COALESCE(viewed_at, now())
        WHERE user_id = $1 AND job_id = $2
        "#,
    )
    .bind(user_id)
    .bind(job_id)
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound(
            "Job not found in your matches".to_string(),
        ));
    }

    let row = sqlx::query_as::<_, MatchDetailRow>(
        r#"
        SELECT j.id AS job_id, j.external_id, j.source, j.title, j.company,
               j.location, j.description, j.salary, j.experience_required,
               j.link, j.posted_date, mh.semantic_score, mh.skills_score,
               mh.experience_score, mh.composite_score, mh.match_percentage,
               mh.matched_skills, mh.ranking_position, mh.viewed, mh.saved,
               mh.applied, mh.matched_at, mh.viewed_at, mh.applied_at
        FROM match_history mh
        JOIN jobs j ON j.id = mh.job_id
        WHERE mh.user_id = $1 AND mh.job_id = $2
        "#,
    )
    .bind(user_id)
    .bind(job_id)
    .fetch_one(pool)
    .await?;

    Ok(row.into())
}

/// Sets or clears the saved flag on one match.
pub async fn set_saved(
    pool: &PgPool,
    user_id: Uuid,
    job_id: Uuid,
    saved: bool,
) -> Result<(), AppError> {
    let updated = sqlx::query(
        "UPDATE match_history SET saved = $3 WHERE user_id = $1 AND job_id = $2",
    )
    .bind(user_id)
    .bind(job_id)
    .bind(saved)
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound(
            "Job not found in your matches".to_string(),
        ));
    }

    info!("User {user_id} {} job {job_id}", if saved { "saved" } else { "unsaved" });
    Ok(())
}

/// Marks one match applied. `applied_at` is set on the first transition only.
pub async fn mark_applied(pool: &PgPool, user_id: Uuid, job_id: Uuid) -> Result<(), AppError> {
    let updated = sqlx::query(
        r#"
        UPDATE match_history
        SET applied = TRUE, applied_at = COALESCE(applied_at, now())
        WHERE user_id = $1 AND job_id = $2
        "#,
    )
    .bind(user_id)
    .bind(job_id)
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound(
            "Job not found in your matches".to_string(),
        ));
    }

    info!("User {user_id} applied to job {job_id}");
    Ok(())
}

/// Aggregate counters for one user. Zero rows yields all-zero statistics.
pub async fn get_statistics(pool: &PgPool, user_id: Uuid) -> Result<MatchStatistics, AppError> {
    let stats = sqlx::query_as::<_, MatchStatistics>(
        r#"
        SELECT COUNT(*) AS total_matches,
               COUNT(*) FILTER (WHERE viewed) AS viewed_count,
               COUNT(*) FILTER (WHERE saved) AS saved_count,
               COUNT(*) FILTER (WHERE applied) AS applied_count,
               COALESCE(AVG(match_percentage), 0.0) AS avg_match_percentage
        FROM match_history
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(stats)
}
