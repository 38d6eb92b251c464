//! Parsed-profile persistence on the user row. Every write is an explicit
//! wholesale overwrite of the `resume_parsed` column, never a partial merge.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::ml_client::ParsedResumeProfile;

/// Seam for the pipeline: overwrite the user's parsed profile.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn store_parsed(
        &self,
        user_id: Uuid,
        profile: &ParsedResumeProfile,
    ) -> Result<(), AppError>;
}

pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn store_parsed(
        &self,
        user_id: Uuid,
        profile: &ParsedResumeProfile,
    ) -> Result<(), AppError> {
        store_parsed_profile(&self.pool, user_id, profile).await
    }
}

pub async fn store_parsed_profile(
    pool: &PgPool,
    user_id: Uuid,
    profile: &ParsedResumeProfile,
) -> Result<(), AppError> {
    let data = serde_json::to_value(profile)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize profile: {e}")))?;

    let updated = sqlx::query(
        "UPDATE users SET resume_parsed = $1, resume_updated_at = now() WHERE id = $2",
    )
    .bind(data)
    .bind(user_id)
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    Ok(())
}

pub struct StoredResume {
    pub parsed_data: serde_json::Value,
    pub last_updated: Option<DateTime<Utc>>,
}

pub async fn get_parsed_profile(pool: &PgPool, user_id: Uuid) -> Result<StoredResume, AppError> {
    let row: Option<(Option<serde_json::Value>, Option<DateTime<Utc>>)> =
        sqlx::query_as("SELECT resume_parsed, resume_updated_at FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    let (parsed, last_updated) =
        row.ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let parsed_data = parsed.ok_or_else(|| {
        AppError::NotFound("No resume data found. Please upload a resume first.".to_string())
    })?;

    Ok(StoredResume {
        parsed_data,
        last_updated,
    })
}

pub async fn clear_parsed_profile(pool: &PgPool, user_id: Uuid) -> Result<(), AppError> {
    let updated = sqlx::query(
        "UPDATE users SET resume_parsed = NULL, resume_updated_at = NULL WHERE id = $1",
    )
    .bind(user_id)
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    info!("Deleted resume data for user {user_id}");
    Ok(())
}
