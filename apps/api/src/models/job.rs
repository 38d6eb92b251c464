use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A cached posting row in the `jobs` table, unique on
/// `(external_id, source)`. Rows past `expires_at` are swept by the
/// eviction task.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CachedJobRecord {
    pub id: Uuid,
    pub external_id: String,
    pub source: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub snippet: String,
    pub salary: String,
    pub experience_required: String,
    pub link: String,
    pub posted_date: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
