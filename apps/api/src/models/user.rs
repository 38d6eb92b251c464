#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    /// Parsed resume profile; NULL until a resume has been processed.
    pub resume_parsed: Option<Value>,
    pub resume_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
