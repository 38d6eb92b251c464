use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Component scores for one match, each in [0, 1].
/// `composite_score` always equals `match_percentage / 100`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchScoreSet {
    pub semantic_score: f64,
    pub skills_score: f64,
    pub experience_score: f64,
    pub composite_score: f64,
}

/// Insert payload for one match-history row. History is append-only: the
/// pipeline only ever inserts, never updates.
#[derive(Debug, Clone)]
pub struct NewMatchRecord {
    pub user_id: Uuid,
    pub job_id: Uuid,
    pub semantic_score: f64,
    pub skills_score: f64,
    pub experience_score: f64,
    pub composite_score: f64,
    pub match_percentage: f64,
    pub matched_skills: Vec<String>,
    /// 1-based rank in the order returned by the matching service.
    pub ranking_position: i32,
}

/// One row of the matched-jobs listing: cached job fields joined with the
/// user's match record.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MatchedJobView {
    pub job_id: Uuid,
    pub external_id: String,
    pub source: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub snippet: String,
    pub salary: String,
    pub experience_required: String,
    pub link: String,
    pub posted_date: DateTime<Utc>,
    pub match_percentage: f64,
    pub matched_skills: Vec<String>,
    pub ranking_position: i32,
    pub viewed: bool,
    pub saved: bool,
    pub applied: bool,
    pub matched_at: DateTime<Utc>,
}

/// Flat detail row as selected from the join; reshaped into
/// [`MatchedJobDetail`] for responses.
#[derive(Debug, Clone, FromRow)]
pub struct MatchDetailRow {
    pub job_id: Uuid,
    pub external_id: String,
    pub source: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub salary: String,
    pub experience_required: String,
    pub link: String,
    pub posted_date: DateTime<Utc>,
    pub semantic_score: f64,
    pub skills_score: f64,
    pub experience_score: f64,
    pub composite_score: f64,
    pub match_percentage: f64,
    pub matched_skills: Vec<String>,
    pub ranking_position: i32,
    pub viewed: bool,
    pub saved: bool,
    pub applied: bool,
    pub matched_at: DateTime<Utc>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub applied_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchedJobDetail {
    pub job_id: Uuid,
    pub external_id: String,
    pub source: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub salary: String,
    pub experience_required: String,
    pub link: String,
    pub posted_date: DateTime<Utc>,
    pub match_percentage: f64,
    pub match_scores: MatchScoreSet,
    pub matched_skills: Vec<String>,
    pub ranking_position: i32,
    pub viewed: bool,
    pub saved: bool,
    pub applied: bool,
    pub matched_at: DateTime<Utc>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub applied_at: Option<DateTime<Utc>>,
}

impl From<MatchDetailRow> for MatchedJobDetail {
    fn from(row: MatchDetailRow) -> Self {
        MatchedJobDetail {
            job_id: row.job_id,
            external_id: row.external_id,
            source: row.source,
            title: row.title,
            company: row.company,
            location: row.location,
            description: row.description,
            salary: row.salary,
            experience_required: row.experience_required,
            link: row.link,
            posted_date: row.posted_date,
            match_percentage: row.match_percentage,
            match_scores: MatchScoreSet {
                semantic_score: row.semantic_score,
                skills_score: row.skills_score,
                experience_score: row.experience_score,
                composite_score: row.composite_score,
            },
            matched_skills: row.matched_skills,
            ranking_position: row.ranking_position,
            viewed: row.viewed,
            saved: row.saved,
            applied: row.applied,
            matched_at: row.matched_at,
            viewed_at: row.viewed_at,
            applied_at: row.applied_at,
        }
    }
}

/// Aggregate counters over a user's match history. The zero-record case is
/// all zeros, not an error.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MatchStatistics {
    pub total_matches: i64,
    pub viewed_count: i64,
    pub saved_count: i64,
    pub applied_count: i64,
    pub avg_match_percentage: f64,
}
