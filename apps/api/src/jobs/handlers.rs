use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::history::{
    get_match_detail, get_matched_jobs, get_statistics, mark_applied, set_saved, MatchFilters,
};
use crate::models::match_history::{MatchStatistics, MatchedJobDetail, MatchedJobView};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct MatchedJobsQuery {
    pub user_id: Uuid,
    pub saved: Option<bool>,
    pub applied: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

#[derive(Serialize)]
pub struct MatchedJobsResponse {
    pub jobs: Vec<MatchedJobView>,
    pub pagination: Pagination,
}

async fn list_jobs(
    state: &AppState,
    user_id: Uuid,
    filters: MatchFilters,
    page: Option<i64>,
    limit: Option<i64>,
) -> Result<Json<MatchedJobsResponse>, AppError> {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    let (jobs, total) = get_matched_jobs(&state.db, user_id, filters, page, limit).await?;
    Ok(Json(MatchedJobsResponse {
        jobs,
        pagination: Pagination { page, limit, total },
    }))
}

/// GET /api/v1/jobs
pub async fn handle_list_matched_jobs(
    State(state): State<AppState>,
    Query(params): Query<MatchedJobsQuery>,
) -> Result<Json<MatchedJobsResponse>, AppError> {
    let filters = MatchFilters {
        saved: params.saved,
        applied: params.applied,
    };
    list_jobs(&state, params.user_id, filters, params.page, params.limit).await
}

/// GET /api/v1/jobs/saved
pub async fn handle_saved_jobs(
    State(state): State<AppState>,
    Query(params): Query<MatchedJobsQuery>,
) -> Result<Json<MatchedJobsResponse>, AppError> {
    let filters = MatchFilters {
        saved: Some(true),
        applied: None,
    };
    list_jobs(&state, params.user_id, filters, params.page, params.limit).await
}

/// GET /api/v1/jobs/applied
pub async fn handle_applied_jobs(
    State(state): State<AppState>,
    Query(params): Query<MatchedJobsQuery>,
) -> Result<Json<MatchedJobsResponse>, AppError> {
    let filters = MatchFilters {
        saved: None,
        applied: Some(true),
    };
    list_jobs(&state, params.user_id, filters, params.page, params.limit).await
}

/// GET /api/v1/jobs/statistics
pub async fn handle_statistics(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<MatchStatistics>, AppError> {
    let stats = get_statistics(&state.db, params.user_id).await?;
    Ok(Json(stats))
}

/// GET /api/v1/jobs/:id
/// Marks the match viewed on first access.
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<MatchedJobDetail>, AppError> {
    let detail = get_match_detail(&state.db, params.user_id, job_id).await?;
    Ok(Json(detail))
}

/// POST /api/v1/jobs/:id/save
pub async fn handle_save_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Value>, AppError> {
    set_saved(&state.db, params.user_id, job_id, true).await?;
    Ok(Json(json!({ "saved": true })))
}

/// DELETE /api/v1/jobs/:id/save
pub async fn handle_unsave_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Value>, AppError> {
    set_saved(&state.db, params.user_id, job_id, false).await?;
    Ok(Json(json!({ "saved": false })))
}

/// POST /api/v1/jobs/:id/apply
pub async fn handle_mark_applied(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Value>, AppError> {
    mark_applied(&state.db, params.user_id, job_id).await?;
    Ok(Json(json!({ "applied": true })))
}
