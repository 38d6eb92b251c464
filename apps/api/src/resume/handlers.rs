use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::resume::pipeline::ProcessResumeResponse;
use crate::resume::profile::{clear_parsed_profile, get_parsed_profile};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ProcessResumeRequest {
    pub user_id: Uuid,
    pub s3_key: String,
}

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Serialize)]
pub struct ParsedResumeResponse {
    pub parsed_data: serde_json::Value,
    pub last_updated: Option<DateTime<Utc>>,
}

/// POST /api/v1/resume/process
/// Best-effort warnings stay invisible to the caller; they are logged here
/// for diagnosis.
pub async fn handle_process_resume(
    State(state): State<AppState>,
    Json(req): Json<ProcessResumeRequest>,
) -> Result<Json<ProcessResumeResponse>, AppError> {
    let report = state.pipeline.process_resume(req.user_id, &req.s3_key).await?;
    for warning in &report.warnings {
        tracing::warn!("Resume processing warning for user {}: {warning}", req.user_id);
    }
    Ok(Json(report.response))
}

/// GET /api/v1/resume
pub async fn handle_get_parsed_resume(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<ParsedResumeResponse>, AppError> {
    let stored = get_parsed_profile(&state.db, params.user_id).await?;
    Ok(Json(ParsedResumeResponse {
        parsed_data: stored.parsed_data,
        last_updated: stored.last_updated,
    }))
}

/// DELETE /api/v1/resume
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    clear_parsed_profile(&state.db, params.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
