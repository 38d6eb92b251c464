pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::jobs::handlers as job_handlers;
use crate::resume::handlers as resume_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/health/ml", get(health::ml_health_handler))
        // Resume API
        .route(
            "/api/v1/resume/process",
            post(resume_handlers::handle_process_resume),
        )
        .route(
            "/api/v1/resume",
            get(resume_handlers::handle_get_parsed_resume)
                .delete(resume_handlers::handle_delete_resume),
        )
        // Jobs API
        .route("/api/v1/jobs", get(job_handlers::handle_list_matched_jobs))
        .route("/api/v1/jobs/saved", get(job_handlers::handle_saved_jobs))
        .route(
            "/api/v1/jobs/applied",
            get(job_handlers::handle_applied_jobs),
        )
        .route(
            "/api/v1/jobs/statistics",
            get(job_handlers::handle_statistics),
        )
        .route("/api/v1/jobs/:id", get(job_handlers::handle_get_job))
        .route(
            "/api/v1/jobs/:id/save",
            post(job_handlers::handle_save_job).delete(job_handlers::handle_unsave_job),
        )
        .route(
            "/api/v1/jobs/:id/apply",
            post(job_handlers::handle_mark_applied),
        )
        .with_state(state)
}
