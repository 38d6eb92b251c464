use std::sync::Arc;

use sqlx::PgPool;

use crate::ml_client::MlClient;
use crate::resume::pipeline::ResumePipeline;

/// Shared application state injected into all route handlers via Axum
/// extractors. The pipeline carries its collaborators as `Arc<dyn Trait>`
/// so tests substitute doubles without process-wide state.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub ml: MlClient,
    pub pipeline: Arc<ResumePipeline>,
}
