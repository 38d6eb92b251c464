mod assets;
mod config;
mod db;
mod errors;
mod jobs;
mod ml_client;
mod models;
mod providers;
mod resume;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::assets::S3AssetStore;
use crate::config::Config;
use crate::db::create_pool;
use crate::jobs::cache::{evict_expired, PgJobCache};
use crate::jobs::history::PgMatchHistoryStore;
use crate::ml_client::MlClient;
use crate::providers::chain::ProviderChain;
use crate::providers::jooble::JoobleProvider;
use crate::providers::theirstack::TheirStackProvider;
use crate::resume::pipeline::ResumePipeline;
use crate::resume::profile::PgProfileStore;
use crate::routes::build_router;
use crate::state::AppState;

const CACHE_EVICTION_INTERVAL_SECS: u64 = 3600;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobMatch API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    // Initialize ML client
    let ml = MlClient::new(
        config.ml_service_url.clone(),
        Duration::from_secs(config.ml_service_timeout_secs),
    );
    info!("ML client initialized ({})", config.ml_service_url);

    // Provider chain: Jooble first, TheirStack as fallback
    let http = reqwest::Client::new();
    let chain = ProviderChain::new(vec![
        Arc::new(JoobleProvider::new(
            http.clone(),
            config.jooble_api_key.clone(),
        )),
        Arc::new(TheirStackProvider::new(
            http,
            config.theirstack_api_key.clone(),
            config.theirstack_api_url.clone(),
        )),
    ]);

    // Build the pipeline from its injected collaborators
    let pipeline = Arc::new(ResumePipeline::new(
        Arc::new(ml.clone()),
        Arc::new(chain),
        Arc::new(PgJobCache::new(db.clone())),
        Arc::new(PgMatchHistoryStore::new(db.clone())),
        Arc::new(PgProfileStore::new(db.clone())),
        Arc::new(S3AssetStore::new(s3, config.s3_bucket.clone())),
        config.default_search_location.clone(),
    ));

    // Periodic TTL sweep for the job cache
    let eviction_pool = db.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(CACHE_EVICTION_INTERVAL_SECS));
        loop {
            interval.tick().await;
            match evict_expired(&eviction_pool).await {
                Ok(0) => {}
                Ok(n) => info!("Evicted {n} expired cached jobs"),
                Err(e) => error!("Cache eviction failed: {e}"),
            }
        }
    });

    // Build app state
    let state = AppState { db, ml, pipeline };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "jobmatch-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
