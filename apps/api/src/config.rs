use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
///
/// Provider API keys are optional here: a missing key is reported by the
/// provider itself as a non-transient configuration error at query time.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub ml_service_url: String,
    pub ml_service_timeout_secs: u64,
    pub jooble_api_key: Option<String>,
    pub theirstack_api_key: Option<String>,
    pub theirstack_api_url: String,
    pub default_search_location: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            ml_service_url: require_env("ML_SERVICE_URL")?,
            ml_service_timeout_secs: std::env::var("ML_SERVICE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse::<u64>()
                .context("ML_SERVICE_TIMEOUT_SECS must be a number of seconds")?,
            jooble_api_key: std::env::var("JOOBLE_API_KEY").ok(),
            theirstack_api_key: std::env::var("THEIRSTACK_API_KEY").ok(),
            theirstack_api_url: std::env::var("THEIRSTACK_API_URL")
                .unwrap_or_else(|_| "https://api.theirstack.com/v1".to_string()),
            default_search_location: std::env::var("DEFAULT_SEARCH_LOCATION")
                .unwrap_or_else(|_| "India".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
