//! Job-search provider boundary: the provider contract, transient/fatal
//! error classification, and the canonical posting shape every provider's
//! raw payload is normalized into.

pub mod chain;
pub mod jooble;
pub mod normalize;
pub mod theirstack;

pub use chain::{JobAggregator, ProviderChain};
pub use normalize::normalize;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("rate limit exceeded")]
    RateLimited,

    #[error("server error (status {status})")]
    Server { status: u16 },

    #[error("request timed out")]
    Timeout,

    #[error("provider not configured: {0}")]
    Config(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl ProviderError {
    /// Transient failures license falling through to the next provider in
    /// the chain. Everything else is caller-actionable and aborts the chain.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited | ProviderError::Server { .. } | ProviderError::Timeout
        )
    }

    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Request(e.to_string())
        }
    }
}

/// Search tuning accepted by all providers. Defaults match the upstream
/// query shape: 40 km radius, no salary floor.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub radius_km: Option<u32>,
    pub salary: Option<String>,
}

/// Raw posting fields as understood across providers, before normalization.
/// Providers map their own response DTOs into this shape and nothing else.
#[derive(Debug, Clone, Default)]
pub struct RawPosting {
    pub external_id: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub snippet: Option<String>,
    pub salary: Option<String>,
    pub experience: Option<String>,
    pub link: Option<String>,
    pub posted_date: Option<DateTime<Utc>>,
}

/// Provider-agnostic posting produced by [`normalize`]; transient until
/// cached as a job row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalJobPosting {
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
}

/// One external job-search API.
#[async_trait]
pub trait JobProvider: Send + Sync {
    /// Stable provider tag, also stored as the posting source.
    fn name(&self) -> &'static str;

    async fn query(
        &self,
        keywords: &str,
        location: &str,
        options: &SearchOptions,
    ) -> Result<Vec<RawPosting>, ProviderError>;
}

/// Renders a JSON id field as a plain string. Providers disagree on whether
/// ids are strings or numbers.
pub(crate) fn id_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}
