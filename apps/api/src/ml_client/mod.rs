//! ML Client: the single point of entry for all inference-service calls.
//!
//! ARCHITECTURAL RULE: No other module may call the ML service directly.
//! Resume parsing and job matching MUST go through this module.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::providers::CanonicalJobPosting;

const HEALTH_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Error)]
pub enum MlError {
    #[error("ML service is not available")]
    Unavailable,

    #[error("ML service internal error")]
    Internal { status: u16 },

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<MlError> for AppError {
    fn from(e: MlError) -> Self {
        AppError::Inference(e.to_string())
    }
}

/// Structured extraction of a resume as returned by `/parse-resume`.
/// Overwrites the user's stored profile wholesale on each successful parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedResumeProfile {
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub preferred_locations: Vec<String>,
    /// Free-form attributes the parser extracted (experience, education, ...).
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// One scored match from `/match-jobs`. The service returns matches already
/// ordered by descending `match_score`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMatch {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    /// Match quality as a percentage in [0, 100].
    pub match_score: f64,
    #[serde(default)]
    pub semantic_score: f64,
    #[serde(default)]
    pub skills_score: f64,
    #[serde(default)]
    pub experience_score: f64,
    #[serde(default)]
    pub matched_skills: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MlHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ParseResumeRequest<'a> {
    s3_key: &'a str,
}

#[derive(Debug, Serialize)]
struct MatchJobsRequest<'a> {
    parsed_resume: &'a ParsedResumeProfile,
    jobs: &'a [CanonicalJobPosting],
}

#[derive(Debug, Deserialize)]
struct ParseResumeEnvelope {
    data: ParsedResumeProfile,
}

#[derive(Debug, Deserialize)]
struct MatchJobsEnvelope {
    matched_jobs: Vec<ScoredMatch>,
}

#[derive(Debug, Deserialize)]
struct MlErrorBody {
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MlHealthBody {
    status: String,
}

/// Thin HTTP client for the inference service.
#[derive(Clone)]
pub struct MlClient {
    client: Client,
    base_url: String,
}

impl MlClient {
    pub fn new(base_url: String, timeout: std::time::Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Parses an uploaded resume identified by its S3 key.
    pub async fn parse_resume(&self, s3_key: &str) -> Result<ParsedResumeProfile, MlError> {
        info!("Calling ML service to parse resume: {s3_key}");

        let response = self
            .client
            .post(format!("{}/parse-resume", self.base_url))
            .json(&ParseResumeRequest { s3_key })
            .send()
            .await
            .map_err(classify_transport_error)?;

        let envelope: ParseResumeEnvelope = check_status(response).await?.json().await?;

        info!("Resume parsed successfully: {s3_key}");
        Ok(envelope.data)
    }

    /// Scores the given postings against a parsed profile. The returned list
    /// is ordered by descending match score (service contract).
    pub async fn match_jobs(
        &self,
        profile: &ParsedResumeProfile,
        jobs: &[CanonicalJobPosting],
    ) -> Result<Vec<ScoredMatch>, MlError> {
        info!("Calling ML service to match {} jobs", jobs.len());

        let response = self
            .client
            .post(format!("{}/match-jobs", self.base_url))
            .json(&MatchJobsRequest {
                parsed_resume: profile,
                jobs,
            })
            .send()
            .await
            .map_err(classify_transport_error)?;

        let envelope: MatchJobsEnvelope = check_status(response).await?.json().await?;

        info!("Job matching completed: {} matches", envelope.matched_jobs.len());
        Ok(envelope.matched_jobs)
    }

    /// Liveness probe. Reports "unhealthy" instead of failing so the health
    /// endpoint stays answerable while the ML service is down.
    pub async fn health(&self) -> MlHealth {
        let result = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(std::time::Duration::from_secs(HEALTH_TIMEOUT_SECS))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                match response.json::<MlHealthBody>().await {
                    Ok(body) => MlHealth {
                        status: body.status,
                        error: None,
                    },
                    Err(e) => MlHealth {
                        status: "unhealthy".to_string(),
                        error: Some(e.to_string()),
                    },
                }
            }
            Ok(response) => MlHealth {
                status: "unhealthy".to_string(),
                error: Some(format!("status {}", response.status())),
            },
            Err(e) => MlHealth {
                status: "unhealthy".to_string(),
                error: Some(e.to_string()),
            },
        }
    }
}

/// Maps a failed response to an `MlError`, extracting the service's `detail`
/// message when one is present.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, MlError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    if status.is_server_error() {
        return Err(MlError::Internal {
            status: status.as_u16(),
        });
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<MlErrorBody>(&body)
        .ok()
        .and_then(|b| b.detail)
        .unwrap_or(body);

    debug!("ML service returned {status}: {message}");
    Err(MlError::Api {
        status: status.as_u16(),
        message,
    })
}

fn classify_transport_error(e: reqwest::Error) -> MlError {
    if e.is_connect() {
        MlError::Unavailable
    } else {
        MlError::Http(e)
    }
}

/// Seam for the pipeline: resume parsing and job matching behind a trait so
/// tests can substitute a double for the live ML service.
#[async_trait]
pub trait InferenceService: Send + Sync {
    async fn parse_resume(&self, s3_key: &str) -> Result<ParsedResumeProfile, AppError>;

    async fn match_jobs(
        &self,
        profile: &ParsedResumeProfile,
        jobs: &[CanonicalJobPosting],
    ) -> Result<Vec<ScoredMatch>, AppError>;
}

#[async_trait]
impl InferenceService for MlClient {
    async fn parse_resume(&self, s3_key: &str) -> Result<ParsedResumeProfile, AppError> {
        Ok(MlClient::parse_resume(self, s3_key).await?)
    }

    async fn match_jobs(
        &self,
        profile: &ParsedResumeProfile,
        jobs: &[CanonicalJobPosting],
    ) -> Result<Vec<ScoredMatch>, AppError> {
        Ok(MlClient::match_jobs(self, profile, jobs).await?)
    }
}
