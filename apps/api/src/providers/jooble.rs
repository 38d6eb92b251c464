//! Jooble, the primary job-search provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{id_string, JobProvider, ProviderError, RawPosting, SearchOptions};

const BASE_URL: &str = "https://jooble.org/api";
const TIMEOUT_SECS: u64 = 10;
const DEFAULT_RADIUS_KM: u32 = 40;

pub struct JoobleProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl JoobleProvider {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct JoobleRequest<'a> {
    keywords: &'a str,
    location: &'a str,
    radius: u32,
    salary: &'a str,
}

#[derive(Debug, Deserialize)]
struct JoobleResponse {
    #[serde(default)]
    jobs: Vec<JoobleJob>,
}

#[derive(Debug, Deserialize)]
struct JoobleJob {
    id: Option<serde_json::Value>,
    title: Option<String>,
    location: Option<String>,
    snippet: Option<String>,
    salary: Option<String>,
    link: Option<String>,
    company: Option<String>,
    updated: Option<String>,
}

impl JoobleJob {
    fn into_raw(self) -> RawPosting {
        RawPosting {
            external_id: self.id.map(id_string),
            title: self.title,
            company: self.company,
            location: self.location,
            description: None,
            snippet: self.snippet,
            salary: self.salary,
            experience: None,
            link: self.link,
            posted_date: self.updated.as_deref().and_then(parse_updated),
        }
    }
}

/// Jooble timestamps are close to RFC 3339 but sometimes lack an offset.
fn parse_updated(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|n| n.and_utc())
        })
}

#[async_trait]
impl JobProvider for JoobleProvider {
    fn name(&self) -> &'static str {
        "jooble"
    }

    async fn query(
        &self,
        keywords: &str,
        location: &str,
        options: &SearchOptions,
    ) -> Result<Vec<RawPosting>, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Config("Jooble API key not configured".to_string()))?;

        let response = self
            .client
            .post(format!("{}/{}", self.base_url, api_key))
            .timeout(std::time::Duration::from_secs(TIMEOUT_SECS))
            .json(&JoobleRequest {
                keywords,
                location,
                radius: options.radius_km.unwrap_or(DEFAULT_RADIUS_KM),
                salary: options.salary.as_deref().unwrap_or(""),
            })
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }
        if status.is_server_error() {
            return Err(ProviderError::Server {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Request(format!("status {status}: {body}")));
        }

        let parsed: JoobleResponse = response.json().await.map_err(ProviderError::from_reqwest)?;
        Ok(parsed.jobs.into_iter().map(JoobleJob::into_raw).collect())
    }
}
