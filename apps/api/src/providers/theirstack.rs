//! TheirStack, the fallback job-search provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::{id_string, JobProvider, ProviderError, RawPosting, SearchOptions};

const TIMEOUT_SECS: u64 = 10;
const PAGE_SIZE: u32 = 25;

pub struct TheirStackProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl TheirStackProvider {
    pub fn new(client: Client, api_key: Option<String>, base_url: String) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TheirStackResponse {
    /// Some deployments return `jobs`, others `data`. `jobs` wins when both
    /// are present, even if it is empty.
    jobs: Option<Vec<TheirStackJob>>,
    data: Option<Vec<TheirStackJob>>,
}

#[derive(Debug, Deserialize)]
struct TheirStackJob {
    id: Option<serde_json::Value>,
    title: Option<String>,
    job_title: Option<String>,
    company: Option<String>,
    company_name: Option<String>,
    location: Option<String>,
    job_location: Option<String>,
    description: Option<String>,
    snippet: Option<String>,
    salary: Option<String>,
    experience: Option<String>,
    url: Option<String>,
    link: Option<String>,
    date: Option<DateTime<Utc>>,
}

impl TheirStackJob {
    fn into_raw(self) -> RawPosting {
        RawPosting {
            external_id: self.id.map(id_string),
            title: self.title.or(self.job_title),
            company: self.company.or(self.company_name),
            location: self.location.or(self.job_location),
            description: self.description,
            snippet: self.snippet,
            salary: self.salary,
            experience: self.experience,
            link: self.link.or(self.url),
            posted_date: self.date,
        }
    }
}

#[async_trait]
impl JobProvider for TheirStackProvider {
    fn name(&self) -> &'static str {
        "theirstack"
    }

    async fn query(
        &self,
        keywords: &str,
        location: &str,
        _options: &SearchOptions,
    ) -> Result<Vec<RawPosting>, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Config("TheirStack API key not configured".to_string()))?;

        let limit = PAGE_SIZE.to_string();
        let response = self
            .client
            .get(format!("{}/jobs", self.base_url))
            .timeout(std::time::Duration::from_secs(TIMEOUT_SECS))
            .query(&[
                ("query", keywords),
                ("location", location),
                ("page", "1"),
                ("limit", limit.as_str()),
            ])
            .bearer_auth(api_key)
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

        let parsed: TheirStackResponse =
            response.json().await.map_err(ProviderError::from_reqwest)?;
        let jobs = parsed.jobs.or(parsed.data).unwrap_or_default();
        Ok(jobs.into_iter().map(TheirStackJob::into_raw).collect())
    }
}
