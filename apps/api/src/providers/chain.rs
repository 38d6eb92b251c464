//! Ordered provider chain with fallback-on-transient-failure.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::{normalize, CanonicalJobPosting, JobProvider, SearchOptions};
use crate::errors::AppError;

/// Seam for the pipeline: one aggregate fetch across all configured
/// providers.
#[async_trait]
pub trait JobAggregator: Send + Sync {
    async fn fetch_jobs(
        &self,
        keywords: &str,
        location: &str,
        options: &SearchOptions,
    ) -> Result<Vec<CanonicalJobPosting>, AppError>;
}

pub struct ProviderChain {
    providers: Vec<Arc<dyn JobProvider>>,
}

impl ProviderChain {
    /// Providers are queried in the given order.
    pub fn new(providers: Vec<Arc<dyn JobProvider>>) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl JobAggregator for ProviderChain {
    /// Queries providers in priority order. Any returned result, including
    /// an explicitly empty one, is terminal: an empty result means the
    /// search matched nothing, not that the provider was unavailable.
    /// Transient failures fall through to the next provider; anything else
    /// propagates immediately, tagged with the provider that produced it.
    async fn fetch_jobs(
        &self,
        keywords: &str,
        location: &str,
        options: &SearchOptions,
    ) -> Result<Vec<CanonicalJobPosting>, AppError> {
        for provider in &self.providers {
            info!(
                "Fetching jobs from {}: \"{keywords}\" in {location}",
                provider.name()
            );

            match provider.query(keywords, location, options).await {
                Ok(raw) => {
                    if raw.is_empty() {
                        info!("No jobs found from {}", provider.name());
                    } else {
                        info!("Fetched {} jobs from {}", raw.len(), provider.name());
                    }
                    return Ok(raw
                        .into_iter()
                        .map(|r| normalize(r, provider.name()))
                        .collect());
                }
                Err(e) if e.is_transient() => {
                    warn!("{} failed: {e}; trying next provider", provider.name());
                }
                Err(e) => {
                    warn!("{} failed: {e}", provider.name());
                    return Err(AppError::Provider {
                        provider: Some(provider.name().to_string()),
                        message: e.to_string(),
                    });
                }
            }
        }

        Err(AppError::Provider {
            provider: None,
            message: "All job providers failed".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ProviderError, RawPosting};
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Return(Vec<RawPosting>),
        RateLimited,
        ServerFault,
        Misconfigured,
    }

    struct StubProvider {
        name: &'static str,
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn new(name: &'static str, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                name,
                behavior,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JobProvider for StubProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn query(
            &self,
            _keywords: &str,
            _location: &str,
            _options: &SearchOptions,
        ) -> Result<Vec<RawPosting>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Return(postings) => Ok(postings.clone()),
                Behavior::RateLimited => Err(ProviderError::RateLimited),
                Behavior::ServerFault => Err(ProviderError::Server { status: 503 }),
                Behavior::Misconfigured => {
                    Err(ProviderError::Config("API key not configured".to_string()))
                }
            }
        }
    }

    fn raw(title: &str) -> RawPosting {
        RawPosting {
            external_id: Some(format!("id-{title}")),
            title: Some(title.to_string()),
            ..RawPosting::default()
        }
    }

    #[tokio::test]
    async fn test_transient_failure_falls_through_in_order() {
        let primary = StubProvider::new("primary", Behavior::RateLimited);
        let backup = StubProvider::new("backup", Behavior::Return(vec![raw("J1")]));
        let chain = ProviderChain::new(vec![primary.clone(), backup.clone()]);

        let jobs = chain
            .fetch_jobs("rust", "Bangalore", &SearchOptions::default())
            .await
            .unwrap();

        assert_eq!(primary.calls(), 1);
        assert_eq!(backup.calls(), 1);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].source, "backup");
        assert_eq!(jobs[0].title, "J1");
    }

    #[tokio::test]
    async fn test_server_fault_also_falls_through() {
        let primary = StubProvider::new("primary", Behavior::ServerFault);
        let backup = StubProvider::new("backup", Behavior::Return(vec![raw("J1")]));
        let chain = ProviderChain::new(vec![primary.clone(), backup.clone()]);

        let jobs = chain
            .fetch_jobs("rust", "Pune", &SearchOptions::default())
            .await
            .unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!(backup.calls(), 1);
    }

    #[tokio::test]
    async fn test_non_transient_failure_aborts_without_fallback() {
        let primary = StubProvider::new("primary", Behavior::Misconfigured);
        let backup = StubProvider::new("backup", Behavior::Return(vec![raw("J1")]));
        let chain = ProviderChain::new(vec![primary.clone(), backup.clone()]);

        let err = chain
            .fetch_jobs("rust", "Pune", &SearchOptions::default())
            .await
            .unwrap_err();

        assert_eq!(backup.calls(), 0);
        match err {
            AppError::Provider { provider, message } => {
                assert_eq!(provider.as_deref(), Some("primary"));
                assert!(message.contains("not configured"));
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_result_is_terminal_and_does_not_fall_through() {
        let primary = StubProvider::new("primary", Behavior::Return(vec![]));
        let backup = StubProvider::new("backup", Behavior::Return(vec![raw("J1")]));
        let chain = ProviderChain::new(vec![primary.clone(), backup.clone()]);

        let jobs = chain
            .fetch_jobs("cobol", "Mumbai", &SearchOptions::default())
            .await
            .unwrap();

        assert!(jobs.is_empty());
        assert_eq!(backup.calls(), 0);
    }

    #[tokio::test]
    async fn test_exhausted_chain_reports_aggregate_failure() {
        let primary = StubProvider::new("primary", Behavior::RateLimited);
        let backup = StubProvider::new("backup", Behavior::ServerFault);
        let chain = ProviderChain::new(vec![primary.clone(), backup.clone()]);

        let err = chain
            .fetch_jobs("rust", "Delhi", &SearchOptions::default())
            .await
            .unwrap_err();

        assert_eq!(primary.calls(), 1);
        assert_eq!(backup.calls(), 1);
        match err {
            AppError::Provider { provider, message } => {
                assert!(provider.is_none());
                assert_eq!(message, "All job providers failed");
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_results_are_normalized_with_defaults() {
        let primary = StubProvider::new(
            "primary",
            Behavior::Return(vec![RawPosting {
                title: Some("Untitled role".to_string()),
                ..RawPosting::default()
            }]),
        );
        let chain = ProviderChain::new(vec![primary]);

        let jobs = chain
            .fetch_jobs("rust", "Delhi", &SearchOptions::default())
            .await
            .unwrap();

        assert_eq!(jobs[0].salary, "Not specified");
        assert_eq!(jobs[0].experience_required, "Not specified");
        assert_eq!(jobs[0].source, "primary");
    }
}
