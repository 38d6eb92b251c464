//! Resume-processing pipeline: parse the uploaded resume, overwrite the
//! stored profile, aggregate postings, cache them, score matches, record
//! history, and delete the uploaded asset.
//!
//! Stages 1, 2, 4 and 6 are fatal; caching, history writes and the asset
//! delete are best-effort and surface as [`PipelineWarning`]s instead of
//! changing the outcome. The asset delete runs exactly once per invocation
//! on every path, including cancellation.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::assets::AssetStore;
use crate::errors::AppError;
use crate::jobs::cache::JobCache;
use crate::jobs::history::MatchHistoryStore;
use crate::ml_client::{InferenceService, ParsedResumeProfile, ScoredMatch};
use crate::models::job::CachedJobRecord;
use crate::models::match_history::NewMatchRecord;
use crate::providers::{CanonicalJobPosting, JobAggregator, SearchOptions};
use crate::resume::profile::ProfileStore;

/// Non-fatal incidents recorded during one invocation. These never change
/// the overall outcome; they exist so operators and tests can see
/// best-effort failures instead of inferring them from silence.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineWarning {
    CacheWrite { message: String },
    HistoryWrite { message: String },
    UnresolvedMatch { title: String },
    Cleanup { key: String, message: String },
}

impl std::fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineWarning::CacheWrite { message } => {
                write!(f, "cache write failed: {message}")
            }
            PipelineWarning::HistoryWrite { message } => {
                write!(f, "history write failed: {message}")
            }
            PipelineWarning::UnresolvedMatch { title } => {
                write!(f, "no cached job for match: {title}")
            }
            PipelineWarning::Cleanup { key, message } => {
                write!(f, "asset cleanup failed for {key}: {message}")
            }
        }
    }
}

/// Caller-visible success payload.
#[derive(Debug, Serialize)]
pub struct ProcessResumeResponse {
    pub parsed_data: ParsedResumeProfile,
    pub matched_jobs: Vec<ScoredMatch>,
    pub total_jobs_analyzed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Outcome of one invocation: the response plus any recorded warnings.
#[derive(Debug)]
pub struct ProcessReport {
    pub response: ProcessResumeResponse,
    pub warnings: Vec<PipelineWarning>,
}

/// The orchestrator. Holds no mutable state of its own; correctness under
/// concurrent invocations rests on the cache's atomic upsert and the
/// append-only history inserts.
pub struct ResumePipeline {
    inference: Arc<dyn InferenceService>,
    aggregator: Arc<dyn JobAggregator>,
    cache: Arc<dyn JobCache>,
    history: Arc<dyn MatchHistoryStore>,
    profiles: Arc<dyn ProfileStore>,
    assets: Arc<dyn AssetStore>,
    default_location: String,
}

impl ResumePipeline {
    pub fn new(
        inference: Arc<dyn InferenceService>,
        aggregator: Arc<dyn JobAggregator>,
        cache: Arc<dyn JobCache>,
        history: Arc<dyn MatchHistoryStore>,
        profiles: Arc<dyn ProfileStore>,
        assets: Arc<dyn AssetStore>,
        default_location: String,
    ) -> Self {
        Self {
            inference,
            aggregator,
            cache,
            history,
            profiles,
            assets,
            default_location,
        }
    }

    /// Runs the full workflow for one uploaded resume.
    pub async fn process_resume(
        &self,
        user_id: Uuid,
        s3_key: &str,
    ) -> Result<ProcessReport, AppError> {
        info!("Starting resume processing for user {user_id}, S3 key: {s3_key}");

        let mut warnings = Vec::new();
        let guard = CleanupGuard::new(self.assets.clone(), s3_key.to_string());

        let result = self.run(user_id, s3_key, &mut warnings).await;

        if let Some(w) = guard.run().await {
            warnings.push(w);
        }

        match result {
            Ok(response) => {
                info!("Resume processing completed successfully for user {user_id}");
                Ok(ProcessReport { response, warnings })
            }
            Err(e) => {
                error!("Resume processing failed for user {user_id}: {e}");
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        user_id: Uuid,
        s3_key: &str,
        warnings: &mut Vec<PipelineWarning>,
    ) -> Result<ProcessResumeResponse, AppError> {
        info!("Step 1: Parsing resume with ML service");
        let profile = self.inference.parse_resume(s3_key).await?;

        info!("Step 2: Storing parsed data in user profile");
        self.profiles.store_parsed(user_id, &profile).await?;

        let keywords = profile.skills.join(" ");
        if keywords.is_empty() {
            return Err(AppError::Validation(
                "No skills found in resume to match jobs".to_string(),
            ));
        }
        let location = profile
            .preferred_locations
            .first()
            .cloned()
            .unwrap_or_else(|| self.default_location.clone());

        info!("Step 3: Fetching jobs from external APIs");
        let jobs = self
            .aggregator
            .fetch_jobs(&keywords, &location, &SearchOptions::default())
            .await?;

        if jobs.is_empty() {
            info!("No jobs found from external APIs");
            return Ok(ProcessResumeResponse {
                parsed_data: profile,
                matched_jobs: vec![],
                total_jobs_analyzed: 0,
                message: Some("No jobs found matching your skills and location".to_string()),
            });
        }
        info!("Fetched {} jobs from external APIs", jobs.len());

        info!("Step 4: Caching jobs in database");
        let cached = self.cache_postings(&jobs, warnings).await;

        info!("Step 5: Matching jobs with ML service");
        let matches = self.inference.match_jobs(&profile, &jobs).await?;

        info!("Step 6: Storing match history");
        self.store_history(user_id, &matches, &cached, warnings)
            .await;

        Ok(ProcessResumeResponse {
            parsed_data: profile,
            matched_jobs: matches,
            total_jobs_analyzed: jobs.len(),
            message: None,
        })
    }

    /// Best-effort batch upsert. On the first failure the whole batch is
    /// abandoned and an empty batch returned; matching downstream consumes
    /// the freshly fetched postings, so a cache failure cannot corrupt it.
    async fn cache_postings(
        &self,
        jobs: &[CanonicalJobPosting],
        warnings: &mut Vec<PipelineWarning>,
    ) -> Vec<CachedJobRecord> {
        let mut cached = Vec::with_capacity(jobs.len());
        for posting in jobs {
            match self.cache.upsert(posting).await {
                Ok(record) => cached.push(record),
                Err(e) => {
                    error!("Error caching jobs: {e}");
                    warnings.push(PipelineWarning::CacheWrite {
                        message: e.to_string(),
                    });
                    return Vec::new();
                }
            }
        }
        info!("Cached {} jobs in database", cached.len());
        cached
    }

    /// Best-effort history write. A match with no resolvable cached record
    /// is skipped with a warning but still consumes its ranking position.
    async fn store_history(
        &self,
        user_id: Uuid,
        matches: &[ScoredMatch],
        cached: &[CachedJobRecord],
        warnings: &mut Vec<PipelineWarning>,
    ) {
        let mut records = Vec::with_capacity(matches.len());
        for (i, matched) in matches.iter().enumerate() {
            let Some(job) = resolve_cached_record(cached, matched) else {
                warn!("Could not find cached job for match: {}", matched.title);
                warnings.push(PipelineWarning::UnresolvedMatch {
                    title: matched.title.clone(),
                });
                continue;
            };

            records.push(NewMatchRecord {
                user_id,
                job_id: job.id,
                semantic_score: matched.semantic_score,
                skills_score: matched.skills_score,
                experience_score: matched.experience_score,
                composite_score: matched.match_score / 100.0,
                match_percentage: matched.match_score,
                matched_skills: matched.matched_skills.clone(),
                ranking_position: (i + 1) as i32,
            });
        }

        if records.is_empty() {
            return;
        }

        match self.history.insert_matches(&records).await {
            Ok(n) => info!("Stored {n} match history records"),
            Err(e) => {
                error!("Error storing match history: {e}");
                warnings.push(PipelineWarning::HistoryWrite {
                    message: e.to_string(),
                });
            }
        }
    }
}

/// Resolves a scored match back to its cached row, by provider id or exact
/// title. The title fallback is ambiguous under duplicate titles; the policy
/// lives here so it can be swapped without touching the pipeline.
fn resolve_cached_record<'a>(
    cached: &'a [CachedJobRecord],
    matched: &ScoredMatch,
) -> Option<&'a CachedJobRecord> {
    cached.iter().find(|job| {
        matched.id.as_deref() == Some(job.external_id.as_str()) || job.title == matched.title
    })
}

/// Guarantees the uploaded asset is deleted exactly once per invocation.
/// `run` is the normal path; if the invocation future is dropped before it
/// gets there (caller disconnect), `Drop` detaches the delete onto its own
/// task so it still runs to completion.
struct CleanupGuard {
    assets: Arc<dyn AssetStore>,
    key: String,
    armed: bool,
}

impl CleanupGuard {
    fn new(assets: Arc<dyn AssetStore>, key: String) -> Self {
        Self {
            assets,
            key,
            armed: true,
        }
    }

    /// Deletes the asset, reporting failure as a warning. The delete runs on
    /// a detached task so it is not cancellable mid-flight.
    async fn run(mut self) -> Option<PipelineWarning> {
        self.armed = false;
        let assets = self.assets.clone();
        let key = self.key.clone();

        let outcome = tokio::spawn(async move {
            let result = assets.delete(&key).await;
            (key, result)
        })
        .await;

        match outcome {
            Ok((key, Ok(()))) => {
                info!("Cleaned up S3 file: {key}");
                None
            }
            Ok((key, Err(e))) => {
                error!("Failed to cleanup S3 file {key}: {e}");
                Some(PipelineWarning::Cleanup {
                    key,
                    message: e.to_string(),
                })
            }
            Err(e) => {
                error!("Cleanup task failed: {e}");
                Some(PipelineWarning::Cleanup {
                    key: self.key.clone(),
                    message: e.to_string(),
                })
            }
        }
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let assets = self.assets.clone();
            let key = std::mem::take(&mut self.key);
            handle.spawn(async move {
                if let Err(e) = assets.delete(&key).await {
                    error!("Failed to cleanup S3 file {key}: {e}");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn profile(skills: &[&str], locations: &[&str]) -> ParsedResumeProfile {
        ParsedResumeProfile {
            skills: skills.iter().map(|s| s.to_string()).collect(),
            preferred_locations: locations.iter().map(|s| s.to_string()).collect(),
            attributes: serde_json::Map::new(),
        }
    }

    fn posting(external_id: &str, title: &str) -> CanonicalJobPosting {
        CanonicalJobPosting {
            external_id: external_id.to_string(),
            source: "jooble".to_string(),
            title: title.to_string(),
            company: "Acme".to_string(),
            location: "Bangalore".to_string(),
            description: "desc".to_string(),
            snippet: "desc".to_string(),
            salary: "Not specified".to_string(),
            experience_required: "Not specified".to_string(),
            link: format!("https://example.com/{external_id}"),
            posted_date: Utc::now(),
        }
    }

    fn scored(id: Option<&str>, title: &str, pct: f64) -> ScoredMatch {
        ScoredMatch {
            id: id.map(|s| s.to_string()),
            title: title.to_string(),
            match_score: pct,
            semantic_score: 0.8,
            skills_score: 0.9,
            experience_score: 0.7,
            matched_skills: vec!["python".to_string()],
        }
    }

    #[derive(Default)]
    struct MockInference {
        parse: Mutex<Option<Result<ParsedResumeProfile, AppError>>>,
        matches: Mutex<Option<Result<Vec<ScoredMatch>, AppError>>>,
        match_calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl InferenceService for MockInference {
        async fn parse_resume(&self, _s3_key: &str) -> Result<ParsedResumeProfile, AppError> {
            self.parse
                .lock()
                .unwrap()
                .take()
                .expect("unexpected parse_resume call")
        }

        async fn match_jobs(
            &self,
            _profile: &ParsedResumeProfile,
            _jobs: &[CanonicalJobPosting],
        ) -> Result<Vec<ScoredMatch>, AppError> {
            self.match_calls.fetch_add(1, Ordering::SeqCst);
            self.matches
                .lock()
                .unwrap()
                .take()
                .expect("unexpected match_jobs call")
        }
    }

    #[derive(Default)]
    struct MockAggregator {
        result: Mutex<Option<Result<Vec<CanonicalJobPosting>, AppError>>>,
        calls: AtomicUsize,
        last_query: Mutex<Option<(String, String)>>,
    }

    #[async_trait::async_trait]
    impl JobAggregator for MockAggregator {
        async fn fetch_jobs(
            &self,
            keywords: &str,
            location: &str,
            _options: &SearchOptions,
        ) -> Result<Vec<CanonicalJobPosting>, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_query.lock().unwrap() = Some((keywords.to_string(), location.to_string()));
            self.result
                .lock()
                .unwrap()
                .take()
                .expect("unexpected fetch_jobs call")
        }
    }

    #[derive(Default)]
    struct MockCache {
        upserts: Mutex<Vec<CanonicalJobPosting>>,
        returned: Mutex<Vec<CachedJobRecord>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl JobCache for MockCache {
        async fn upsert(&self, posting: &CanonicalJobPosting) -> Result<CachedJobRecord, AppError> {
            self.upserts.lock().unwrap().push(posting.clone());
            if self.fail {
                return Err(AppError::Internal(anyhow::anyhow!("cache unavailable")));
            }
            let now = Utc::now();
            let record = CachedJobRecord {
                id: Uuid::new_v4(),
                external_id: posting.external_id.clone(),
                source: posting.source.clone(),
                title: posting.title.clone(),
                company: posting.company.clone(),
                location: posting.location.clone(),
                description: posting.description.clone(),
                snippet: posting.snippet.clone(),
                salary: posting.salary.clone(),
                experience_required: posting.experience_required.clone(),
                link: posting.link.clone(),
                posted_date: posting.posted_date,
                fetched_at: now,
                expires_at: now + Duration::days(7),
            };
            self.returned.lock().unwrap().push(record.clone());
            Ok(record)
        }
    }

    #[derive(Default)]
    struct MockHistory {
        inserted: Mutex<Vec<NewMatchRecord>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl MatchHistoryStore for MockHistory {
        async fn insert_matches(&self, records: &[NewMatchRecord]) -> Result<u64, AppError> {
            if self.fail {
                return Err(AppError::Internal(anyhow::anyhow!("history unavailable")));
            }
            self.inserted.lock().unwrap().extend_from_slice(records);
            Ok(records.len() as u64)
        }
    }

    #[derive(Default)]
    struct MockProfiles {
        stored: Mutex<Vec<ParsedResumeProfile>>,
        missing_user: bool,
    }

    #[async_trait::async_trait]
    impl ProfileStore for MockProfiles {
        async fn store_parsed(
            &self,
            _user_id: Uuid,
            profile: &ParsedResumeProfile,
        ) -> Result<(), AppError> {
            if self.missing_user {
                return Err(AppError::NotFound("User not found".to_string()));
            }
            self.stored.lock().unwrap().push(profile.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockAssets {
        deletes: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl AssetStore for MockAssets {
        async fn delete(&self, key: &str) -> Result<(), AppError> {
            self.deletes.lock().unwrap().push(key.to_string());
            if self.fail {
                return Err(AppError::S3("Failed to delete file".to_string()));
            }
            Ok(())
        }
    }

    struct Fixture {
        inference: Arc<MockInference>,
        aggregator: Arc<MockAggregator>,
        cache: Arc<MockCache>,
        history: Arc<MockHistory>,
        profiles: Arc<MockProfiles>,
        assets: Arc<MockAssets>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                inference: Arc::new(MockInference::default()),
                aggregator: Arc::new(MockAggregator::default()),
                cache: Arc::new(MockCache::default()),
                history: Arc::new(MockHistory::default()),
                profiles: Arc::new(MockProfiles::default()),
                assets: Arc::new(MockAssets::default()),
            }
        }

        fn pipeline(&self) -> ResumePipeline {
            ResumePipeline::new(
                self.inference.clone(),
                self.aggregator.clone(),
                self.cache.clone(),
                self.history.clone(),
                self.profiles.clone(),
                self.assets.clone(),
                "India".to_string(),
            )
        }

        fn set_parse(&self, result: Result<ParsedResumeProfile, AppError>) {
            *self.inference.parse.lock().unwrap() = Some(result);
        }

        fn set_matches(&self, result: Result<Vec<ScoredMatch>, AppError>) {
            *self.inference.matches.lock().unwrap() = Some(result);
        }

        fn set_jobs(&self, result: Result<Vec<CanonicalJobPosting>, AppError>) {
            *self.aggregator.result.lock().unwrap() = Some(result);
        }

        fn deletes(&self) -> Vec<String> {
            self.assets.deletes.lock().unwrap().clone()
        }
    }

    #[tokio::test]
    async fn test_full_run_records_ranked_history() {
        let fx = Fixture::new();
        fx.set_parse(Ok(profile(
            &["python", "distributed systems"],
            &["Bangalore"],
        )));
        fx.set_jobs(Ok(vec![posting("J1", "Backend Engineer"), posting("J2", "Data Engineer")]));
        fx.set_matches(Ok(vec![scored(Some("J1"), "Backend Engineer", 85.0)]));

        let report = fx
            .pipeline()
            .process_resume(Uuid::new_v4(), "resumes/u1.pdf")
            .await
            .unwrap();

        assert_eq!(report.response.total_jobs_analyzed, 2);
        assert_eq!(report.response.matched_jobs.len(), 1);
        assert!(report.warnings.is_empty());

        let query = fx.aggregator.last_query.lock().unwrap().clone().unwrap();
        assert_eq!(query.0, "python distributed systems");
        assert_eq!(query.1, "Bangalore");

        let inserted = fx.history.inserted.lock().unwrap();
        assert_eq!(inserted.len(), 1);
        let record = &inserted[0];
        assert_eq!(record.match_percentage, 85.0);
        assert!((record.composite_score - 0.85).abs() < 1e-6);
        assert_eq!(record.ranking_position, 1);

        let cached = fx.cache.returned.lock().unwrap();
        assert_eq!(record.job_id, cached[0].id);

        assert_eq!(fx.deletes(), vec!["resumes/u1.pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_skills_fail_validation_before_any_provider_call() {
        let fx = Fixture::new();
        fx.set_parse(Ok(profile(&[], &["Bangalore"])));

        let err = fx
            .pipeline()
            .process_resume(Uuid::new_v4(), "resumes/u2.pdf")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(fx.aggregator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(fx.deletes().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_postings_is_success_with_cleanup() {
        let fx = Fixture::new();
        fx.set_parse(Ok(profile(&["cobol"], &[])));
        fx.set_jobs(Ok(vec![]));

        let report = fx
            .pipeline()
            .process_resume(Uuid::new_v4(), "resumes/u3.pdf")
            .await
            .unwrap();

        assert!(report.response.matched_jobs.is_empty());
        assert_eq!(report.response.total_jobs_analyzed, 0);
        assert!(report.response.message.is_some());
        assert_eq!(fx.inference.match_calls.load(Ordering::SeqCst), 0);
        assert!(fx.cache.upserts.lock().unwrap().is_empty());
        assert_eq!(fx.deletes().len(), 1);
    }

    #[tokio::test]
    async fn test_default_location_used_when_no_preference() {
        let fx = Fixture::new();
        fx.set_parse(Ok(profile(&["rust"], &[])));
        fx.set_jobs(Ok(vec![]));

        fx.pipeline()
            .process_resume(Uuid::new_v4(), "resumes/u4.pdf")
            .await
            .unwrap();

        let query = fx.aggregator.last_query.lock().unwrap().clone().unwrap();
        assert_eq!(query.1, "India");
    }

    #[tokio::test]
    async fn test_every_posting_is_upserted_once() {
        let fx = Fixture::new();
        fx.set_parse(Ok(profile(&["rust"], &[])));
        let jobs: Vec<_> = (0..5)
            .map(|i| posting(&format!("J{i}"), &format!("Role {i}")))
            .collect();
        fx.set_jobs(Ok(jobs));
        fx.set_matches(Ok(vec![]));

        fx.pipeline()
            .process_resume(Uuid::new_v4(), "resumes/u5.pdf")
            .await
            .unwrap();

        assert_eq!(fx.cache.upserts.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_ranking_positions_follow_returned_order() {
        let fx = Fixture::new();
        fx.set_parse(Ok(profile(&["rust"], &[])));
        fx.set_jobs(Ok(vec![
            posting("J1", "Role A"),
            posting("J2", "Role B"),
            posting("J3", "Role C"),
        ]));
        fx.set_matches(Ok(vec![
            scored(Some("J3"), "Role C", 91.0),
            scored(Some("J1"), "Role A", 74.5),
            scored(Some("J2"), "Role B", 60.0),
        ]));

        fx.pipeline()
            .process_resume(Uuid::new_v4(), "resumes/u6.pdf")
            .await
            .unwrap();

        let inserted = fx.history.inserted.lock().unwrap();
        let positions: Vec<_> = inserted.iter().map(|r| r.ranking_position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
        for record in inserted.iter() {
            assert!((record.composite_score - record.match_percentage / 100.0).abs() < 1e-6);
        }
    }

    #[tokio::test]
    async fn test_title_fallback_resolves_match_without_id() {
        let fx = Fixture::new();
        fx.set_parse(Ok(profile(&["rust"], &[])));
        fx.set_jobs(Ok(vec![posting("J1", "Backend Engineer")]));
        fx.set_matches(Ok(vec![scored(None, "Backend Engineer", 70.0)]));

        let report = fx
            .pipeline()
            .process_resume(Uuid::new_v4(), "resumes/u7.pdf")
            .await
            .unwrap();

        assert!(report.warnings.is_empty());
        assert_eq!(fx.history.inserted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unresolved_match_skipped_but_keeps_its_position() {
        let fx = Fixture::new();
        fx.set_parse(Ok(profile(&["rust"], &[])));
        fx.set_jobs(Ok(vec![posting("J2", "Role B")]));
        fx.set_matches(Ok(vec![
            scored(Some("ghost"), "Unknown Role", 95.0),
            scored(Some("J2"), "Role B", 80.0),
        ]));

        let report = fx
            .pipeline()
            .process_resume(Uuid::new_v4(), "resumes/u8.pdf")
            .await
            .unwrap();

        assert!(report.warnings.contains(&PipelineWarning::UnresolvedMatch {
            title: "Unknown Role".to_string()
        }));
        let inserted = fx.history.inserted.lock().unwrap();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].ranking_position, 2);
    }

    #[tokio::test]
    async fn test_cache_failure_is_nonfatal_and_recorded() {
        let fx = Fixture {
            cache: Arc::new(MockCache {
                fail: true,
                ..MockCache::default()
            }),
            ..Fixture::new()
        };
        fx.set_parse(Ok(profile(&["rust"], &[])));
        fx.set_jobs(Ok(vec![posting("J1", "Role A"), posting("J2", "Role B")]));
        fx.set_matches(Ok(vec![scored(Some("J1"), "Role A", 85.0)]));

        let report = fx
            .pipeline()
            .process_resume(Uuid::new_v4(), "resumes/u9.pdf")
            .await
            .unwrap();

        // Matching still ran on the fetched postings; history could not
        // resolve against an empty batch.
        assert_eq!(report.response.total_jobs_analyzed, 2);
        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, PipelineWarning::CacheWrite { .. })));
        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, PipelineWarning::UnresolvedMatch { .. })));
        assert!(fx.history.inserted.lock().unwrap().is_empty());
        assert_eq!(fx.deletes().len(), 1);
    }

    #[tokio::test]
    async fn test_history_failure_is_nonfatal_and_recorded() {
        let fx = Fixture {
            history: Arc::new(MockHistory {
                fail: true,
                ..MockHistory::default()
            }),
            ..Fixture::new()
        };
        fx.set_parse(Ok(profile(&["rust"], &[])));
        fx.set_jobs(Ok(vec![posting("J1", "Role A")]));
        fx.set_matches(Ok(vec![scored(Some("J1"), "Role A", 85.0)]));

        let report = fx
            .pipeline()
            .process_resume(Uuid::new_v4(), "resumes/u10.pdf")
            .await
            .unwrap();

        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, PipelineWarning::HistoryWrite { .. })));
        assert_eq!(fx.deletes().len(), 1);
    }

    #[tokio::test]
    async fn test_parse_failure_is_fatal_but_cleanup_runs() {
        let fx = Fixture::new();
        fx.set_parse(Err(AppError::Inference(
            "ML service is not available".to_string(),
        )));

        let err = fx
            .pipeline()
            .process_resume(Uuid::new_v4(), "resumes/u11.pdf")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Inference(_)));
        assert_eq!(fx.aggregator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(fx.deletes().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_user_is_fatal_not_found() {
        let fx = Fixture {
            profiles: Arc::new(MockProfiles {
                missing_user: true,
                ..MockProfiles::default()
            }),
            ..Fixture::new()
        };
        fx.set_parse(Ok(profile(&["rust"], &[])));

        let err = fx
            .pipeline()
            .process_resume(Uuid::new_v4(), "resumes/u12.pdf")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(fx.deletes().len(), 1);
    }

    #[tokio::test]
    async fn test_match_failure_is_fatal_but_cleanup_runs_once() {
        let fx = Fixture::new();
        fx.set_parse(Ok(profile(&["rust"], &[])));
        fx.set_jobs(Ok(vec![posting("J1", "Role A")]));
        fx.set_matches(Err(AppError::Inference(
            "ML service internal error".to_string(),
        )));

        let err = fx
            .pipeline()
            .process_resume(Uuid::new_v4(), "resumes/u13.pdf")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Inference(_)));
        assert_eq!(fx.deletes().len(), 1);
    }

    #[tokio::test]
    async fn test_aggregation_failure_is_fatal_but_cleanup_runs() {
        let fx = Fixture::new();
        fx.set_parse(Ok(profile(&["rust"], &[])));
        fx.set_jobs(Err(AppError::Provider {
            provider: None,
            message: "All job providers failed".to_string(),
        }));

        let err = fx
            .pipeline()
            .process_resume(Uuid::new_v4(), "resumes/u14.pdf")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Provider { .. }));
        assert_eq!(fx.deletes().len(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_failure_does_not_mask_success() {
        let fx = Fixture {
            assets: Arc::new(MockAssets {
                fail: true,
                ..MockAssets::default()
            }),
            ..Fixture::new()
        };
        fx.set_parse(Ok(profile(&["rust"], &[])));
        fx.set_jobs(Ok(vec![]));

        let report = fx
            .pipeline()
            .process_resume(Uuid::new_v4(), "resumes/u15.pdf")
            .await
            .unwrap();

        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, PipelineWarning::Cleanup { .. })));
        assert_eq!(fx.deletes().len(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_failure_does_not_mask_original_error() {
        let fx = Fixture {
            assets: Arc::new(MockAssets {
                fail: true,
                ..MockAssets::default()
            }),
            ..Fixture::new()
        };
        fx.set_parse(Ok(profile(&["rust"], &[])));
        fx.set_jobs(Ok(vec![posting("J1", "Role A")]));
        fx.set_matches(Err(AppError::Inference(
            "ML service internal error".to_string(),
        )));

        let err = fx
            .pipeline()
            .process_resume(Uuid::new_v4(), "resumes/u16.pdf")
            .await
            .unwrap_err();

        // The original inference error wins; the failed delete is logged only.
        assert!(matches!(err, AppError::Inference(_)));
        assert_eq!(fx.deletes().len(), 1);
    }
}
