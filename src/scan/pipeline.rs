use futures::future::join_all;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::db::ScanStore;
use crate::domain::validate_and_sanitize;
use crate::error::ScanError;
use crate::models::{Locale, NewReport, QueryResult, Report, ScanOptions, ScanStatus};
use crate::provider::{AiProvider, AiQueryRequest};

use super::analysis::analyze_response;
use super::discovery::discover_domain;
use super::recommendations::generate_recommendations;
use super::scoring::compute_metrics;

/// Number of (query, analysis) pairs in flight at once
pub const BATCH_SIZE: usize = 5;

/// Identifiers and contents of a completed scan
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub scan_id: String,
    pub report_id: String,
    pub report: Report,
}

/// Run a full scan for one domain.
///
/// Invalid input fails before anything is persisted or any provider call is
/// made. Once the scan record exists, any failure marks it `failed` and the
/// original error is returned unchanged, even if that status update fails.
pub async fn run_scan(
    raw_domain: &str,
    provider: &dyn AiProvider,
    store: &dyn ScanStore,
    locale: Locale,
    options: &ScanOptions,
) -> Result<PipelineResult, ScanError> {
    let domain = validate_and_sanitize(raw_domain)?;

    let scan = store
        .create_scan(&domain, ScanStatus::Running)
        .map_err(|e| ScanError::storage("Failed to create scan", e))?;

    info!(
        scan_id = %scan.id,
        domain = %domain,
        provider = provider.name(),
        query_count = options.query_count(),
        "Scan started"
    );
    let start = Instant::now();

    match execute(&domain, &scan.id, provider, store, locale, options).await {
        Ok(report) => {
            if let Err(e) = store.update_scan_status(&scan.id, ScanStatus::Completed) {
                warn!(
                    scan_id = %scan.id,
                    status = ScanStatus::Running.as_str(),
                    error = %e,
                    "Failed to mark scan completed, record left running"
                );
            }
            info!(
                scan_id = %scan.id,
                report_id = %report.id,
                score = report.metrics.visibility_score,
                duration_ms = start.elapsed().as_millis() as u64,
                "Scan completed"
            );
            Ok(PipelineResult {
                scan_id: scan.id,
                report_id: report.id.clone(),
                report,
            })
        }
        Err(err) => {
            error!(scan_id = %scan.id, domain = %domain, error = %err, "Scan failed");
            if let Err(e) = store.update_scan_status(&scan.id, ScanStatus::Failed) {
                warn!(scan_id = %scan.id, error = %e, "Failed to mark scan failed");
            }
            Err(err)
        }
    }
}

async fn execute(
    domain: &str,
    scan_id: &str,
    provider: &dyn AiProvider,
    store: &dyn ScanStore,
    locale: Locale,
    options: &ScanOptions,
) -> Result<Report, ScanError> {
    let discovery = discover_domain(
        domain,
        provider,
        locale,
        options.query_count(),
        &options.query_types,
    )
    .await?;

    let query_results = run_queries(domain, &discovery.queries, provider, locale).await?;

    let metrics = compute_metrics(&query_results, domain);
    debug!(scan_id = %scan_id, score = metrics.visibility_score, "Metrics computed");

    let recommendations = generate_recommendations(domain, &metrics, provider, locale).await?;

    store
        .insert_report(&NewReport {
            scan_id: scan_id.to_string(),
            domain: domain.to_string(),
            sector: discovery.sector,
            metrics,
            query_results,
            recommendations,
        })
        .map_err(|e| ScanError::storage("Failed to save report", e))
}

/// Ask one query, then judge the answer
async fn run_query(
    domain: &str,
    query: &str,
    provider: &dyn AiProvider,
    locale: Locale,
) -> Result<QueryResult, ScanError> {
    let answer = provider.query(&AiQueryRequest::new(query, domain)).await?;
    analyze_response(
        domain,
        query,
        &answer.content,
        &answer.sources,
        provider,
        locale,
    )
    .await
}

/// Execute and analyze every query in batches of [`BATCH_SIZE`].
///
/// The first failing pair aborts the remaining batches; scoring only ever
/// sees a complete set.
pub async fn run_queries(
    domain: &str,
    queries: &[String],
    provider: &dyn AiProvider,
    locale: Locale,
) -> Result<Vec<QueryResult>, ScanError> {
    let mut results = Vec::with_capacity(queries.len());

    for batch in queries.chunks(BATCH_SIZE) {
        let futures: Vec<_> = batch
            .iter()
            .map(|query| run_query(domain, query, provider, locale))
            .collect();

        for result in join_all(futures).await {
            results.push(result?);
        }
    }

    debug!(domain = %domain, total = results.len(), "Queries analyzed");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainError, ParseError, ProviderError, Stage};
    use crate::models::{QueryType, ScanDepth};
    use crate::testing::{MemoryStore, MockProvider, PromptKind};

    fn discovery_with(queries: usize) -> String {
        let queries: Vec<String> = (1..=queries).map(|i| format!("\"question {}\"", i)).collect();
        format!(
            r#"{{"sector": "SaaS", "competitors": ["rival.com"], "queries": [{}]}}"#,
            queries.join(",")
        )
    }

    #[tokio::test]
    async fn test_invalid_domain_has_no_side_effects() {
        let provider = MockProvider::new();
        let store = MemoryStore::new();

        let err = run_scan("not a domain!!!", &provider, &store, Locale::En, &ScanOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::Validation(DomainError::InvalidFormat)));
        assert_eq!(provider.call_count(), 0);
        assert_eq!(store.scan_count(), 0);
    }

    #[tokio::test]
    async fn test_scan_insert_failure_aborts_before_provider() {
        let provider = MockProvider::new();
        let store = MemoryStore::new().failing_scan_inserts();

        let err = run_scan("example.com", &provider, &store, Locale::En, &ScanOptions::default())
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("Failed to create scan"));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_call_sequence_per_query() {
        let provider = MockProvider::new();
        let store = MemoryStore::new();

        let result = run_scan("https://www.Example.com/", &provider, &store, Locale::En, &ScanOptions::default())
            .await
            .unwrap();

        assert_eq!(result.report.domain, "example.com");
        assert_eq!(provider.calls_of(PromptKind::Discovery), 1);
        assert_eq!(provider.calls_of(PromptKind::Answer), 2);
        assert_eq!(provider.calls_of(PromptKind::Analysis), 2);
        assert_eq!(provider.calls_of(PromptKind::Recommendations), 1);

        let answers: Vec<String> = provider
            .calls()
            .into_iter()
            .filter(|c| c.kind == PromptKind::Answer)
            .map(|c| c.request.query)
            .collect();
        assert_eq!(answers, vec!["What is example.com?", "example.com reviews"]);
    }

    #[tokio::test]
    async fn test_batches_cover_every_query_once() {
        let provider = MockProvider::new().with_discovery(discovery_with(12));
        let store = MemoryStore::new();
        let options = ScanOptions::new(ScanDepth::Deep, vec![QueryType::Commercial]);

        let result = run_scan("example.com", &provider, &store, Locale::En, &options)
            .await
            .unwrap();

        let mut queries: Vec<String> = result
            .report
            .query_results
            .iter()
            .map(|r| r.query.clone())
            .collect();
        queries.sort();
        let mut expected: Vec<String> = (1..=12).map(|i| format!("question {}", i)).collect();
        expected.sort();
        assert_eq!(queries, expected);
        assert_eq!(provider.calls_of(PromptKind::Analysis), 12);
    }

    #[tokio::test]
    async fn test_discovery_is_capped_by_depth() {
        let provider = MockProvider::new().with_discovery(discovery_with(12));
        let store = MemoryStore::new();
        let options = ScanOptions::new(ScanDepth::Quick, vec![]);

        let result = run_scan("example.com", &provider, &store, Locale::En, &options)
            .await
            .unwrap();

        assert_eq!(result.report.query_results.len(), 5);
    }

    #[tokio::test]
    async fn test_analysis_parse_failure_marks_scan_failed() {
        let provider = MockProvider::new().with_analysis("I could not decide.");
        let store = MemoryStore::new();

        let err = run_scan("example.com", &provider, &store, Locale::En, &ScanOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ScanError::Parse { stage: Stage::Analysis, source: ParseError::NoJson }
        ));
        assert_eq!(store.report_count(), 0);
        assert_eq!(provider.calls_of(PromptKind::Recommendations), 0);
    }

    #[tokio::test]
    async fn test_original_error_survives_failed_status_update() {
        let provider = MockProvider::new().failing_from_call(1);
        let store = MemoryStore::new().failing_status_updates();

        let err = run_scan("example.com", &provider, &store, Locale::En, &ScanOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::Provider(ProviderError::Api { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_failed_completion_update_still_returns_report() {
        let provider = MockProvider::new();
        let store = MemoryStore::new().failing_status_updates();

        let result = run_scan("example.com", &provider, &store, Locale::En, &ScanOptions::default())
            .await
            .unwrap();

        assert_eq!(store.report_count(), 1);
        assert_eq!(store.status_history(&result.scan_id), vec![ScanStatus::Running]);
    }

    #[tokio::test]
    async fn test_report_insert_failure_marks_scan_failed() {
        let provider = MockProvider::new();
        let store = MemoryStore::new().failing_report_inserts();

        let err = run_scan("example.com", &provider, &store, Locale::En, &ScanOptions::default())
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("Failed to save report"));
        let scans = store.scans();
        assert_eq!(scans.len(), 1);
        assert_eq!(
            store.status_history(&scans[0].id),
            vec![ScanStatus::Running, ScanStatus::Failed]
        );
    }

    #[tokio::test]
    async fn test_locale_reaches_every_prompt() {
        let provider = MockProvider::new();
        let store = MemoryStore::new();

        run_scan("example.com", &provider, &store, Locale::Fr, &ScanOptions::default())
            .await
            .unwrap();

        for call in provider.calls() {
            if call.kind != PromptKind::Answer {
                assert!(call.request.query.contains("French"), "{:?} prompt lacks locale", call.kind);
            }
        }
    }
}
