//! Testing utilities including mock implementations.
//!
//! These let the scan pipeline run end to end without a real AI backend
//! or a database file.

use async_trait::async_trait;
use std::sync::{Mutex, RwLock};

use crate::db::{new_id, timestamp, ScanStore};
use crate::error::{ProviderError, StoreError};
use crate::models::*;
use crate::provider::{AiProvider, AiQueryRequest, AiQueryResponse};

/// Which pipeline step a prompt belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Discovery,
    Answer,
    Analysis,
    Recommendations,
}

impl PromptKind {
    /// Classify a prompt by the opening the pipeline's prompt builders use
    pub fn classify(prompt: &str) -> Self {
        if prompt.starts_with("Analyze the website") {
            Self::Discovery
        } else if prompt.starts_with("Analyze the following AI response") {
            Self::Analysis
        } else if prompt.starts_with("You are an AI visibility expert") {
            Self::Recommendations
        } else {
            Self::Answer
        }
    }
}

/// Record of a call made to the mock provider.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub kind: PromptKind,
    pub request: AiQueryRequest,
}

/// A mock provider with scripted, deterministic answers per prompt kind.
pub struct MockProvider {
    discovery: String,
    answer: String,
    answer_sources: Vec<String>,
    analysis: String,
    recommendations: String,
    fail_from_call: Option<usize>,
    calls: Mutex<Vec<MockCall>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub const NAME: &'static str = "mock";

    pub fn new() -> Self {
        Self {
            discovery: r#"{"sector": "SaaS", "competitors": ["rival.com"], "queries": ["What is example.com?", "example.com reviews"]}"#.to_string(),
            answer: "Example.com is a great platform for building websites.".to_string(),
            answer_sources: vec!["https://wiki.com".to_string()],
            analysis: r#"{"isPresent": true, "rank": 1, "sentiment": "positive", "competitors": ["rival.com"], "context": "Example.com is a great platform"}"#.to_string(),
            recommendations: r#"[{"title": "Improve content", "description": "Create authoritative content.", "priority": "high"}]"#.to_string(),
            fail_from_call: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_discovery(mut self, content: impl Into<String>) -> Self {
        self.discovery = content.into();
        self
    }

    pub fn with_answer(mut self, content: impl Into<String>, sources: &[&str]) -> Self {
        self.answer = content.into();
        self.answer_sources = sources.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_analysis(mut self, content: impl Into<String>) -> Self {
        self.analysis = content.into();
        self
    }

    pub fn with_recommendations(mut self, content: impl Into<String>) -> Self {
        self.recommendations = content.into();
        self
    }

    /// Fail every call numbered `n` or later (1-based)
    pub fn failing_from_call(mut self, n: usize) -> Self {
        self.fail_from_call = Some(n);
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    pub fn calls_of(&self, kind: PromptKind) -> usize {
        self.calls().iter().filter(|c| c.kind == kind).count()
    }
}

#[async_trait]
impl AiProvider for MockProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn query(&self, request: &AiQueryRequest) -> Result<AiQueryResponse, ProviderError> {
        let kind = PromptKind::classify(&request.query);
        let call_number = {
            let mut calls = self
                .calls
                .lock()
                .map_err(|_| ProviderError::Network("mock call log poisoned".into()))?;
            calls.push(MockCall {
                kind,
                request: request.clone(),
            });
            calls.len()
        };

        if self.fail_from_call.is_some_and(|n| call_number >= n) {
            return Err(ProviderError::Api {
                provider: Self::NAME.to_string(),
                status: 500,
                reason: "Internal Server Error".to_string(),
            });
        }

        let (content, sources) = match kind {
            PromptKind::Discovery => (self.discovery.clone(), Vec::new()),
            PromptKind::Answer => (self.answer.clone(), self.answer_sources.clone()),
            PromptKind::Analysis => (self.analysis.clone(), Vec::new()),
            PromptKind::Recommendations => (self.recommendations.clone(), Vec::new()),
        };

        Ok(AiQueryResponse {
            content,
            sources,
            provider: Self::NAME.to_string(),
        })
    }
}

/// In-memory `ScanStore` with failure injection.
///
/// Every status a scan passes through is logged so tests can assert on
/// the full transition sequence.
#[derive(Default)]
pub struct MemoryStore {
    scans: RwLock<Vec<Scan>>,
    reports: RwLock<Vec<Report>>,
    status_log: RwLock<Vec<(String, ScanStatus)>>,
    fail_scan_inserts: bool,
    fail_report_inserts: bool,
    fail_status_updates: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_scan_inserts(mut self) -> Self {
        self.fail_scan_inserts = true;
        self
    }

    pub fn failing_report_inserts(mut self) -> Self {
        self.fail_report_inserts = true;
        self
    }

    pub fn failing_status_updates(mut self) -> Self {
        self.fail_status_updates = true;
        self
    }

    pub fn scans(&self) -> Vec<Scan> {
        self.scans.read().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn scan_count(&self) -> usize {
        self.scans.read().map(|s| s.len()).unwrap_or_default()
    }

    pub fn report_count(&self) -> usize {
        self.reports.read().map(|r| r.len()).unwrap_or_default()
    }

    /// Statuses the scan has held, in order
    pub fn status_history(&self, scan_id: &str) -> Vec<ScanStatus> {
        self.status_log
            .read()
            .map(|log| {
                log.iter()
                    .filter(|(id, _)| id == scan_id)
                    .map(|(_, status)| *status)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn log_status(&self, scan_id: &str, status: ScanStatus) -> Result<(), StoreError> {
        self.status_log
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .push((scan_id.to_string(), status));
        Ok(())
    }
}

impl ScanStore for MemoryStore {
    fn create_scan(&self, domain: &str, status: ScanStatus) -> Result<Scan, StoreError> {
        if self.fail_scan_inserts {
            return Err(StoreError::Injected("scan insert".into()));
        }
        let now = timestamp();
        let scan = Scan {
            id: new_id(),
            domain: domain.to_string(),
            status,
            created_at: now.clone(),
            updated_at: now,
        };
        self.scans
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .push(scan.clone());
        self.log_status(&scan.id, status)?;
        Ok(scan)
    }

    fn update_scan_status(&self, scan_id: &str, status: ScanStatus) -> Result<(), StoreError> {
        if self.fail_status_updates {
            return Err(StoreError::Injected("status update".into()));
        }
        {
            let mut scans = self.scans.write().map_err(|_| StoreError::Poisoned)?;
            let scan = scans
                .iter_mut()
                .find(|s| s.id == scan_id)
                .ok_or_else(|| StoreError::NotFound(scan_id.to_string()))?;
            scan.status = status;
            scan.updated_at = timestamp();
        }
        self.log_status(scan_id, status)
    }

    fn get_scan(&self, scan_id: &str) -> Result<Option<Scan>, StoreError> {
        let scans = self.scans.read().map_err(|_| StoreError::Poisoned)?;
        Ok(scans.iter().find(|s| s.id == scan_id).cloned())
    }

    fn insert_report(&self, report: &NewReport) -> Result<Report, StoreError> {
        if self.fail_report_inserts {
            return Err(StoreError::Injected("report insert".into()));
        }
        let stored = Report {
            id: new_id(),
            scan_id: report.scan_id.clone(),
            domain: report.domain.clone(),
            sector: report.sector.clone(),
            metrics: report.metrics.clone(),
            query_results: report.query_results.clone(),
            recommendations: report.recommendations.clone(),
            created_at: timestamp(),
        };
        self.reports
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .push(stored.clone());
        Ok(stored)
    }

    fn get_report(&self, report_id: &str) -> Result<Option<Report>, StoreError> {
        let reports = self.reports.read().map_err(|_| StoreError::Poisoned)?;
        Ok(reports.iter().find(|r| r.id == report_id).cloned())
    }

    fn list_history(
        &self,
        domain: Option<&str>,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, StoreError> {
        let reports = self.reports.read().map_err(|_| StoreError::Poisoned)?;
        Ok(reports
            .iter()
            .rev()
            .filter(|r| domain.map_or(true, |d| r.domain == d))
            .take(limit)
            .map(|r| HistoryEntry {
                scan_id: r.scan_id.clone(),
                report_id: r.id.clone(),
                domain: r.domain.clone(),
                score: r.metrics.visibility_score,
                created_at: r.created_at.clone(),
            })
            .collect())
    }
}
