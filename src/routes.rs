use rocket::http::{CookieJar, Status};
use rocket::serde::json::Json;
use rocket::{get, post, routes, Build, Rocket, Route, State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use crate::config::Config;
use crate::db::{ScanStore, HISTORY_LIMIT};
use crate::domain::validate_and_sanitize;
use crate::error::ProviderError;
use crate::models::*;
use crate::provider::{create_provider, AiProvider};
use crate::scan::{run_scan, source_breakdown};

/// Cookie carrying the UI language
pub const LOCALE_COOKIE: &str = "trackai-locale";

/// Number of hosts listed in a source breakdown
const TOP_SOURCE_DOMAINS: usize = 15;

const SCAN_FAILED: &str = "Scan failed. Please try again later.";

/// Shared state for every request
pub struct AppState {
    store: Arc<dyn ScanStore>,
    config: Config,
    provider: Option<Arc<dyn AiProvider>>,
}

impl AppState {
    pub fn new(store: Arc<dyn ScanStore>, config: Config) -> Self {
        Self {
            store,
            config,
            provider: None,
        }
    }

    /// Use a fixed provider instead of building one from the config per scan
    pub fn with_provider(mut self, provider: Arc<dyn AiProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    fn provider(&self) -> Result<Arc<dyn AiProvider>, ProviderError> {
        match &self.provider {
            Some(provider) => Ok(Arc::clone(provider)),
            None => create_provider(&self.config),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    #[serde(default)]
    pub domain: String,
    pub depth: Option<ScanDepth>,
    pub query_types: Option<Vec<QueryType>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub scan_id: String,
    pub report_id: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

type ApiError = (Status, Json<ErrorBody>);

fn api_error(status: Status, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

fn request_locale(cookies: &CookieJar<'_>) -> Locale {
    cookies
        .get(LOCALE_COOKIE)
        .and_then(|c| c.value().parse().ok())
        .unwrap_or_default()
}

// =====================
// JSON API Routes
// =====================

#[post("/scan", format = "json", data = "<request>")]
pub async fn api_scan(
    request: Json<ScanRequest>,
    cookies: &CookieJar<'_>,
    state: &State<AppState>,
) -> Result<Json<ScanResponse>, ApiError> {
    let domain = validate_and_sanitize(&request.domain)
        .map_err(|e| api_error(Status::BadRequest, e.to_string()))?;

    let locale = request_locale(cookies);
    let options = ScanOptions::new(
        request.depth.unwrap_or_default(),
        request.query_types.clone().unwrap_or_default(),
    );

    let provider = state.provider().map_err(|e| {
        error!(error = %e, "Failed to create AI provider");
        api_error(Status::InternalServerError, SCAN_FAILED)
    })?;

    let result = run_scan(&domain, provider.as_ref(), state.store.as_ref(), locale, &options)
        .await
        .map_err(|e| {
            error!(domain = %domain, error = %e, "Scan request failed");
            api_error(Status::InternalServerError, SCAN_FAILED)
        })?;

    Ok(Json(ScanResponse {
        scan_id: result.scan_id,
        report_id: result.report_id,
    }))
}

/// Get a stored report
#[get("/report/<id>")]
pub fn api_report(id: &str, state: &State<AppState>) -> Result<Json<Report>, ApiError> {
    load_report(id, state).map(Json)
}

/// Get the hosts cited across a report's answers
#[get("/report/<id>/sources")]
pub fn api_report_sources(
    id: &str,
    state: &State<AppState>,
) -> Result<Json<SourceBreakdown>, ApiError> {
    let report = load_report(id, state)?;
    Ok(Json(source_breakdown(&report.query_results, TOP_SOURCE_DOMAINS)))
}

/// Get recent reports, newest first
#[get("/history?<domain>")]
pub fn api_history(
    domain: Option<String>,
    state: &State<AppState>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let domain = domain
        .map(|d| d.trim().to_lowercase())
        .filter(|d| !d.is_empty());

    state
        .store
        .list_history(domain.as_deref(), HISTORY_LIMIT)
        .map(Json)
        .map_err(|e| {
            error!(error = %e, "Failed to list history");
            api_error(Status::InternalServerError, "Failed to load history")
        })
}

fn load_report(id: &str, state: &AppState) -> Result<Report, ApiError> {
    match state.store.get_report(id) {
        Ok(Some(report)) => Ok(report),
        Ok(None) => Err(api_error(Status::NotFound, "Report not found")),
        Err(e) => {
            error!(report_id = %id, error = %e, "Failed to load report");
            Err(api_error(Status::InternalServerError, "Failed to load report"))
        }
    }
}

pub fn api_routes() -> Vec<Route> {
    routes![api_scan, api_report, api_report_sources, api_history]
}

/// Assemble the server with its state and routes
pub fn build_rocket(state: AppState) -> Rocket<Build> {
    rocket::build().manage(state).mount("/api", api_routes())
}
