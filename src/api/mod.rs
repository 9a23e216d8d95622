//! HTTP API handlers and router.
//!
//! Every widget endpoint parses its own query parameters leniently: a
//! malformed `week`, `year` or `weeks` falls back to the default
//! instead of rejecting the request. The widgets treat any non-2xx as
//! a failed fetch, so the server never turns a bad parameter into a
//! broken dashboard.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{RawQuery, State},
    routing::get,
    Json, Router,
};
use chrono::Local;
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};
use url::form_urlencoded;

use crate::model::{AlarmSplit, KpiCounts, TestingKpis, WeeklyMetrics};
use crate::scope::{self, iso_week_and_year, weeks_in_iso_year};
use crate::store::MetricsStore;
use crate::ui;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MetricsStore>,
    pub warning_limit: usize,
    pub started: Instant,
}

impl AppState {
    pub fn new(store: MetricsStore, warning_limit: usize) -> Self {
        Self {
            store: Arc::new(store),
            warning_limit,
            started: Instant::now(),
        }
    }
}

/// Build the full application router. Kept separate from `main` so
/// integration tests can drive it with `tower::ServiceExt::oneshot`.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/api/status", get(status_handler))
        // Dashboard widget data
        .route("/api/dashboard/kpi_counts", get(kpi_counts_handler))
        .route("/api/dashboard/weekly_metrics", get(weekly_metrics_handler))
        .route("/api/dashboard/alarm_split", get(alarm_split_handler))
        // Testing KPIs
        .route("/api/testing/kpis", get(testing_kpis_handler))
        // Server-rendered pages
        .route("/", get(ui::dashboard_page))
        .route("/testing", get(ui::testing_page))
        // Client wasm bundle and other static assets
        .nest_service("/static", ServeDir::new("static"))
        // Middleware
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn params(query: &Option<String>) -> Vec<(String, String)> {
    form_urlencoded::parse(query.as_deref().unwrap_or("").as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn param<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.trim())
}

/// `weeks` for weekly_metrics: default 12, anything below 1 resets to
/// the default, anything above 52 clamps to 52.
pub fn metrics_weeks(raw: Option<&str>) -> u32 {
    match raw.and_then(|v| v.parse::<i64>().ok()) {
        Some(n) if n >= 1 => n.min(52) as u32,
        _ => 12,
    }
}

/// `weeks` for testing KPIs: default 12, clamped into 4..=52.
pub fn testing_weeks(raw: Option<&str>) -> u32 {
    match raw.and_then(|v| v.parse::<i64>().ok()) {
        Some(n) => n.clamp(4, 52) as u32,
        None => 12,
    }
}

/// General status response
#[derive(Serialize)]
pub struct StatusResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub records: usize,
}

/// GET /api/status - Service health check
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        service: "cbm-dashboard",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started.elapsed().as_secs(),
        records: state.store.len(),
    })
}

/// GET /api/dashboard/kpi_counts?scope&week&year - KPI counter block.
pub async fn kpi_counts_handler(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Json<KpiCounts> {
    let today = Local::now().date_naive();
    let active = scope::parse(query.as_deref().unwrap_or(""), None, None, today);
    Json(state.store.kpi_counts(active))
}

/// GET /api/dashboard/weekly_metrics?weeks&basis - Trailing-weeks
/// series. `basis` is accepted for forward compatibility; grouping for
/// the planner-week series is fixed and the done-week view is always
/// present as `corrected_by_done`.
pub async fn weekly_metrics_handler(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Json<WeeklyMetrics> {
    let pairs = params(&query);
    let weeks = metrics_weeks(param(&pairs, "weeks"));
    let today = Local::now().date_naive();
    Json(state.store.weekly_metrics(weeks, today))
}

/// GET /api/dashboard/alarm_split?week&year - Critical-vs-warning
/// split. Missing or malformed week params default to the current
/// week; `scope=all` switches to the all-time split.
pub async fn alarm_split_handler(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Json<AlarmSplit> {
    let pairs = params(&query);
    if matches!(
        param(&pairs, "scope").map(str::to_ascii_lowercase).as_deref(),
        Some("all" | "all-time" | "alltime" | "overall" | "total")
    ) {
        return Json(state.store.alarm_split_all());
    }

    let today = Local::now().date_naive();
    let (cur_year, cur_week) = iso_week_and_year(today);
    let year = param(&pairs, "year")
        .and_then(|v| v.parse::<i32>().ok())
        .unwrap_or(cur_year);
    let week = param(&pairs, "week")
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|&w| w >= 1 && w <= weeks_in_iso_year(year))
        .unwrap_or(cur_week);
    Json(state.store.alarm_split(week, year))
}

/// GET /api/testing/kpis?type&weeks - KPIs for one testing discipline.
pub async fn testing_kpis_handler(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Json<TestingKpis> {
    let pairs = params(&query);
    let test_type = param(&pairs, "type").unwrap_or("");
    let weeks = testing_weeks(param(&pairs, "weeks"));
    let today = Local::now().date_naive();
    Json(state.store.testing_kpis(test_type, weeks, today))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_weeks_defaults_and_clamps() {
        assert_eq!(metrics_weeks(None), 12);
        assert_eq!(metrics_weeks(Some("abc")), 12);
        assert_eq!(metrics_weeks(Some("0")), 12);
        assert_eq!(metrics_weeks(Some("-3")), 12);
        assert_eq!(metrics_weeks(Some("8")), 8);
        assert_eq!(metrics_weeks(Some("99")), 52);
    }

    #[test]
    fn testing_weeks_clamps_into_range() {
        assert_eq!(testing_weeks(None), 12);
        assert_eq!(testing_weeks(Some("abc")), 12);
        assert_eq!(testing_weeks(Some("1")), 4);
        assert_eq!(testing_weeks(Some("26")), 26);
        assert_eq!(testing_weeks(Some("500")), 52);
    }
}
