//! Per-widget data retrieval.
//!
//! Each widget has its own fetcher: given the active scope it builds the
//! endpoint URL, performs the request and resolves to a [`FetchResult`].
//! Failures (network, non-2xx, malformed JSON) become
//! [`FetchResult::Failed`] values, never errors that cross the fetcher
//! boundary, so one widget's failure can never block or corrupt a
//! sibling's render.

use serde::Deserialize;

use crate::model::{AlarmSplit, KpiCounts, TestingKpis, WarningRow, WeeklyMetrics};
use crate::scope::Scope;

/// Discriminated fetch outcome. `Failed` carries the reason for the log
/// line only; callers degrade to a default payload instead of surfacing
/// it.
#[derive(Clone, Debug, PartialEq)]
pub enum FetchResult<T> {
    Ok(T),
    Failed(String),
}

impl<T> FetchResult<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            FetchResult::Ok(value) => Some(value),
            FetchResult::Failed(_) => None,
        }
    }
}

impl<T: Default> FetchResult<T> {
    /// The payload, or the widget's safe empty state on failure.
    pub fn unwrap_or_default(self) -> T {
        match self {
            FetchResult::Ok(value) => value,
            FetchResult::Failed(_) => T::default(),
        }
    }
}

impl<T> From<Result<T, String>> for FetchResult<T> {
    fn from(result: Result<T, String>) -> Self {
        match result {
            Ok(value) => FetchResult::Ok(value),
            Err(reason) => FetchResult::Failed(reason),
        }
    }
}

/// Widget identity; keys a widget's descriptor and its chart adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    KpiCounts,
    AlarmSplit,
    Trend12w,
    WarnCorrected,
    WarningLongest,
}

/// Static per-widget configuration: which rendering surface it owns,
/// whether a scope change can be patched client-side or needs the
/// server-rendered sections (and therefore a full navigation), and
/// whether the surface is a chart canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WidgetDescriptor {
    pub kind: WidgetKind,
    pub surface_id: &'static str,
    pub client_refresh: bool,
    pub chart: bool,
}

/// The dashboard's widget set. KPI counters and the alarm donut are
/// scope-keyed and client-refreshable; the trailing-weeks charts are
/// scope-independent; the board table is server-rendered and only
/// changes via navigation. Adapter construction and the scope-refresh
/// fan-out are both driven from this table.
pub const WIDGETS: &[WidgetDescriptor] = &[
    WidgetDescriptor {
        kind: WidgetKind::KpiCounts,
        surface_id: "kpi-cards",
        client_refresh: true,
        chart: false,
    },
    WidgetDescriptor {
        kind: WidgetKind::AlarmSplit,
        surface_id: "alarmDonut",
        client_refresh: true,
        chart: true,
    },
    WidgetDescriptor {
        kind: WidgetKind::Trend12w,
        surface_id: "trend12w",
        client_refresh: false,
        chart: true,
    },
    WidgetDescriptor {
        kind: WidgetKind::WarnCorrected,
        surface_id: "warnCorrectedStack",
        client_refresh: false,
        chart: true,
    },
    WidgetDescriptor {
        kind: WidgetKind::WarningLongest,
        surface_id: "warningLongestBar",
        client_refresh: false,
        chart: true,
    },
];

/// The widgets a scope change refreshes in place.
pub fn client_refresh_widgets() -> impl Iterator<Item = &'static WidgetDescriptor> {
    WIDGETS.iter().filter(|w| w.client_refresh)
}

// =============================================================================
// Endpoint URL builders
// =============================================================================

pub fn kpi_counts_url(scope: Scope) -> String {
    format!("/api/dashboard/kpi_counts?{}", crate::scope::encode(scope))
}

/// All-time alarm split omits the week params entirely; the server then
/// falls back to the current week, matching the board it sits next to.
pub fn alarm_split_url(scope: Scope) -> String {
    match scope.week_year() {
        Some((week, year)) => format!("/api/dashboard/alarm_split?week={week}&year={year}"),
        None => "/api/dashboard/alarm_split".to_string(),
    }
}

pub fn weekly_metrics_url(weeks: u32, basis: Option<&str>) -> String {
    match basis {
        Some(basis) => format!(
            "/api/dashboard/weekly_metrics?weeks={weeks}&basis={}",
            urlencoding::encode(basis)
        ),
        None => format!("/api/dashboard/weekly_metrics?weeks={weeks}"),
    }
}

pub fn testing_kpis_url(test_type: &str, weeks: u32) -> String {
    format!(
        "/api/testing/kpis?type={}&weeks={weeks}",
        urlencoding::encode(test_type)
    )
}

// =============================================================================
// Widget fetchers
// =============================================================================

pub async fn fetch_kpi_counts(scope: Scope) -> FetchResult<KpiCounts> {
    fetch_json(&kpi_counts_url(scope)).await.into()
}

pub async fn fetch_alarm_split(scope: Scope) -> FetchResult<AlarmSplit> {
    fetch_json(&alarm_split_url(scope)).await.into()
}

pub async fn fetch_weekly_metrics(weeks: u32, basis: Option<&str>) -> FetchResult<WeeklyMetrics> {
    fetch_json(&weekly_metrics_url(weeks, basis)).await.into()
}

pub async fn fetch_testing_kpis(test_type: &str, weeks: u32) -> FetchResult<TestingKpis> {
    fetch_json(&testing_kpis_url(test_type, weeks)).await.into()
}

/// Parse the longest-open-warnings payload embedded in the page.
///
/// Not fetched: the server inlines the rows as JSON text content. The
/// same fail-safe policy applies; anything malformed becomes an empty
/// list.
pub fn parse_embedded_warnings(raw: &str) -> Vec<WarningRow> {
    serde_json::from_str(raw).unwrap_or_default()
}

// =============================================================================
// Transport
// =============================================================================

/// Fetch JSON from a URL (client-side only). Resolves to `Err` on any
/// HTTP-level or decode failure; callers convert that into
/// [`FetchResult::Failed`].
#[cfg(target_arch = "wasm32")]
pub async fn fetch_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T, String> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{Request, RequestInit, Response};

    let window = web_sys::window().ok_or("No window")?;
    let opts = RequestInit::new();
    opts.set_method("GET");

    let request = Request::new_with_str_and_init(url, &opts).map_err(|e| format!("{:?}", e))?;

    let resp_value = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(|e| format!("{:?}", e))?;

    let resp: Response = resp_value.dyn_into().map_err(|_| "Not a Response")?;
    if !resp.ok() {
        return Err(format!("HTTP {} for {}", resp.status(), url));
    }

    let json = JsFuture::from(resp.json().map_err(|e| format!("{:?}", e))?)
        .await
        .map_err(|e| format!("{:?}", e))?;

    serde_wasm_bindgen::from_value(json).map_err(|e| format!("{:?}", e))
}

/// SSR stub - returns error (should not be called during SSR)
#[cfg(not(target_arch = "wasm32"))]
pub async fn fetch_json<T: for<'de> Deserialize<'de>>(_url: &str) -> Result<T, String> {
    Err("fetch_json is only available in browser".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kpi_url_for_each_scope() {
        assert_eq!(
            kpi_counts_url(Scope::Weekly { week: 12, year: 2024 }),
            "/api/dashboard/kpi_counts?scope=weekly&week=12&year=2024"
        );
        assert_eq!(
            kpi_counts_url(Scope::AllTime),
            "/api/dashboard/kpi_counts?scope=all"
        );
    }

    #[test]
    fn alarm_split_url_omits_params_for_all_time() {
        assert_eq!(
            alarm_split_url(Scope::Weekly { week: 3, year: 2025 }),
            "/api/dashboard/alarm_split?week=3&year=2025"
        );
        assert_eq!(alarm_split_url(Scope::AllTime), "/api/dashboard/alarm_split");
    }

    #[test]
    fn weekly_metrics_url_with_basis() {
        assert_eq!(
            weekly_metrics_url(12, None),
            "/api/dashboard/weekly_metrics?weeks=12"
        );
        assert_eq!(
            weekly_metrics_url(12, Some("done")),
            "/api/dashboard/weekly_metrics?weeks=12&basis=done"
        );
    }

    #[test]
    fn embedded_warnings_fail_safe_to_empty() {
        assert!(parse_embedded_warnings("").is_empty());
        assert!(parse_embedded_warnings("not json").is_empty());
        assert!(parse_embedded_warnings(r#"{"rows": 1}"#).is_empty());

        let rows = parse_embedded_warnings(
            r#"[{"equipment":"Mill 4","department":"Grinding","days_open":21,"open_count":2}]"#,
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].equipment, "Mill 4");
        assert_eq!(rows[0].days_open, 21);
        assert_eq!(rows[0].first_warning_date, "");
    }

    #[test]
    fn widget_table_is_consistent() {
        let mut surfaces: Vec<_> = WIDGETS.iter().map(|w| w.surface_id).collect();
        surfaces.sort_unstable();
        surfaces.dedup();
        assert_eq!(surfaces.len(), WIDGETS.len(), "surface ids must be unique");

        let mut kinds: Vec<_> = WIDGETS.iter().map(|w| w.kind).collect();
        kinds.dedup();
        assert_eq!(kinds.len(), WIDGETS.len(), "each widget appears once");
    }

    #[test]
    fn scope_keyed_widgets_are_the_client_refresh_set() {
        let kinds: Vec<_> = client_refresh_widgets().map(|w| w.kind).collect();
        assert_eq!(kinds, vec![WidgetKind::KpiCounts, WidgetKind::AlarmSplit]);
        // The KPI grid is not a canvas; every other widget renders a chart.
        assert!(WIDGETS
            .iter()
            .all(|w| w.chart == (w.kind != WidgetKind::KpiCounts)));
    }

    #[test]
    fn failed_result_degrades_to_default() {
        let failed: FetchResult<crate::model::KpiCounts> =
            FetchResult::Failed("HTTP 500".into());
        assert_eq!(failed.unwrap_or_default(), crate::model::KpiCounts::default());
    }
}
