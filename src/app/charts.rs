//! Chart lifecycle and dataset shaping.
//!
//! [`ChartAdapter`] owns the binding between one widget's data and its
//! canvas. A live render is held as a [`RenderHandle`] whose `Drop`
//! destroys the underlying chart, so replacing a render structurally
//! releases the previous one first and two renders can never be
//! attached to the same surface. Dataset shaping (zero-filling, stacking,
//! colors) is pure and lives apart from the `wasm32` plumbing.

use serde::Serialize;
use serde_json::{json, Value};

use crate::model::{AlarmSplit, TestingKpis, WarningRow, WeeklyMetrics};

/// Chart.js configuration for one render: type, data, options.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub data: Value,
    pub options: Value,
}

/// Pad or truncate a series so it is position-aligned with a label axis
/// of length `len`. The server may omit a series entirely; rendering a
/// shorter array would shift stacking and bar widths.
pub fn zero_fill(series: &[u64], len: usize) -> Vec<u64> {
    let mut out = Vec::with_capacity(len);
    out.extend(series.iter().take(len).copied());
    out.resize(len, 0);
    out
}

/// Planned / completed / waived line chart over the trailing weeks.
pub fn trend_spec(metrics: &WeeklyMetrics) -> ChartSpec {
    let len = metrics.labels.len();
    ChartSpec {
        kind: "line",
        data: json!({
            "labels": metrics.labels,
            "datasets": [
                { "label": "Planned", "data": zero_fill(&metrics.planned, len),
                  "borderColor": "#2563eb", "backgroundColor": "rgba(37,99,235,0.12)",
                  "borderWidth": 2, "pointRadius": 2, "tension": 0.3, "fill": false },
                { "label": "Completed", "data": zero_fill(&metrics.completed, len),
                  "borderColor": "#16a34a", "backgroundColor": "rgba(22,163,74,0.15)",
                  "borderWidth": 3, "pointRadius": 2, "tension": 0.3, "fill": true },
                { "label": "Waived", "data": zero_fill(&metrics.waived, len),
                  "borderColor": "#64748b", "backgroundColor": "rgba(100,116,139,0.15)",
                  "borderWidth": 2, "pointRadius": 2, "tension": 0.3, "fill": false },
            ]
        }),
        options: json!({
            "responsive": true,
            "maintainAspectRatio": false,
            "interaction": { "mode": "index", "intersect": false },
            "plugins": { "legend": { "display": true, "position": "bottom" } },
            "scales": { "x": { "grid": { "display": false } }, "y": { "beginAtZero": true } }
        }),
    }
}

/// Critical-vs-warning doughnut for the active scope.
pub fn alarm_donut_spec(split: &AlarmSplit) -> ChartSpec {
    ChartSpec {
        kind: "doughnut",
        data: json!({
            "labels": ["Critical", "Warning"],
            "datasets": [{
                "data": [split.critical, split.warning],
                "backgroundColor": ["#dc2626", "#f59e0b"],
                "borderWidth": 0
            }]
        }),
        options: json!({
            "responsive": false,
            "plugins": { "legend": { "display": false } },
            "cutout": "60%"
        }),
    }
}

/// Stacked alarms (critical + warning) against corrected counts, with
/// actual-week corrections as a line on top.
pub fn warn_corrected_spec(metrics: &WeeklyMetrics) -> ChartSpec {
    let len = metrics.labels.len();
    let critical = zero_fill(&metrics.alarms.critical, len);
    let warning = zero_fill(&metrics.alarms.warning, len);
    let warnings_closed = zero_fill(&metrics.warnings_closed, len);
    let criticals_closed = zero_fill(&metrics.criticals_closed, len);
    let corrected: Vec<u64> = warnings_closed
        .iter()
        .zip(&criticals_closed)
        .map(|(w, c)| w + c)
        .collect();
    let corrected_by_done = zero_fill(&metrics.corrected_by_done, len);

    ChartSpec {
        kind: "bar",
        data: json!({
            "labels": metrics.labels,
            "datasets": [
                { "label": "Critical", "data": critical, "backgroundColor": "#ad0404",
                  "borderWidth": 0, "stack": "alarms",
                  "categoryPercentage": 0.7, "barPercentage": 0.8 },
                { "label": "Warning", "data": warning, "backgroundColor": "#f73f3f",
                  "borderWidth": 0, "stack": "alarms",
                  "categoryPercentage": 0.7, "barPercentage": 0.8 },
                { "label": "Corrected from Alarms", "data": corrected,
                  "backgroundColor": "#16a34a", "borderWidth": 0, "stack": "corrected",
                  "categoryPercentage": 0.7, "barPercentage": 0.8 },
                { "label": "Corrected (Actual Week)", "data": corrected_by_done,
                  "type": "line", "borderColor": "#059669",
                  "backgroundColor": "rgba(5,150,105,0.1)", "fill": false,
                  "tension": 0.25, "pointRadius": 3, "borderWidth": 2, "order": 999 },
            ]
        }),
        options: json!({
            "responsive": true,
            "maintainAspectRatio": false,
            "plugins": {
                "legend": { "display": true, "position": "bottom" },
                "tooltip": { "mode": "index", "intersect": false }
            },
            "scales": {
                "x": { "stacked": true, "grid": { "display": false } },
                "y": { "stacked": true, "beginAtZero": true }
            }
        }),
    }
}

/// Horizontal bars for the longest-open warnings. Returns `None` for an
/// empty dataset; the caller falls back to the tabular rendering
/// instead of painting an empty chart.
pub fn warning_bar_spec(rows: &[WarningRow]) -> Option<ChartSpec> {
    if rows.is_empty() {
        return None;
    }
    let labels: Vec<String> = rows
        .iter()
        .map(|r| format!("{} ({})", r.equipment, r.department))
        .collect();
    let days: Vec<u64> = rows.iter().map(|r| r.days_open).collect();
    let open_counts: Vec<u64> = rows.iter().map(|r| r.open_count).collect();

    Some(ChartSpec {
        kind: "bar",
        data: json!({
            "labels": labels,
            "datasets": [
                { "label": "Days Open", "data": days,
                  "backgroundColor": "#f59e0b", "borderWidth": 0 },
                { "label": "Open Count", "data": open_counts,
                  "backgroundColor": "#0ea5e9", "borderWidth": 0 },
            ]
        }),
        options: json!({
            "indexAxis": "y",
            "responsive": false,
            "scales": {
                "x": { "beginAtZero": true, "grid": { "display": true } },
                "y": { "grid": { "display": false } }
            },
            "plugins": {
                "legend": { "display": true, "position": "bottom" },
                "tooltip": { "enabled": true }
            }
        }),
    })
}

/// Completed-tests trend line for the testing KPIs page.
pub fn testing_trend_spec(kpis: &TestingKpis) -> ChartSpec {
    let len = kpis.labels.len().max(kpis.trend.len());
    ChartSpec {
        kind: "line",
        data: json!({
            "labels": if kpis.labels.is_empty() {
                (1..=len).map(|i| format!("W{i}")).collect::<Vec<_>>()
            } else {
                kpis.labels.clone()
            },
            "datasets": [
                { "label": "Completed", "data": kpis.trend,
                  "borderColor": "#16a34a", "backgroundColor": "rgba(22,163,74,0.15)",
                  "borderWidth": 2, "pointRadius": 2, "tension": 0.3, "fill": true },
            ]
        }),
        options: json!({
            "responsive": true,
            "maintainAspectRatio": false,
            "plugins": { "legend": { "display": false } },
            "scales": { "x": { "grid": { "display": false } }, "y": { "beginAtZero": true } }
        }),
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm::*;

#[cfg(target_arch = "wasm32")]
mod wasm {
    use super::ChartSpec;
    use crate::model::WarningRow;

    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use web_sys::HtmlCanvasElement;

    #[wasm_bindgen]
    extern "C" {
        /// Global `Chart` constructor from the Chart.js bundle loaded by
        /// the page layout.
        #[wasm_bindgen(js_name = Chart)]
        type ChartJs;

        #[wasm_bindgen(constructor, js_class = "Chart")]
        fn new(canvas: &HtmlCanvasElement, config: &JsValue) -> ChartJs;

        #[wasm_bindgen(method)]
        fn destroy(this: &ChartJs);
    }

    /// Whether the charting library made it onto the page. When it did
    /// not, list widgets fall back to tabular rendering.
    pub fn chart_library_available() -> bool {
        js_sys::Reflect::has(&js_sys::global(), &JsValue::from_str("Chart")).unwrap_or(false)
    }

    /// Owning token for one attached render. Dropping it destroys the
    /// chart instance, releasing canvas listeners and paint state.
    pub struct RenderHandle {
        chart: ChartJs,
    }

    impl Drop for RenderHandle {
        fn drop(&mut self) {
            self.chart.destroy();
        }
    }

    /// Binds one widget's data to one canvas, at most one live render at
    /// a time.
    pub struct ChartAdapter {
        surface_id: &'static str,
        handle: Option<RenderHandle>,
    }

    impl ChartAdapter {
        pub fn new(surface_id: &'static str) -> Self {
            Self {
                surface_id,
                handle: None,
            }
        }

        /// Attach a new render, releasing any prior one first. A missing
        /// canvas makes this a no-op, not an error.
        pub fn render(&mut self, spec: &ChartSpec) {
            // Release before replace: the old chart must be destroyed
            // before a new one binds to the same canvas.
            self.handle.take();

            let Some(canvas) = canvas_by_id(self.surface_id) else {
                web_sys::console::log_1(
                    &format!("render target #{} missing, skipping", self.surface_id).into(),
                );
                return;
            };
            let Ok(config) = serde_wasm_bindgen::to_value(spec) else {
                return;
            };
            self.handle = Some(RenderHandle {
                chart: ChartJs::new(&canvas, &config),
            });
        }
    }

    fn canvas_by_id(id: &str) -> Option<HtmlCanvasElement> {
        web_sys::window()?
            .document()?
            .get_element_by_id(id)?
            .dyn_into::<HtmlCanvasElement>()
            .ok()
    }

    /// Tabular fallback for the longest-open warnings when the chart
    /// library is unavailable or the canvas is missing.
    pub fn render_warning_table(wrap_id: &str, rows: &[WarningRow]) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let Some(wrap) = document.get_element_by_id(wrap_id) else {
            return;
        };
        let body: String = rows
            .iter()
            .map(|r| {
                format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    r.equipment, r.department, r.first_warning_date, r.days_open, r.open_count
                )
            })
            .collect();
        wrap.set_inner_html(&format!(
            "<table class=\"planner-table\" style=\"width:100%\">\
             <thead><tr><th>Equipment</th><th>Dept.</th><th>Since</th>\
             <th>Days</th><th>Open</th></tr></thead><tbody>{body}</tbody></table>"
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AlarmSeries;

    fn metrics_with_labels(n: usize) -> WeeklyMetrics {
        WeeklyMetrics {
            labels: (1..=n).map(|i| format!("2024-W{i:02}")).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn zero_fill_pads_and_truncates() {
        assert_eq!(zero_fill(&[1, 2], 4), vec![1, 2, 0, 0]);
        assert_eq!(zero_fill(&[1, 2, 3, 4, 5], 3), vec![1, 2, 3]);
        assert_eq!(zero_fill(&[], 2), vec![0, 0]);
    }

    #[test]
    fn trend_series_align_to_label_count() {
        let mut metrics = metrics_with_labels(4);
        metrics.planned = vec![3, 1]; // server omitted the tail
        let spec = trend_spec(&metrics);
        let datasets = spec.data["datasets"].as_array().unwrap();
        for ds in datasets {
            assert_eq!(ds["data"].as_array().unwrap().len(), 4);
        }
        assert_eq!(spec.kind, "line");
    }

    #[test]
    fn corrected_cluster_sums_closed_series() {
        let mut metrics = metrics_with_labels(3);
        metrics.alarms = AlarmSeries {
            critical: vec![1, 0, 2],
            warning: vec![2, 1, 0],
            total: vec![],
        };
        metrics.warnings_closed = vec![1, 1, 0];
        metrics.criticals_closed = vec![0, 1, 1];
        let spec = warn_corrected_spec(&metrics);
        let datasets = spec.data["datasets"].as_array().unwrap();
        assert_eq!(datasets[2]["data"], serde_json::json!([1, 2, 1]));
        // The actual-week line rides on top of the stacks.
        assert_eq!(datasets[3]["type"], "line");
    }

    #[test]
    fn empty_warning_rows_fall_back_to_table() {
        assert!(warning_bar_spec(&[]).is_none());
        let rows = vec![WarningRow {
            equipment: "Kiln 2".into(),
            department: "Pyro".into(),
            days_open: 14,
            open_count: 3,
            ..Default::default()
        }];
        let spec = warning_bar_spec(&rows).unwrap();
        assert_eq!(spec.data["labels"][0], "Kiln 2 (Pyro)");
        assert_eq!(spec.options["indexAxis"], "y");
    }

    #[test]
    fn testing_trend_receives_exact_series() {
        let kpis = TestingKpis {
            trend: vec![1, 2, 3],
            ..Default::default()
        };
        let spec = testing_trend_spec(&kpis);
        assert_eq!(spec.data["datasets"][0]["data"], serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn chart_spec_serializes_type_tag() {
        let spec = alarm_donut_spec(&AlarmSplit {
            critical: 2,
            warning: 5,
            alarms: AlarmSeries::default(),
        });
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["type"], "doughnut");
        assert_eq!(value["data"]["datasets"][0]["data"], serde_json::json!([2, 5]));
    }
}
