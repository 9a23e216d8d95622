//! Web UI handlers.
//!
//! Pages are Dioxus components rendered to HTML on the server; the
//! client wasm layer attaches scope handling, fetch and animation to
//! the rendered DOM. A scope change that crosses weekly/all-time comes
//! back through these handlers as a full navigation.

pub mod components;
pub mod pages;

use axum::{
    extract::{RawQuery, State},
    response::{Html, IntoResponse},
};
use chrono::Local;
use dioxus::prelude::*;
use url::form_urlencoded;

use crate::api::AppState;
use crate::app::orchestrator::scope_hint;
use crate::scope;
use pages::{DashboardPage, TestingPage};

fn html_doc(body: String) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n{}</html>",
        body
    ))
}

/// Serialize a value for an inline `<script type="application/json">`
/// block. HTML-significant characters are escaped as JSON unicode
/// sequences so a string field containing `</script>` cannot truncate
/// the payload.
fn inline_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "[]".to_string())
        .replace('&', "\\u0026")
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
}

/// GET / - Dashboard with KPI cards, charts and the planner board.
///
/// The scope comes from the query string; anything malformed falls back
/// to the current week, never an error page.
pub async fn dashboard_page(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let today = Local::now().date_naive();
    let active = scope::parse(query.as_deref().unwrap_or(""), None, None, today);

    let counts = state.store.kpi_counts(active);
    let board = state.store.board_rows(active);
    let warnings = state.store.longest_open_warnings(today, state.warning_limit);
    let warnings_json = inline_json(&warnings);

    let html = dioxus::ssr::render_element(rsx! {
        DashboardPage {
            is_all_time: active.is_all_time(),
            picker_value: active.picker_value().unwrap_or_default(),
            hint: scope_hint(active).to_string(),
            default_date: today.to_string(),
            counts,
            warnings_json,
            board,
        }
    });
    html_doc(html)
}

/// GET /testing - KPI page for one testing discipline.
pub async fn testing_page(RawQuery(query): RawQuery) -> impl IntoResponse {
    let test_type = form_urlencoded::parse(query.as_deref().unwrap_or("").as_bytes())
        .find(|(key, _)| key == "type")
        .map(|(_, value)| value.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "vibration".to_string());

    let heading = match test_type.as_str() {
        "vibration" | "va" => "Vibration Analysis",
        "oil" | "oa" => "Oil Analysis",
        "thermal" | "ti" | "thermography" => "Thermography",
        "ultra" | "ultrasonic" | "uld" | "ultrasound" => "Ultrasonic Testing",
        _ => "Testing KPIs",
    };

    let html = dioxus::ssr::render_element(rsx! {
        TestingPage {
            test_type,
            heading: heading.to_string(),
        }
    });
    html_doc(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WarningRow;

    #[test]
    fn inline_json_neutralizes_markup_in_fields() {
        let rows = vec![WarningRow {
            equipment: "Mill </script><script>4".into(),
            department: "R&D".into(),
            first_warning_date: "2024-02-20".into(),
            days_open: 29,
            open_count: 2,
        }];
        let json = inline_json(&rows);
        assert!(!json.contains('<'));
        assert!(!json.contains('>'));
        assert!(!json.contains('&'));

        // The escapes are plain JSON; the payload parses back unchanged.
        let parsed: Vec<WarningRow> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, rows);
    }
}
