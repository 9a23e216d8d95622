//! Client-side orchestration layer.
//!
//! The server renders the full dashboard page; this layer attaches
//! behavior to it after load: scope toggling and navigation, widget
//! data refresh, chart rendering and the entrance/count-up animations.
//! Everything browser-facing is gated to `wasm32`; the decision logic
//! in the submodules compiles natively for the test suite.

pub mod animate;
pub mod charts;
pub mod fetch;
pub mod orchestrator;
pub mod sidebar;

use chrono::{Datelike, NaiveDate};

use crate::scope::iso_week_and_year;

/// Header date line: weekday, date and the ISO week it falls in.
pub fn format_date_indicator(date: NaiveDate) -> String {
    let (year, week) = iso_week_and_year(date);
    format!(
        "{}, {} {} \u{2022} W{week:02} {year}",
        date.format("%A"),
        date.format("%b"),
        date.day(),
    )
}

#[cfg(target_arch = "wasm32")]
mod boot {
    use super::format_date_indicator;
    use super::orchestrator::{DashboardOrchestrator, ScopeIntent};
    use super::{animate, charts, fetch, sidebar};
    use crate::app::fetch::FetchResult;
    use crate::scope::{self, Scope};

    use chrono::NaiveDate;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::spawn_local;
    use web_sys::{Document, Element, HtmlInputElement};

    /// Page entry point. Dispatches on which page the server rendered;
    /// a page without a known root gets only the shared chrome wiring.
    #[wasm_bindgen(start)]
    pub fn start() {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        sidebar::init_sidebar();

        if let Some(root) = document.get_element_by_id("dashboard-root") {
            boot_dashboard(&document, &root);
        } else if let Some(root) = document.get_element_by_id("testing-root") {
            boot_testing(&document, &root);
        }
    }

    fn boot_dashboard(document: &Document, root: &Element) {
        let today = today();
        let picker = picker_input(document);
        let picker_value = picker.as_ref().map(|p| p.value());
        let server_default = root
            .get_attribute("data-default-date")
            .and_then(|raw| NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok());
        let query = web_sys::window()
            .map(|w| w.location())
            .and_then(|l| l.search().ok())
            .unwrap_or_default();

        let active = scope::parse(&query, picker_value.as_deref(), server_default, today);
        if let (Some(picker), Some(value)) = (&picker, active.picker_value()) {
            if picker.value().is_empty() {
                picker.set_value(&value);
            }
        }
        if let Some(el) = document.get_element_by_id("date-indicator") {
            el.set_text_content(Some(&format_date_indicator(today)));
        }

        let orchestrator = DashboardOrchestrator::new(active, today);

        let embedded = document
            .get_element_by_id("warningLongestData")
            .and_then(|el| el.text_content());
        orchestrator.initial_render(embedded);

        let cards = super::orchestrator::query_all_html(document, ".kpi-card");
        animate::observe_card_entrances(cards);

        wire_scope_controls(document, &orchestrator);
    }

    fn wire_scope_controls(document: &Document, orchestrator: &DashboardOrchestrator) {
        for button in super::orchestrator::query_all_html(document, ".segmented .seg-item") {
            let orch = orchestrator.clone();
            let doc = document.clone();
            let wants_all = button.get_attribute("data-scope").as_deref() == Some("all");
            let on_click = Closure::wrap(Box::new(move |_event: web_sys::Event| {
                let intent = if wants_all {
                    ScopeIntent::SelectAllTime
                } else {
                    ScopeIntent::SelectWeekly {
                        picker: picker_input(&doc).map(|p| p.value()),
                    }
                };
                orch.handle_intent(intent);
            }) as Box<dyn FnMut(web_sys::Event)>);
            let _ = button
                .add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref());
            on_click.forget();
        }

        if let Some(picker) = picker_input(document) {
            let orch = orchestrator.clone();
            let input = picker.clone();
            let on_change = Closure::wrap(Box::new(move |_event: web_sys::Event| {
                orch.handle_intent(ScopeIntent::PickerChanged(input.value()));
            }) as Box<dyn FnMut(web_sys::Event)>);
            let _ = picker
                .add_event_listener_with_callback("change", on_change.as_ref().unchecked_ref());
            on_change.forget();
        }

        if let Some(toggle) = document.get_element_by_id("basisToggle") {
            let orch = orchestrator.clone();
            let on_change = Closure::wrap(Box::new(move |_event: web_sys::Event| {
                orch.refresh_warn_corrected();
            }) as Box<dyn FnMut(web_sys::Event)>);
            let _ = toggle
                .add_event_listener_with_callback("change", on_change.as_ref().unchecked_ref());
            on_change.forget();
        }
    }

    fn boot_testing(document: &Document, root: &Element) {
        let test_type = root
            .get_attribute("data-test-type")
            .unwrap_or_else(|| "vibration".to_string());
        let document = document.clone();

        spawn_local(async move {
            let kpis = match fetch::fetch_testing_kpis(&test_type, 12).await {
                FetchResult::Ok(kpis) => kpis,
                FetchResult::Failed(reason) => {
                    web_sys::console::warn_1(
                        &format!("testing kpis fetch failed, page left at zeros: {reason}").into(),
                    );
                    return;
                }
            };

            for (id, value) in [
                ("testCompleted", kpis.completed),
                ("testPending", kpis.pending),
                ("testDelayed", kpis.delayed),
            ] {
                let counter = document
                    .get_element_by_id(id)
                    .and_then(|el| el.dyn_into::<web_sys::HtmlElement>().ok());
                if let Some(counter) = counter {
                    animate::count_up(counter, 0, value as i64, animate::COUNT_UP_MS);
                }
            }

            let mut adapter = charts::ChartAdapter::new("testingTrend");
            adapter.render(&charts::testing_trend_spec(&kpis));
            // The chart lives for the page lifetime.
            std::mem::forget(adapter);
        });
    }

    fn picker_input(document: &Document) -> Option<HtmlInputElement> {
        document
            .get_element_by_id("kpi-week-picker")
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
    }

    fn today() -> NaiveDate {
        let now = js_sys::Date::new_0();
        NaiveDate::from_ymd_opt(
            now.get_full_year() as i32,
            now.get_month() + 1,
            now.get_date(),
        )
        .unwrap_or_default()
    }
}
