//! Scope-change orchestration.
//!
//! The orchestrator is the only writer of [`ScopeStore`]. It interprets
//! user intents (toggle buttons, week-picker input), decides between a
//! full navigation and a client-only refresh, fans fetches out to the
//! widget fetchers, and discards results that come back for a scope
//! that is no longer active.
//!
//! The decision logic is pure ([`plan_transition`]); the `wasm32` half
//! applies the plan to the page.

use chrono::NaiveDate;

use crate::scope::{self, parse_picker_value, Scope};

/// A user interaction that may change the active scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScopeIntent {
    /// All-time toggle button.
    SelectAllTime,
    /// Weekly toggle button; carries the picker's current value if set.
    SelectWeekly { picker: Option<String> },
    /// The week picker changed while the dashboard is in weekly scope.
    PickerChanged(String),
}

/// What the orchestrator does after a scope change.
///
/// Crossing between weekly and all-time always navigates: the
/// server-rendered board differs structurally between the two and is
/// not content this layer owns. A week change within weekly scope
/// refreshes the widgets client-side for immediate feedback AND
/// navigates, because the board table is still server-rendered per
/// selected week.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScopeAction {
    /// Full navigation with the given query string.
    Navigate { query: String },
    /// Client-side widget refresh, then full navigation.
    RefreshAndNavigate { query: String },
    /// Nothing to do (intent was a no-op or malformed).
    None,
}

/// Decide the next scope and the action for an intent.
///
/// `existing_query` is the page's current query string; unrelated
/// parameters survive into the navigation target.
pub fn plan_transition(
    current: Scope,
    intent: &ScopeIntent,
    today: NaiveDate,
    existing_query: &str,
) -> (Scope, ScopeAction) {
    match intent {
        ScopeIntent::SelectAllTime => {
            if current.is_all_time() {
                return (current, ScopeAction::None);
            }
            let next = Scope::AllTime;
            let query = scope::merge_into_query(next, existing_query);
            (next, ScopeAction::Navigate { query })
        }
        ScopeIntent::SelectWeekly { picker } => {
            let next = picker
                .as_deref()
                .and_then(parse_picker_value)
                .map(|(week, year)| Scope::Weekly { week, year })
                .or_else(|| current.week_year().map(|(week, year)| Scope::Weekly { week, year }))
                .unwrap_or_else(|| Scope::for_date(today));
            if next == current {
                return (current, ScopeAction::None);
            }
            let query = scope::merge_into_query(next, existing_query);
            (next, ScopeAction::Navigate { query })
        }
        ScopeIntent::PickerChanged(value) => {
            // The picker is hidden in all-time scope; a change event
            // there is stale UI noise and must not navigate.
            if current.is_all_time() {
                return (current, ScopeAction::None);
            }
            let Some((week, year)) = parse_picker_value(value) else {
                return (current, ScopeAction::None);
            };
            let next = Scope::Weekly { week, year };
            if next == current {
                return (current, ScopeAction::None);
            }
            let query = scope::merge_into_query(next, existing_query);
            (next, ScopeAction::RefreshAndNavigate { query })
        }
    }
}

/// The week picker only applies to weekly scope.
pub fn picker_visible(scope: Scope) -> bool {
    !scope.is_all_time()
}

/// Text for the scope-hint label beside the KPI cards.
pub fn scope_hint(scope: Scope) -> &'static str {
    if scope.is_all_time() {
        "Showing all-time totals | Current Date:"
    } else {
        "Current Date:"
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm::*;

#[cfg(target_arch = "wasm32")]
mod wasm {
    use super::{plan_transition, picker_visible, scope_hint, ScopeAction, ScopeIntent};
    use crate::app::animate::{self, SWAP_MS};
    use crate::app::charts::{self, ChartAdapter, ChartSpec};
    use crate::app::fetch::{self, FetchResult, WidgetKind};
    use crate::model::KpiCounts;
    use crate::scope::{Scope, ScopeStore};

    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use chrono::NaiveDate;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::spawn_local;
    use web_sys::{Document, HtmlElement};

    /// KPI card counters, by selector and payload field.
    const KPI_COUNTERS: &[(&str, fn(&KpiCounts) -> u64)] = &[
        (".kpi-total .card-count", |c| c.total),
        (".kpi-completed .card-count", |c| c.completed),
        (".kpi-inprogress .card-count", |c| c.active_in_progress),
        (".kpi-revisit .card-count", |c| c.for_revisit),
        (".kpi-waived .card-count", |c| c.waived),
        (".kpi-alarms .card-count", |c| c.alarm_crit_warn),
    ];

    /// Schedule-split chips inside the Total card. Planned/unplanned
    /// stay visible at zero; validation/other hide at zero.
    const KPI_CHIPS: &[(&str, fn(&KpiCounts) -> u64, bool)] = &[
        (".kpi-total .chip-planned", |c| c.planned_tests, true),
        (".kpi-total .chip-unplanned", |c| c.unplanned_tests, true),
        (".kpi-total .chip-validation", |c| c.validation_tests, false),
        (".kpi-total .chip-other", |c| c.other_schedule_tests, false),
    ];

    /// Chart adapters for the widget canvases, built from the widget
    /// table so the surface binding has one source of truth.
    pub struct DashboardCharts {
        adapters: HashMap<WidgetKind, ChartAdapter>,
    }

    impl DashboardCharts {
        fn new() -> Self {
            let adapters = fetch::WIDGETS
                .iter()
                .filter(|w| w.chart)
                .map(|w| (w.kind, ChartAdapter::new(w.surface_id)))
                .collect();
            Self { adapters }
        }

        fn render(&mut self, kind: WidgetKind, spec: &ChartSpec) {
            if let Some(adapter) = self.adapters.get_mut(&kind) {
                adapter.render(spec);
            }
        }
    }

    /// Top-level coordinator for the dashboard page.
    #[derive(Clone)]
    pub struct DashboardOrchestrator {
        scope: Rc<ScopeStore>,
        charts: Rc<RefCell<DashboardCharts>>,
        today: NaiveDate,
    }

    impl DashboardOrchestrator {
        pub fn new(initial: Scope, today: NaiveDate) -> Self {
            Self {
                scope: Rc::new(ScopeStore::new(initial)),
                charts: Rc::new(RefCell::new(DashboardCharts::new())),
                today,
            }
        }

        pub fn scope(&self) -> Scope {
            self.scope.current()
        }

        /// Apply a user intent: update scope state and side effects,
        /// kick off the client refresh when applicable, then navigate.
        /// A navigation that cannot be issued is swallowed; the prior
        /// view remains.
        pub fn handle_intent(&self, intent: ScopeIntent) {
            let query = current_query();
            let (next, action) = plan_transition(self.scope.current(), &intent, self.today, &query);

            self.scope.set(next);
            self.apply_side_effects(next);

            match action {
                ScopeAction::None => {}
                ScopeAction::Navigate { query } => {
                    // The client refresh on a cross-state toggle would
                    // paint content the reload replaces anyway.
                    if let Err(reason) = navigate(&query) {
                        console_warn(&format!("scope navigation failed, keeping view: {reason}"));
                    }
                }
                ScopeAction::RefreshAndNavigate { query } => {
                    // Immediate feedback while the board navigation is
                    // in flight.
                    self.spawn_scope_refresh(next);
                    if let Err(reason) = navigate(&query) {
                        console_warn(&format!("scope navigation failed, keeping view: {reason}"));
                    }
                }
            }
        }

        fn apply_side_effects(&self, scope: Scope) {
            let Some(document) = document() else { return };
            if let Some(hint) = query_html(&document, ".kpi-scope-hint") {
                hint.set_text_content(Some(scope_hint(scope)));
            }
            if let Some(label) = query_html(&document, ".kpi-week-picker-label") {
                let display = if picker_visible(scope) { "inline-flex" } else { "none" };
                let _ = label.style().set_property("display", display);
            }
            for button in query_all_html(&document, ".segmented .seg-item") {
                let wants_all = button.get_attribute("data-scope").as_deref() == Some("all");
                let active = wants_all == scope.is_all_time();
                let _ = button.class_list().toggle_with_force("is-active", active);
                let _ = button.set_attribute("aria-selected", if active { "true" } else { "false" });
            }
        }

        /// Refresh the scope-keyed widgets from the widget table. Each
        /// widget runs as its own task with its own staleness ticket:
        /// one slow or failed fetch never holds up another widget's
        /// render, and a stale result is discarded, never rendered.
        pub fn spawn_scope_refresh(&self, scope: Scope) {
            pulse_updating();
            for widget in fetch::client_refresh_widgets() {
                self.spawn_widget_refresh(widget.kind, scope);
            }
        }

        fn spawn_widget_refresh(&self, kind: WidgetKind, scope: Scope) {
            let store = self.scope.clone();
            let charts = self.charts.clone();
            let ticket = store.ticket();
            spawn_local(async move {
                match kind {
                    WidgetKind::KpiCounts => {
                        let counts = fetch::fetch_kpi_counts(scope).await;
                        if !ticket.is_current(&store) {
                            console_log(&format!("discarding stale kpi_counts for {scope:?}"));
                            return;
                        }
                        match counts {
                            FetchResult::Ok(counts) => apply_kpi_counts(&counts),
                            FetchResult::Failed(reason) => console_warn(&format!(
                                "kpi_counts fetch failed, keeping last values: {reason}"
                            )),
                        }
                    }
                    WidgetKind::AlarmSplit => {
                        let split = fetch::fetch_alarm_split(scope).await;
                        if !ticket.is_current(&store) {
                            console_log(&format!("discarding stale alarm_split for {scope:?}"));
                            return;
                        }
                        match split {
                            FetchResult::Ok(split) => {
                                update_alarm_counters(&split);
                                charts
                                    .borrow_mut()
                                    .render(kind, &charts::alarm_donut_spec(&split));
                            }
                            FetchResult::Failed(reason) => console_warn(&format!(
                                "alarm_split fetch failed, keeping last render: {reason}"
                            )),
                        }
                    }
                    _ => {}
                }
            });
        }

        /// First paint after page load: every chart widget fetches and
        /// renders in its own task, none waits on a sibling.
        pub fn initial_render(&self, embedded_warnings: Option<String>) {
            let scope = self.scope.current();
            self.spawn_trend_render();
            self.spawn_widget_refresh(WidgetKind::AlarmSplit, scope);
            self.refresh_warn_corrected();
            self.render_warning_longest(embedded_warnings);
        }

        fn spawn_trend_render(&self) {
            let store = self.scope.clone();
            let charts = self.charts.clone();
            let ticket = store.ticket();
            spawn_local(async move {
                let result = fetch::fetch_weekly_metrics(12, None).await;
                if !ticket.is_current(&store) {
                    return;
                }
                match result {
                    FetchResult::Ok(metrics) => charts
                        .borrow_mut()
                        .render(WidgetKind::Trend12w, &charts::trend_spec(&metrics)),
                    FetchResult::Failed(reason) => {
                        console_warn(&format!("weekly_metrics fetch failed, trend left empty: {reason}"))
                    }
                }
            });
        }

        /// Longest-open warnings come embedded in the page, not
        /// fetched. Zero rows (or no chart library) renders the
        /// tabular fallback instead of an empty chart.
        fn render_warning_longest(&self, embedded: Option<String>) {
            let rows = fetch::parse_embedded_warnings(&embedded.unwrap_or_default());
            if rows.is_empty() {
                return;
            }
            match charts::warning_bar_spec(&rows) {
                Some(spec) if charts::chart_library_available() => {
                    self.charts.borrow_mut().render(WidgetKind::WarningLongest, &spec);
                }
                _ => charts::render_warning_table("warningLongestWrap", &rows),
            }
        }

        /// Re-render the alarms-vs-corrected stack for a basis change.
        /// Scope is unchanged, so only this one surface refreshes.
        pub fn refresh_warn_corrected(&self) {
            let store = self.scope.clone();
            let charts = self.charts.clone();
            let ticket = store.ticket();
            let basis = selected_basis();
            spawn_local(async move {
                let result = fetch::fetch_weekly_metrics(12, basis.as_deref()).await;
                if !ticket.is_current(&store) {
                    return;
                }
                match result {
                    FetchResult::Ok(metrics) => charts
                        .borrow_mut()
                        .render(WidgetKind::WarnCorrected, &charts::warn_corrected_spec(&metrics)),
                    FetchResult::Failed(reason) => {
                        console_warn(&format!("weekly_metrics fetch failed, keeping last stack: {reason}"))
                    }
                }
            });
        }
    }

    // =========================================================================
    // DOM helpers
    // =========================================================================

    pub(crate) fn console_log(msg: &str) {
        web_sys::console::log_1(&msg.into());
    }

    pub(crate) fn console_warn(msg: &str) {
        web_sys::console::warn_1(&msg.into());
    }

    fn document() -> Option<Document> {
        web_sys::window().and_then(|w| w.document())
    }

    fn query_html(document: &Document, selector: &str) -> Option<HtmlElement> {
        document
            .query_selector(selector)
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
    }

    pub(crate) fn query_all_html(document: &Document, selector: &str) -> Vec<HtmlElement> {
        let Ok(list) = document.query_selector_all(selector) else {
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<HtmlElement>().ok())
            .collect()
    }

    fn current_query() -> String {
        web_sys::window()
            .map(|w| w.location())
            .and_then(|l| l.search().ok())
            .unwrap_or_default()
    }

    /// Issue a full navigation by replacing the query string. Leaving
    /// the query untouched when nothing changed avoids a redundant
    /// reload.
    fn navigate(query: &str) -> Result<(), String> {
        let window = web_sys::window().ok_or("no window")?;
        let location = window.location();
        let current = location.search().map_err(|e| format!("{e:?}"))?;
        if current.trim_start_matches('?') == query {
            return Ok(());
        }
        location
            .set_search(query)
            .map_err(|e| format!("{e:?}"))
    }

    fn selected_basis() -> Option<String> {
        let document = document()?;
        let select = document
            .get_element_by_id("basisToggle")?
            .dyn_into::<web_sys::HtmlSelectElement>()
            .ok()?;
        let value = select.value();
        (!value.is_empty()).then_some(value)
    }

    /// Animate the KPI counters from their displayed values to the new
    /// ones and refresh the schedule chips.
    fn apply_kpi_counts(counts: &KpiCounts) {
        let Some(document) = document() else { return };
        for (selector, field) in KPI_COUNTERS {
            let Some(el) = query_html(&document, selector) else {
                continue;
            };
            let from = animate::displayed_value(&el);
            animate::count_up(el, from, field(counts) as i64, SWAP_MS);
        }
        for (selector, field, always_visible) in KPI_CHIPS {
            let Some(chip) = query_html(&document, selector) else {
                continue;
            };
            let value = field(counts);
            let label = chip
                .get_attribute("data-label")
                .or_else(|| {
                    chip.text_content()
                        .and_then(|t| t.split_whitespace().next().map(str::to_string))
                })
                .unwrap_or_default();
            chip.set_inner_html(&format!("<i class=\"kpi-dot\"></i> {label} {value}"));
            let display = if *always_visible || value > 0 { "inline-flex" } else { "none" };
            let _ = chip.style().set_property("display", display);
        }
    }

    fn update_alarm_counters(split: &crate::model::AlarmSplit) {
        let Some(document) = document() else { return };
        if let Some(el) = document.get_element_by_id("alarmCritCnt") {
            el.set_text_content(Some(&split.critical.to_string()));
        }
        if let Some(el) = document.get_element_by_id("alarmWarnCnt") {
            el.set_text_content(Some(&split.warning.to_string()));
        }
    }

    /// Brief visual pulse on the KPI container while its numbers swap.
    fn pulse_updating() {
        let Some(document) = document() else { return };
        let Some(container) = document.get_element_by_id("kpi-cards") else {
            return;
        };
        let _ = container.class_list().add_1("updating");
        let Some(window) = web_sys::window() else { return };
        let clear = Closure::once_into_js(move || {
            let _ = container.class_list().remove_1("updating");
        });
        let _ = window
            .set_timeout_with_callback_and_timeout_and_arguments_0(clear.unchecked_ref(), 250);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 20).unwrap() // 2024-W12
    }

    #[test]
    fn toggle_to_all_time_navigates_without_week_params() {
        let current = Scope::Weekly { week: 12, year: 2024 };
        let (next, action) = plan_transition(
            current,
            &ScopeIntent::SelectAllTime,
            today(),
            "week=12&year=2024&scope=weekly",
        );
        assert_eq!(next, Scope::AllTime);
        let ScopeAction::Navigate { query } = action else {
            panic!("expected navigation, got {action:?}");
        };
        assert!(query.contains("scope=all"));
        assert!(!query.contains("week="));
        assert!(!query.contains("year="));
        assert!(!picker_visible(next));
    }

    #[test]
    fn toggle_back_to_weekly_uses_picker_value() {
        let (next, action) = plan_transition(
            Scope::AllTime,
            &ScopeIntent::SelectWeekly {
                picker: Some("2024-W07".into()),
            },
            today(),
            "scope=all",
        );
        assert_eq!(next, Scope::Weekly { week: 7, year: 2024 });
        assert!(matches!(action, ScopeAction::Navigate { .. }));
        assert!(picker_visible(next));
    }

    #[test]
    fn toggle_to_weekly_without_picker_falls_back_to_current_week() {
        let (next, _) = plan_transition(
            Scope::AllTime,
            &ScopeIntent::SelectWeekly { picker: None },
            today(),
            "scope=all",
        );
        assert_eq!(next, Scope::Weekly { week: 12, year: 2024 });
    }

    #[test]
    fn repeated_toggle_is_a_no_op() {
        let (next, action) =
            plan_transition(Scope::AllTime, &ScopeIntent::SelectAllTime, today(), "scope=all");
        assert_eq!(next, Scope::AllTime);
        assert_eq!(action, ScopeAction::None);
    }

    #[test]
    fn picker_change_in_weekly_refreshes_and_navigates() {
        let current = Scope::Weekly { week: 12, year: 2024 };
        let (next, action) = plan_transition(
            current,
            &ScopeIntent::PickerChanged("2024-W15".into()),
            today(),
            "scope=weekly&week=12&year=2024&dept=mills",
        );
        assert_eq!(next, Scope::Weekly { week: 15, year: 2024 });
        let ScopeAction::RefreshAndNavigate { query } = action else {
            panic!("expected refresh+navigate, got {action:?}");
        };
        assert!(query.contains("week=15"));
        assert!(query.contains("year=2024"));
        assert!(query.contains("dept=mills"));
    }

    #[test]
    fn picker_change_in_all_time_is_ignored() {
        let (next, action) = plan_transition(
            Scope::AllTime,
            &ScopeIntent::PickerChanged("2024-W15".into()),
            today(),
            "scope=all",
        );
        assert_eq!(next, Scope::AllTime);
        assert_eq!(action, ScopeAction::None);
    }

    #[test]
    fn malformed_picker_value_keeps_prior_view() {
        let current = Scope::Weekly { week: 12, year: 2024 };
        for bad in ["", "2024-W99", "2024W05", "garbage"] {
            let (next, action) = plan_transition(
                current,
                &ScopeIntent::PickerChanged(bad.into()),
                today(),
                "week=12&year=2024",
            );
            assert_eq!(next, current, "input {bad:?} must not change scope");
            assert_eq!(action, ScopeAction::None, "input {bad:?} must not navigate");
        }
    }

    #[test]
    fn scope_refresh_fan_out_is_table_driven() {
        use crate::app::fetch::{client_refresh_widgets, WidgetKind};
        // A scope change spawns one independent task per entry here;
        // the trailing-weeks charts and the board stay out of it.
        let kinds: Vec<_> = client_refresh_widgets().map(|w| w.kind).collect();
        assert_eq!(kinds, vec![WidgetKind::KpiCounts, WidgetKind::AlarmSplit]);
    }

    #[test]
    fn hint_reflects_scope() {
        assert_eq!(scope_hint(Scope::AllTime), "Showing all-time totals | Current Date:");
        assert_eq!(
            scope_hint(Scope::Weekly { week: 1, year: 2024 }),
            "Current Date:"
        );
    }
}
