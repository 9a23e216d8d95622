//! KPI card strip with the scope controls.

use dioxus::prelude::*;

use crate::model::KpiCounts;

#[derive(Props, Clone, PartialEq)]
pub struct KpiCardsProps {
    pub counts: KpiCounts,
    pub is_all_time: bool,
    /// Week-picker value (`YYYY-Wnn`), empty in all-time scope.
    pub picker_value: String,
    /// Scope-hint text beside the date indicator.
    pub hint: String,
}

fn card(class: &'static str, label: &'static str, value: u64) -> Element {
    rsx! {
        article { class: "kpi-card {class}",
            span { class: "card-count", "data-target": "{value}", "{value}" }
            span { class: "card-label", "{label}" }
        }
    }
}

fn chip(class: &'static str, label: &'static str, value: u64, always_visible: bool) -> Element {
    let style = if always_visible || value > 0 {
        "display:inline-flex"
    } else {
        "display:none"
    };
    rsx! {
        span { class: "chip {class}", "data-label": "{label}", style: "{style}",
            i { class: "kpi-dot" }
            "{label} {value}"
        }
    }
}

/// Scope toggle, week picker and the KPI counter cards. Counters carry
/// their value both as text and as `data-target` for the client
/// count-up.
#[component]
pub fn KpiCards(props: KpiCardsProps) -> Element {
    let c = &props.counts;
    let (weekly_active, all_active) = if props.is_all_time {
        ("seg-item", "seg-item is-active")
    } else {
        ("seg-item is-active", "seg-item")
    };
    let picker_style = if props.is_all_time {
        "display:none"
    } else {
        "display:inline-flex"
    };

    rsx! {
        section {
            div { class: "page-head",
                div { class: "segmented", role: "tablist",
                    button {
                        class: "{weekly_active}",
                        r#type: "button",
                        "data-scope": "weekly",
                        "aria-selected": if props.is_all_time { "false" } else { "true" },
                        "Weekly"
                    }
                    button {
                        class: "{all_active}",
                        r#type: "button",
                        "data-scope": "all",
                        "aria-selected": if props.is_all_time { "true" } else { "false" },
                        "All-Time"
                    }
                }
                label { class: "kpi-week-picker-label", style: "{picker_style}",
                    "Week"
                    input {
                        id: "kpi-week-picker",
                        r#type: "week",
                        value: "{props.picker_value}",
                    }
                }
                span { class: "kpi-scope-hint", "{props.hint} " }
                span { id: "date-indicator" }
            }
            div { id: "kpi-cards", class: "kpi-grid",
                article { class: "kpi-card kpi-total",
                    span { class: "card-count", "data-target": "{c.total}", "{c.total}" }
                    span { class: "card-label", "Total Tests" }
                    div { class: "kpi-chips",
                        {chip("chip-planned", "Planned", c.planned_tests, true)}
                        {chip("chip-unplanned", "Unplanned", c.unplanned_tests, true)}
                        {chip("chip-validation", "Validation", c.validation_tests, false)}
                        {chip("chip-other", "Other", c.other_schedule_tests, false)}
                    }
                }
                {card("kpi-completed", "Completed", c.completed)}
                {card("kpi-inprogress", "In Progress", c.active_in_progress)}
                {card("kpi-revisit", "For Revisit", c.for_revisit)}
                {card("kpi-waived", "Waived", c.waived)}
                {card("kpi-alarms", "Alarms", c.alarm_crit_warn)}
            }
        }
    }
}
