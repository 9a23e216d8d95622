//! Dashboard page component.
//!
//! Server-rendered snapshot of the board: KPI cards, chart canvases and
//! the planner table for the active scope. The client layer attaches
//! scope toggling, data refresh and animation after load.

use dioxus::prelude::*;

use crate::model::{BoardRow, KpiCounts};
use crate::ui::components::{KpiCards, Layout};

#[derive(Props, Clone, PartialEq)]
pub struct DashboardPageProps {
    pub is_all_time: bool,
    /// Week-picker value (`YYYY-Wnn`), empty in all-time scope.
    pub picker_value: String,
    /// Scope-hint text shown beside the KPI cards.
    pub hint: String,
    /// Server date (`YYYY-MM-DD`), the client's scope fallback.
    pub default_date: String,
    pub counts: KpiCounts,
    /// Longest-open warnings, pre-serialized as a JSON array.
    pub warnings_json: String,
    pub board: Vec<BoardRow>,
}

/// Dashboard page component.
#[component]
pub fn DashboardPage(props: DashboardPageProps) -> Element {
    rsx! {
        Layout {
            title: "Dashboard".to_string(),
            nav_active: "dashboard".to_string(),

            div {
                id: "dashboard-root",
                "data-default-date": "{props.default_date}",

                h1 { "CBM Dashboard" }

                KpiCards {
                    counts: props.counts.clone(),
                    is_all_time: props.is_all_time,
                    picker_value: props.picker_value.clone(),
                    hint: props.hint.clone(),
                }

                div { class: "chart-grid",
                    article { class: "chart-card",
                        h3 { "Planned vs Completed (12 weeks)" }
                        div { class: "chart-wrap",
                            canvas { id: "trend12w" }
                        }
                    }
                    article { class: "chart-card",
                        h3 { "Alarm Split" }
                        canvas { id: "alarmDonut", width: "220", height: "220" }
                        div { class: "donut-legend",
                            span { class: "crit",
                                "Critical "
                                span { id: "alarmCritCnt", "0" }
                            }
                            span { class: "warn",
                                "Warning "
                                span { id: "alarmWarnCnt", "0" }
                            }
                        }
                    }
                }

                div { class: "chart-grid",
                    article { class: "chart-card",
                        div { class: "page-head",
                            h3 { "Alarms vs Corrected" }
                            select { id: "basisToggle",
                                option { value: "planner", "By planner week" }
                                option { value: "done", "By completion week" }
                            }
                        }
                        div { class: "chart-wrap",
                            canvas { id: "warnCorrectedStack" }
                        }
                    }
                    article { class: "chart-card",
                        h3 { "Longest Open Warnings" }
                        div { id: "warningLongestWrap",
                            canvas { id: "warningLongestBar", width: "320", height: "260" }
                        }
                        script {
                            id: "warningLongestData",
                            r#type: "application/json",
                            dangerous_inner_html: "{props.warnings_json}"
                        }
                    }
                }

                BoardTable { rows: props.board.clone() }
            }
        }
    }
}

#[derive(Props, Clone, PartialEq)]
struct BoardTableProps {
    rows: Vec<BoardRow>,
}

/// Planner board for the active scope. Server-rendered only; a scope
/// change reaches it through full navigation, never a client patch.
#[component]
fn BoardTable(props: BoardTableProps) -> Element {
    rsx! {
        section {
            h3 { "Planner Board" }
            if props.rows.is_empty() {
                p { small { "No planner entries for this scope." } }
            } else {
                table { class: "planner-table",
                    thead {
                        tr {
                            th { "Week" }
                            th { "Department" }
                            th { "Equipment" }
                            th { "Schedule" }
                            th { "Progress" }
                            th { "Worst Alarm" }
                        }
                    }
                    tbody {
                        for row in props.rows.iter() {
                            tr {
                                td { "W{row.week_number:02} {row.year}" }
                                td { "{row.department}" }
                                td { "{row.equipment}" }
                                td { "{row.schedule_type}" }
                                td { "{row.completed_count}/{row.total_tests}" }
                                td { class: "worst-{row.worst_alarm}", "{row.worst_alarm}" }
                            }
                        }
                    }
                }
            }
        }
    }
}
