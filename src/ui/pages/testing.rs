//! Testing KPIs page component.
//!
//! One page per testing discipline (vibration, oil, thermal, ultra).
//! The counters and trend chart are filled client-side from
//! `/api/testing/kpis`.

use dioxus::prelude::*;

use crate::ui::components::Layout;

#[derive(Props, Clone, PartialEq)]
pub struct TestingPageProps {
    /// Discipline token, e.g. "vibration" or "oil".
    pub test_type: String,
    /// Human-readable heading for the discipline.
    pub heading: String,
}

fn counter(id: &'static str, label: &'static str) -> Element {
    rsx! {
        article { class: "kpi-card is-in",
            span { id: id, class: "card-count", "0" }
            span { class: "card-label", "{label}" }
        }
    }
}

/// Testing page component.
#[component]
pub fn TestingPage(props: TestingPageProps) -> Element {
    rsx! {
        Layout {
            title: "Testing".to_string(),
            nav_active: "testing".to_string(),

            div {
                id: "testing-root",
                "data-test-type": "{props.test_type}",

                h1 { "{props.heading}" }

                div { class: "kpi-grid",
                    {counter("testCompleted", "Completed This Week")}
                    {counter("testPending", "Pending This Week")}
                    {counter("testDelayed", "Delayed (>7 days)")}
                }

                article { class: "chart-card",
                    h3 { "Completed Trend" }
                    div { class: "chart-wrap",
                        canvas { id: "testingTrend" }
                    }
                }
            }
        }
    }
}
