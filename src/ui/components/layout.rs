//! Layout component wrapping all pages with Pico CSS and common elements.

use dioxus::prelude::*;

use super::nav::Sidebar;

/// CSS styles for the application (extends Pico CSS).
const CUSTOM_STYLES: &str = r#"
:root { --pico-font-size: 15px; }
body { display: flex; min-height: 100vh; margin: 0; }
.sidebar { width: 220px; flex-shrink: 0; padding: 1rem; border-right: 1px solid var(--pico-muted-border-color); transition: width 0.2s ease; }
.sidebar-head { display: flex; justify-content: space-between; align-items: center; margin-bottom: 1rem; }
.sidebar-toggle { padding: 0.25rem 0.5rem; margin: 0; font-size: 0.9rem; }
body.sb-collapsed .sidebar { width: 56px; overflow: hidden; }
body.sb-collapsed .sidebar-brand, body.sb-collapsed .sidebar nav { display: none; }
main.content { flex: 1; padding: 1.5rem; min-width: 0; }
.page-head { display: flex; justify-content: space-between; align-items: baseline; flex-wrap: wrap; gap: 0.5rem; }
.kpi-scope-hint { color: var(--pico-muted-color); font-size: 0.85rem; }
.segmented { display: inline-flex; border: 1px solid var(--pico-muted-border-color); border-radius: 6px; overflow: hidden; }
.segmented .seg-item { margin: 0; padding: 0.3rem 0.9rem; border: 0; border-radius: 0; background: transparent; color: inherit; }
.segmented .seg-item.is-active { background: var(--pico-primary-background); color: var(--pico-primary-inverse); }
.kpi-week-picker-label { display: inline-flex; align-items: center; gap: 0.4rem; margin: 0; }
.kpi-week-picker-label input { margin: 0; padding: 0.2rem 0.4rem; width: auto; }
.kpi-grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(170px, 1fr)); gap: 0.8rem; margin: 1rem 0; }
.kpi-card { padding: 0.9rem 1rem; border: 1px solid var(--pico-muted-border-color); border-radius: 8px; opacity: 0; transform: translateY(10px); transition: opacity 0.45s ease, transform 0.45s ease; }
.kpi-card.is-in { opacity: 1; transform: none; }
@media (prefers-reduced-motion: reduce) { .kpi-card { opacity: 1; transform: none; transition: none; } }
.card-count { display: block; font-size: 1.9rem; font-weight: 700; line-height: 1.2; }
.card-label { color: var(--pico-muted-color); font-size: 0.8rem; }
.kpi-chips { display: flex; flex-wrap: wrap; gap: 0.3rem; margin-top: 0.4rem; }
.kpi-chips .chip { display: inline-flex; align-items: center; gap: 0.25rem; font-size: 0.7rem; padding: 0.1rem 0.45rem; border: 1px solid var(--pico-muted-border-color); border-radius: 999px; }
.kpi-dot { width: 7px; height: 7px; border-radius: 50%; background: var(--pico-primary-background); display: inline-block; }
#kpi-cards.updating .card-count { opacity: 0.55; transition: opacity 0.2s ease; }
.chart-grid { display: grid; grid-template-columns: 2fr 1fr; gap: 1rem; align-items: start; }
.chart-card { padding: 1rem; border: 1px solid var(--pico-muted-border-color); border-radius: 8px; }
.chart-card h3 { font-size: 1rem; margin-bottom: 0.6rem; }
.chart-wrap { position: relative; height: 260px; }
.donut-legend { display: flex; gap: 1rem; justify-content: center; margin-top: 0.5rem; font-size: 0.85rem; }
.donut-legend .crit { color: #dc2626; }
.donut-legend .warn { color: #f59e0b; }
.planner-table { width: 100%; }
.worst-critical { color: #dc2626; font-weight: 600; }
.worst-warning { color: #f59e0b; font-weight: 600; }
small { color: var(--pico-muted-color); }
"#;

#[derive(Props, Clone, PartialEq)]
pub struct LayoutProps {
    /// Page title (shown in browser tab)
    pub title: String,
    /// Active navigation item ID
    pub nav_active: String,
    /// Page content
    pub children: Element,
}

/// Main layout component wrapping all pages.
#[component]
pub fn Layout(props: LayoutProps) -> Element {
    let version = env!("CARGO_PKG_VERSION");

    rsx! {
        head {
            meta { charset: "utf-8" }
            meta { name: "viewport", content: "width=device-width, initial-scale=1" }
            title { "{props.title} - CBM Portal" }
            link {
                rel: "stylesheet",
                href: "https://cdn.jsdelivr.net/npm/@picocss/pico@2/css/pico.min.css"
            }
            script { src: "https://cdn.jsdelivr.net/npm/chart.js@4.4.4/dist/chart.umd.min.js" }
            style { {CUSTOM_STYLES} }
        }
        body {
            Sidebar { active: props.nav_active.clone() }
            main { class: "content",
                {props.children}
                footer {
                    small { "CBM Portal v{version}" }
                }
            }
            script {
                r#type: "module",
                dangerous_inner_html: r#"import init from '/static/cbm-dashboard.js'; init();"#
            }
        }
    }
}
