//! Sidebar navigation component for the web UI.

use dioxus::prelude::*;

/// Navigation links for the sidebar.
const NAV_LINKS: &[(&str, &str, &str)] = &[
    ("dashboard", "Dashboard", "/"),
    ("testing", "Testing", "/testing"),
];

#[derive(Props, Clone, PartialEq)]
pub struct SidebarProps {
    /// The currently active page ID (e.g., "dashboard", "testing")
    pub active: String,
}

/// Collapsible sidebar navigation. The toggle button is wired
/// client-side and the collapse preference persists across visits.
#[component]
pub fn Sidebar(props: SidebarProps) -> Element {
    rsx! {
        aside { class: "sidebar",
            div { class: "sidebar-head",
                strong { class: "sidebar-brand", "CBM Portal" }
                button {
                    id: "sidebarToggle",
                    class: "sidebar-toggle",
                    r#type: "button",
                    "aria-label": "Toggle sidebar",
                    "\u{2630}"
                }
            }
            nav {
                ul {
                    for (id, label, href) in NAV_LINKS.iter() {
                        li {
                            if *id == props.active.as_str() {
                                a {
                                    href: *href,
                                    "aria-current": "page",
                                    strong { "{label}" }
                                }
                            } else {
                                a {
                                    href: *href,
                                    "{label}"
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
