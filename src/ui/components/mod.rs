//! Shared UI components for the Dioxus-based web UI.

pub mod kpi;
pub mod layout;
pub mod nav;

pub use kpi::KpiCards;
pub use layout::Layout;
pub use nav::Sidebar;
