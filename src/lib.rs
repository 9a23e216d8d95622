//! CBM Dashboard - condition-based-monitoring board for plant equipment.
//!
//! This library provides:
//! - Temporal scope state and its URL/picker codec
//! - Client-side widget orchestration (fetch, charts, animation)
//! - Metric aggregations over the test-record store
//! - Server-rendered dashboard pages and the widget data API

pub mod app;
pub mod model;
pub mod scope;

#[cfg(feature = "server")]
pub mod api;
#[cfg(feature = "server")]
pub mod config;
#[cfg(feature = "server")]
pub mod store;
#[cfg(feature = "server")]
pub mod ui;
