//! Payload types shared by the JSON API handlers and the client
//! fetchers.
//!
//! Every numeric field defaults to zero and every series to empty, so a
//! partial or malformed server response degrades to a safe payload
//! instead of a deserialization error.

use serde::{Deserialize, Serialize};

/// KPI counter block for one scope (weekly or all-time).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct KpiCounts {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub completed: u64,
    #[serde(default)]
    pub ongoing: u64,
    #[serde(default)]
    pub ongoing_analysis: u64,
    #[serde(default)]
    pub sending_report: u64,
    /// Ongoing + analysis + sending report.
    #[serde(default)]
    pub active_in_progress: u64,
    #[serde(default)]
    pub for_revisit: u64,
    #[serde(default)]
    pub waived: u64,
    #[serde(default)]
    pub alarm_critical: u64,
    #[serde(default)]
    pub alarm_warning: u64,
    /// Critical + warning.
    #[serde(default)]
    pub alarm_crit_warn: u64,
    #[serde(default)]
    pub planned_tests: u64,
    #[serde(default)]
    pub unplanned_tests: u64,
    #[serde(default)]
    pub validation_tests: u64,
    #[serde(default)]
    pub other_schedule_tests: u64,
}

/// Per-week critical/warning alarm series, position-aligned with the
/// label axis of the response that carries them.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct AlarmSeries {
    #[serde(default)]
    pub critical: Vec<u64>,
    #[serde(default)]
    pub warning: Vec<u64>,
    #[serde(default)]
    pub total: Vec<u64>,
}

/// Weekly metric series over the trailing N weeks.
///
/// Arrays are position-aligned by week index with `labels`
/// (`YYYY-Wnn`, ascending, current week last). Missing arrays default
/// to empty; renderers zero-fill to the label count.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct WeeklyMetrics {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub total: Vec<u64>,
    #[serde(default)]
    pub planned: Vec<u64>,
    #[serde(default)]
    pub completed: Vec<u64>,
    #[serde(default)]
    pub waived: Vec<u64>,
    #[serde(default)]
    pub alarms: AlarmSeries,
    #[serde(default)]
    pub warnings_open: Vec<u64>,
    #[serde(default)]
    pub warnings_closed: Vec<u64>,
    #[serde(default)]
    pub criticals_open: Vec<u64>,
    #[serde(default)]
    pub criticals_closed: Vec<u64>,
    /// Completed critical/warning records grouped by the ISO week of
    /// their actual done date, not the planner week.
    #[serde(default)]
    pub corrected_by_done: Vec<u64>,
}

/// Critical-vs-warning split for one week (or all-time).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct AlarmSplit {
    #[serde(default)]
    pub critical: u64,
    #[serde(default)]
    pub warning: u64,
    /// Optional nested weekly series for stacked rendering.
    #[serde(default)]
    pub alarms: AlarmSeries,
}

/// KPIs for one testing discipline (vibration, oil, thermal, ...).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TestingKpis {
    #[serde(default)]
    pub completed: u64,
    #[serde(default)]
    pub pending: u64,
    #[serde(default)]
    pub delayed: u64,
    #[serde(default)]
    pub trend: Vec<u64>,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// One row of the longest-open-warnings list. Embedded in the page as
/// inline JSON rather than fetched.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct WarningRow {
    #[serde(default)]
    pub equipment: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub first_warning_date: String,
    #[serde(default)]
    pub days_open: u64,
    #[serde(default)]
    pub open_count: u64,
}

/// One server-rendered board row (a planner entry with test progress).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct BoardRow {
    #[serde(default)]
    pub week_number: u32,
    #[serde(default)]
    pub year: i32,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub equipment: String,
    #[serde(default)]
    pub schedule_type: String,
    #[serde(default)]
    pub total_tests: u64,
    #[serde(default)]
    pub completed_count: u64,
    #[serde(default)]
    pub worst_alarm: String,
}
