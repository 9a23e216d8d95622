//! In-memory metrics store backing the dashboard aggregations.
//!
//! Test records load once from a JSON data file at startup; every
//! endpoint aggregates over the loaded set. Status and alarm vocabulary
//! is normalized (trimmed, lowercased) before classification, and
//! unknown values fall into the broadest bucket rather than erroring.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{AlarmSeries, AlarmSplit, BoardRow, KpiCounts, TestingKpis, WarningRow, WeeklyMetrics};
use crate::scope::{iso_week_and_year, Scope};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read data file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse data file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One condition-monitoring test record: a planner entry joined with
/// its testing outcome.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TestRecord {
    #[serde(default)]
    pub week_number: u32,
    #[serde(default)]
    pub year: i32,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub equipment: String,
    /// planned | unplanned | validation | anything else
    #[serde(default)]
    pub schedule_type: String,
    /// Discipline, e.g. "vibration analysis", "oil analysis".
    #[serde(default)]
    pub test_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub done: bool,
    /// critical | warning | normal | empty
    #[serde(default)]
    pub alarm_level: String,
    /// Scheduled test date, ISO `YYYY-MM-DD` (possibly with a time
    /// suffix, possibly empty).
    #[serde(default)]
    pub test_date: String,
    /// Actual completion date, same format rules.
    #[serde(default)]
    pub done_date: String,
}

fn norm(s: &str) -> String {
    s.trim().to_ascii_lowercase()
}

impl TestRecord {
    pub fn is_completed(&self) -> bool {
        self.done || matches!(norm(&self.status).as_str(), "done" | "completed")
    }

    pub fn is_ongoing(&self) -> bool {
        !self.done && matches!(norm(&self.status).as_str(), "ongoing" | "todo" | "")
    }

    pub fn is_ongoing_analysis(&self) -> bool {
        norm(&self.status) == "ongoing analysis"
    }

    pub fn is_sending_report(&self) -> bool {
        matches!(
            norm(&self.status).as_str(),
            "sending" | "sending report" | "report sending" | "sending-report"
        )
    }

    pub fn is_for_revisit(&self) -> bool {
        norm(&self.status) == "for revisit"
    }

    pub fn is_waived(&self) -> bool {
        norm(&self.status) == "waived"
    }

    pub fn is_critical(&self) -> bool {
        norm(&self.alarm_level) == "critical"
    }

    pub fn is_warning(&self) -> bool {
        norm(&self.alarm_level) == "warning"
    }

    fn in_scope(&self, scope: Scope) -> bool {
        match scope {
            Scope::AllTime => true,
            Scope::Weekly { week, year } => self.week_number == week && self.year == year,
        }
    }
}

/// Parse the date portion of a record date field. Accepts a bare ISO
/// date or anything with one as its first ten characters.
pub fn parse_record_date(raw: &str) -> Option<NaiveDate> {
    // get() rather than a slice: a multibyte character across the
    // boundary must yield None, not a panic.
    let prefix = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

/// Trailing `n` ISO weeks ending with the week containing `today`,
/// ascending, deduplicated.
pub fn trailing_weeks(n: u32, today: NaiveDate) -> Vec<(i32, u32)> {
    let mut out = Vec::with_capacity(n as usize);
    for k in (0..n as i64).rev() {
        let d = today - Duration::weeks(k);
        let (year, week) = iso_week_and_year(d);
        if out.last() != Some(&(year, week)) {
            out.push((year, week));
        }
    }
    out
}

/// Map a testing-type token to the substring records are matched on.
/// Empty matches everything.
pub fn test_type_pattern(token: &str) -> String {
    match norm(token).as_str() {
        "vibration" | "va" => "vibration".to_string(),
        "oil" | "oa" => "oil".to_string(),
        "thermal" | "ti" | "thermography" => "thermal".to_string(),
        "ultra" | "ultrasonic" | "uld" | "ultrasound" => "ultrasonic".to_string(),
        other => other.to_string(),
    }
}

pub struct MetricsStore {
    records: Vec<TestRecord>,
}

impl MetricsStore {
    pub fn from_records(records: Vec<TestRecord>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Load records from a JSON array file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)?;
        let records: Vec<TestRecord> = serde_json::from_str(&raw)?;
        Ok(Self::from_records(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn scoped(&self, scope: Scope) -> impl Iterator<Item = &TestRecord> {
        self.records.iter().filter(move |r| r.in_scope(scope))
    }

    /// KPI counter block for one scope.
    pub fn kpi_counts(&self, scope: Scope) -> KpiCounts {
        let mut counts = KpiCounts::default();
        for r in self.scoped(scope) {
            counts.total += 1;
            if r.is_completed() {
                counts.completed += 1;
            }
            if r.is_ongoing() {
                counts.ongoing += 1;
            }
            if r.is_ongoing_analysis() {
                counts.ongoing_analysis += 1;
            }
            if r.is_sending_report() {
                counts.sending_report += 1;
            }
            if r.is_for_revisit() {
                counts.for_revisit += 1;
            }
            if r.is_waived() {
                counts.waived += 1;
            }
            if r.is_critical() {
                counts.alarm_critical += 1;
            }
            if r.is_warning() {
                counts.alarm_warning += 1;
            }
            match norm(&r.schedule_type).as_str() {
                "planned" => counts.planned_tests += 1,
                "unplanned" => counts.unplanned_tests += 1,
                "validation" => counts.validation_tests += 1,
                _ => counts.other_schedule_tests += 1,
            }
        }
        counts.active_in_progress =
            counts.ongoing + counts.ongoing_analysis + counts.sending_report;
        counts.alarm_crit_warn = counts.alarm_critical + counts.alarm_warning;
        counts
    }

    /// Weekly metric series over the trailing `weeks` weeks (ending
    /// with the current one).
    ///
    /// All series but `corrected_by_done` group by the planner week the
    /// record was scheduled in; `corrected_by_done` groups completed
    /// critical/warning records by the ISO week of their actual done
    /// date.
    pub fn weekly_metrics(&self, weeks: u32, today: NaiveDate) -> WeeklyMetrics {
        let pairs = trailing_weeks(weeks, today);
        let index: BTreeMap<(i32, u32), usize> =
            pairs.iter().enumerate().map(|(i, &p)| (p, i)).collect();
        let len = pairs.len();

        let mut m = WeeklyMetrics {
            labels: pairs.iter().map(|(y, w)| format!("{y}-W{w:02}")).collect(),
            total: vec![0; len],
            planned: vec![0; len],
            completed: vec![0; len],
            waived: vec![0; len],
            alarms: AlarmSeries {
                critical: vec![0; len],
                warning: vec![0; len],
                total: vec![0; len],
            },
            warnings_open: vec![0; len],
            warnings_closed: vec![0; len],
            criticals_open: vec![0; len],
            criticals_closed: vec![0; len],
            corrected_by_done: vec![0; len],
        };

        for r in &self.records {
            if let Some(&i) = index.get(&(r.year, r.week_number)) {
                m.total[i] += 1;
                if norm(&r.schedule_type) == "planned" {
                    m.planned[i] += 1;
                }
                if r.is_completed() {
                    m.completed[i] += 1;
                }
                if r.is_waived() {
                    m.waived[i] += 1;
                }
                if r.is_critical() {
                    m.alarms.critical[i] += 1;
                    m.alarms.total[i] += 1;
                    if r.is_completed() {
                        m.criticals_closed[i] += 1;
                    } else {
                        m.criticals_open[i] += 1;
                    }
                }
                if r.is_warning() {
                    m.alarms.warning[i] += 1;
                    m.alarms.total[i] += 1;
                    if r.is_completed() {
                        m.warnings_closed[i] += 1;
                    } else {
                        m.warnings_open[i] += 1;
                    }
                }
            }

            // Grouped by completion week, independent of planner week.
            if (r.is_critical() || r.is_warning()) && r.is_completed() {
                if let Some(done) = parse_record_date(&r.done_date) {
                    if let Some(&i) = index.get(&iso_week_and_year(done)) {
                        m.corrected_by_done[i] += 1;
                    }
                }
            }
        }
        m
    }

    /// Critical-vs-warning split for one week.
    pub fn alarm_split(&self, week: u32, year: i32) -> AlarmSplit {
        let scope = Scope::Weekly { week, year };
        let mut split = AlarmSplit::default();
        for r in self.scoped(scope) {
            if r.is_critical() {
                split.critical += 1;
            }
            if r.is_warning() {
                split.warning += 1;
            }
        }
        split
    }

    /// All-time critical-vs-warning split.
    pub fn alarm_split_all(&self) -> AlarmSplit {
        let mut split = AlarmSplit::default();
        for r in &self.records {
            if r.is_critical() {
                split.critical += 1;
            }
            if r.is_warning() {
                split.warning += 1;
            }
        }
        split
    }

    /// KPIs for one testing discipline. Completed and pending cover the
    /// current week; delayed counts records not done whose scheduled
    /// date is more than seven days in the past, regardless of week.
    pub fn testing_kpis(&self, test_type: &str, weeks: u32, today: NaiveDate) -> TestingKpis {
        let pattern = test_type_pattern(test_type);
        let matches_type =
            |r: &TestRecord| pattern.is_empty() || norm(&r.test_type).contains(&pattern);

        let (cur_year, cur_week) = iso_week_and_year(today);
        let current = Scope::Weekly {
            week: cur_week,
            year: cur_year,
        };

        let mut kpis = TestingKpis::default();
        for r in self.records.iter().filter(|r| matches_type(r)) {
            if r.in_scope(current) {
                if r.is_completed() {
                    kpis.completed += 1;
                }
                if r.is_ongoing() {
                    kpis.pending += 1;
                }
            }
            if !r.is_completed() {
                if let Some(base) = parse_record_date(&r.test_date) {
                    if (today - base).num_days() > 7 {
                        kpis.delayed += 1;
                    }
                }
            }
        }

        for (year, week) in trailing_weeks(weeks, today) {
            let scope = Scope::Weekly { week, year };
            let count = self
                .records
                .iter()
                .filter(|r| matches_type(r) && r.in_scope(scope) && r.is_completed())
                .count() as u64;
            kpis.trend.push(count);
            kpis.labels.push(format!("{year}-W{week:02}"));
        }
        kpis
    }

    /// Open warnings with the longest standing, grouped per equipment.
    /// `days_open` counts from the oldest open warning of that
    /// equipment; `open_count` is how many are still open.
    pub fn longest_open_warnings(&self, today: NaiveDate, limit: usize) -> Vec<WarningRow> {
        let mut groups: BTreeMap<(String, String), (NaiveDate, u64)> = BTreeMap::new();
        for r in &self.records {
            if !r.is_warning() || r.is_completed() {
                continue;
            }
            let Some(date) = parse_record_date(&r.test_date) else {
                continue;
            };
            groups
                .entry((r.equipment.clone(), r.department.clone()))
                .and_modify(|(first, count)| {
                    if date < *first {
                        *first = date;
                    }
                    *count += 1;
                })
                .or_insert((date, 1));
        }

        let mut rows: Vec<WarningRow> = groups
            .into_iter()
            .map(|((equipment, department), (first, open_count))| WarningRow {
                equipment,
                department,
                first_warning_date: first.to_string(),
                days_open: (today - first).num_days().max(0) as u64,
                open_count,
            })
            .collect();
        rows.sort_by(|a, b| b.days_open.cmp(&a.days_open));
        rows.truncate(limit);
        rows
    }

    /// Board rows for the server-rendered planner table: one row per
    /// department / equipment / schedule type in scope, with progress
    /// and the worst alarm seen.
    pub fn board_rows(&self, scope: Scope) -> Vec<BoardRow> {
        let mut groups: BTreeMap<(i32, u32, String, String, String), (u64, u64, u8)> =
            BTreeMap::new();
        for r in self.scoped(scope) {
            let key = (
                r.year,
                r.week_number,
                r.department.clone(),
                r.equipment.clone(),
                norm(&r.schedule_type),
            );
            let severity = if r.is_critical() {
                2
            } else if r.is_warning() {
                1
            } else {
                0
            };
            let entry = groups.entry(key).or_insert((0, 0, 0));
            entry.0 += 1;
            if r.is_completed() {
                entry.1 += 1;
            }
            entry.2 = entry.2.max(severity);
        }

        groups
            .into_iter()
            .map(
                |((year, week_number, department, equipment, schedule_type), (total, done, sev))| {
                    BoardRow {
                        week_number,
                        year,
                        department,
                        equipment,
                        schedule_type,
                        total_tests: total,
                        completed_count: done,
                        worst_alarm: match sev {
                            2 => "critical".to_string(),
                            1 => "warning".to_string(),
                            _ => "normal".to_string(),
                        },
                    }
                },
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(week: u32, year: i32, status: &str, alarm: &str) -> TestRecord {
        TestRecord {
            week_number: week,
            year,
            department: "Grinding".into(),
            equipment: "Mill 4".into(),
            schedule_type: "planned".into(),
            test_type: "vibration analysis".into(),
            status: status.into(),
            alarm_level: alarm.into(),
            ..Default::default()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 20).unwrap() // 2024-W12
    }

    fn seeded() -> MetricsStore {
        MetricsStore::from_records(vec![
            rec(12, 2024, "done", "warning"),
            rec(12, 2024, "ongoing", "critical"),
            rec(12, 2024, "Completed", ""),
            rec(12, 2024, "waived", ""),
            rec(12, 2024, "ongoing analysis", ""),
            rec(12, 2024, "sending report", ""),
            rec(12, 2024, "for revisit", ""),
            rec(11, 2024, "done", "critical"),
            rec(5, 2023, "todo", "warning"),
        ])
    }

    #[test]
    fn kpi_counts_weekly_scope() {
        let counts = seeded().kpi_counts(Scope::Weekly { week: 12, year: 2024 });
        assert_eq!(counts.total, 7);
        assert_eq!(counts.completed, 2);
        assert_eq!(counts.ongoing, 1);
        assert_eq!(counts.ongoing_analysis, 1);
        assert_eq!(counts.sending_report, 1);
        assert_eq!(counts.active_in_progress, 3);
        assert_eq!(counts.for_revisit, 1);
        assert_eq!(counts.waived, 1);
        assert_eq!(counts.alarm_critical, 1);
        assert_eq!(counts.alarm_warning, 1);
        assert_eq!(counts.alarm_crit_warn, 2);
        assert_eq!(counts.planned_tests, 7);
    }

    #[test]
    fn kpi_counts_all_time_scope() {
        let counts = seeded().kpi_counts(Scope::AllTime);
        assert_eq!(counts.total, 9);
        assert_eq!(counts.completed, 3);
        assert_eq!(counts.alarm_crit_warn, 4);
    }

    #[test]
    fn status_classification_is_case_insensitive() {
        let r = rec(1, 2024, "  DONE ", " CRITICAL ");
        assert!(r.is_completed());
        assert!(r.is_critical());
        // done flag wins over a blank status
        let r = TestRecord {
            done: true,
            ..rec(1, 2024, "", "")
        };
        assert!(r.is_completed());
        assert!(!r.is_ongoing());
    }

    #[test]
    fn record_date_tolerates_short_and_multibyte_input() {
        assert_eq!(
            parse_record_date("2024-03-20T08:15:00"),
            NaiveDate::from_ymd_opt(2024, 3, 20)
        );
        assert_eq!(parse_record_date("2024-03-20"), NaiveDate::from_ymd_opt(2024, 3, 20));
        assert_eq!(parse_record_date(""), None);
        assert_eq!(parse_record_date("2024-03"), None);
        assert_eq!(parse_record_date("not a date"), None);
        // A multibyte character across the ten-byte boundary must not
        // split mid-character.
        assert_eq!(parse_record_date("2024-03-0é"), None);
        assert_eq!(parse_record_date("2024-03-0\u{00e9}extra"), None);
    }

    #[test]
    fn trailing_weeks_ascend_and_cross_year_boundary() {
        let pairs = trailing_weeks(3, NaiveDate::from_ymd_opt(2021, 1, 8).unwrap());
        assert_eq!(pairs, vec![(2020, 52), (2020, 53), (2021, 1)]);
    }

    #[test]
    fn weekly_metrics_series_are_label_aligned() {
        let m = seeded().weekly_metrics(3, today());
        assert_eq!(m.labels, vec!["2024-W10", "2024-W11", "2024-W12"]);
        assert_eq!(m.total, vec![0, 1, 7]);
        assert_eq!(m.completed, vec![0, 1, 2]);
        assert_eq!(m.planned, vec![0, 1, 7]);
        assert_eq!(m.alarms.critical, vec![0, 1, 1]);
        assert_eq!(m.alarms.warning, vec![0, 0, 1]);
        assert_eq!(m.warnings_closed, vec![0, 0, 1]);
        assert_eq!(m.criticals_open, vec![0, 0, 1]);
        assert_eq!(m.criticals_closed, vec![0, 1, 0]);
    }

    #[test]
    fn corrected_by_done_groups_by_completion_week() {
        // Planned in W10 but completed in W12: the planner series count
        // it under W10, the done series under W12.
        let mut record = rec(10, 2024, "done", "warning");
        record.done_date = "2024-03-19".into();
        let store = MetricsStore::from_records(vec![record]);
        let m = store.weekly_metrics(3, today());
        assert_eq!(m.warnings_closed, vec![1, 0, 0]);
        assert_eq!(m.corrected_by_done, vec![0, 0, 1]);
    }

    #[test]
    fn alarm_split_counts_one_week() {
        let split = seeded().alarm_split(12, 2024);
        assert_eq!(split.critical, 1);
        assert_eq!(split.warning, 1);
        let all = seeded().alarm_split_all();
        assert_eq!(all.critical, 2);
        assert_eq!(all.warning, 2);
    }

    #[test]
    fn testing_kpis_filter_by_discipline() {
        let mut oil = rec(12, 2024, "done", "");
        oil.test_type = "oil analysis".into();
        let store = MetricsStore::from_records(vec![
            rec(12, 2024, "done", ""),
            rec(12, 2024, "ongoing", ""),
            oil,
        ]);
        let kpis = store.testing_kpis("va", 2, today());
        assert_eq!(kpis.completed, 1);
        assert_eq!(kpis.pending, 1);
        assert_eq!(kpis.trend, vec![0, 1]);
        assert_eq!(kpis.labels, vec!["2024-W11", "2024-W12"]);

        let all = store.testing_kpis("", 2, today());
        assert_eq!(all.completed, 2);
    }

    #[test]
    fn testing_delayed_counts_overdue_open_records() {
        let mut overdue = rec(10, 2024, "ongoing", "");
        overdue.test_date = "2024-03-01".into();
        let mut recent = rec(12, 2024, "ongoing", "");
        recent.test_date = "2024-03-18".into();
        let mut done_old = rec(9, 2024, "done", "");
        done_old.test_date = "2024-02-01".into();
        let store = MetricsStore::from_records(vec![overdue, recent, done_old]);
        assert_eq!(store.testing_kpis("", 4, today()).delayed, 1);
    }

    #[test]
    fn longest_open_warnings_group_per_equipment() {
        let mut a = rec(8, 2024, "ongoing", "warning");
        a.test_date = "2024-02-20".into();
        let mut b = rec(10, 2024, "ongoing", "warning");
        b.test_date = "2024-03-05".into();
        let mut other = rec(11, 2024, "ongoing", "warning");
        other.equipment = "Kiln 2".into();
        other.test_date = "2024-03-12".into();
        let mut closed = rec(7, 2024, "done", "warning");
        closed.test_date = "2024-02-12".into();
        let store = MetricsStore::from_records(vec![a, b, other, closed]);

        let rows = store.longest_open_warnings(today(), 5);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].equipment, "Mill 4");
        assert_eq!(rows[0].open_count, 2);
        assert_eq!(rows[0].days_open, 29);
        assert_eq!(rows[0].first_warning_date, "2024-02-20");
        assert_eq!(rows[1].equipment, "Kiln 2");
        assert_eq!(rows[1].days_open, 8);
    }

    #[test]
    fn board_rows_report_progress_and_worst_alarm() {
        let rows = seeded().board_rows(Scope::Weekly { week: 12, year: 2024 });
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_tests, 7);
        assert_eq!(rows[0].completed_count, 2);
        assert_eq!(rows[0].worst_alarm, "critical");
    }

    #[test]
    fn load_rejects_malformed_file_and_accepts_valid_one() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "not json").unwrap();
        assert!(matches!(MetricsStore::load(&bad), Err(StoreError::Parse(_))));

        let good = dir.path().join("good.json");
        std::fs::write(
            &good,
            r#"[{"week_number":12,"year":2024,"status":"done"}]"#,
        )
        .unwrap();
        let store = MetricsStore::load(&good).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.records[0].is_completed());

        assert!(matches!(
            MetricsStore::load(dir.path().join("missing.json")),
            Err(StoreError::Io(_))
        ));
    }
}
