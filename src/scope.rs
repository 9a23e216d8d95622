//! Temporal scope: which period the dashboard is showing.
//!
//! A scope is either a specific ISO week of a year or the all-time
//! aggregate. The scope travels in three places that must stay in sync:
//! the URL query string, the `type="week"` picker control, and the
//! server-rendered page sections. This module owns the representation,
//! the codec between those three forms, and the single-writer store the
//! client orchestrator mutates.

use std::cell::{Cell, RefCell};

use chrono::{Datelike, NaiveDate};
use url::form_urlencoded;

/// The temporal filter governing which period's data a widget displays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    /// A specific ISO-8601 week of a year.
    Weekly { week: u32, year: i32 },
    /// Aggregate over everything on record.
    AllTime,
}

impl Scope {
    pub fn is_all_time(&self) -> bool {
        matches!(self, Scope::AllTime)
    }

    /// `(week, year)` for weekly scopes, `None` for all-time.
    pub fn week_year(&self) -> Option<(u32, i32)> {
        match *self {
            Scope::Weekly { week, year } => Some((week, year)),
            Scope::AllTime => None,
        }
    }

    /// Scope for the ISO week containing `date`.
    pub fn for_date(date: NaiveDate) -> Scope {
        let (year, week) = iso_week_and_year(date);
        Scope::Weekly { week, year }
    }

    /// Week-picker control value (`YYYY-Wnn`); all-time has none.
    pub fn picker_value(&self) -> Option<String> {
        self.week_year()
            .map(|(week, year)| format!("{year}-W{week:02}"))
    }
}

/// ISO-8601 week-year and week number for a date.
///
/// Week 1 is the week containing the year's first Thursday (weeks start
/// Monday), so the returned year can differ from the calendar year near
/// January 1st. Used both for the default scope and the visible current
/// period indicator.
pub fn iso_week_and_year(date: NaiveDate) -> (i32, u32) {
    let iso = date.iso_week();
    (iso.year(), iso.week())
}

/// Number of ISO weeks in a year (52 or 53). December 28th is always in
/// the last week of its ISO year.
pub fn weeks_in_iso_year(year: i32) -> u32 {
    NaiveDate::from_ymd_opt(year, 12, 28)
        .map(|d| d.iso_week().week())
        .unwrap_or(52)
}

fn valid_week(week: u32, year: i32) -> bool {
    week >= 1 && week <= weeks_in_iso_year(year)
}

/// Parse a week-picker value of the form `YYYY-Wnn`.
pub fn parse_picker_value(value: &str) -> Option<(u32, i32)> {
    let (year, week) = value.trim().split_once("-W")?;
    let year: i32 = year.parse().ok()?;
    let week: u32 = week.parse().ok()?;
    valid_week(week, year).then_some((week, year))
}

/// Resolve the active scope from the inbound page state.
///
/// Precedence: explicit `week`+`year` URL params (with `scope=all`
/// winning outright), then the week-picker value, then a server-embedded
/// default date, then the current calendar week. Malformed input at any
/// level falls through to the next; nothing here errors.
pub fn parse(
    query: &str,
    picker_value: Option<&str>,
    server_default: Option<NaiveDate>,
    today: NaiveDate,
) -> Scope {
    let mut scope_param = None;
    let mut week_param = None;
    let mut year_param = None;
    for (key, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
        match key.as_ref() {
            "scope" => scope_param = Some(value.trim().to_ascii_lowercase()),
            "week" => week_param = value.trim().parse::<u32>().ok(),
            "year" => year_param = value.trim().parse::<i32>().ok(),
            _ => {}
        }
    }

    if matches!(
        scope_param.as_deref(),
        Some("all" | "all-time" | "alltime" | "overall" | "total")
    ) {
        return Scope::AllTime;
    }

    if let (Some(week), Some(year)) = (week_param, year_param) {
        if valid_week(week, year) {
            return Scope::Weekly { week, year };
        }
    }

    if let Some((week, year)) = picker_value.and_then(parse_picker_value) {
        return Scope::Weekly { week, year };
    }

    if let Some(date) = server_default {
        return Scope::for_date(date);
    }

    Scope::for_date(today)
}

/// Encode a scope as a standalone query string.
///
/// All-time yields `scope=all` with no `week`/`year`; weekly yields
/// `scope=weekly&week=<n>&year=<y>`.
pub fn encode(scope: Scope) -> String {
    let mut out = form_urlencoded::Serializer::new(String::new());
    match scope {
        Scope::AllTime => {
            out.append_pair("scope", "all");
        }
        Scope::Weekly { week, year } => {
            out.append_pair("scope", "weekly");
            out.append_pair("week", &week.to_string());
            out.append_pair("year", &year.to_string());
        }
    }
    out.finish()
}

/// Merge a scope into an existing query string, preserving unrelated
/// parameters. This is what outbound navigation uses so filters on the
/// server-rendered board survive a scope change.
pub fn merge_into_query(scope: Scope, existing: &str) -> String {
    let mut out = form_urlencoded::Serializer::new(String::new());
    for (key, value) in form_urlencoded::parse(existing.trim_start_matches('?').as_bytes()) {
        if !matches!(key.as_ref(), "scope" | "week" | "year") {
            out.append_pair(&key, &value);
        }
    }
    match scope {
        Scope::AllTime => {
            out.append_pair("scope", "all");
        }
        Scope::Weekly { week, year } => {
            out.append_pair("scope", "weekly");
            out.append_pair("week", &week.to_string());
            out.append_pair("year", &year.to_string());
        }
    }
    out.finish()
}

/// Single-writer scope state with subscriber notification.
///
/// Only the orchestrator calls [`ScopeStore::set`]; widgets read the
/// current scope per refresh cycle and register callbacks for changes.
/// Every change bumps a generation counter so a late-arriving fetch can
/// tell it was started for a scope that is no longer active.
pub struct ScopeStore {
    scope: Cell<Scope>,
    generation: Cell<u64>,
    subscribers: RefCell<Vec<Box<dyn Fn(Scope)>>>,
}

impl ScopeStore {
    pub fn new(initial: Scope) -> Self {
        Self {
            scope: Cell::new(initial),
            generation: Cell::new(0),
            subscribers: RefCell::new(Vec::new()),
        }
    }

    pub fn current(&self) -> Scope {
        self.scope.get()
    }

    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    /// Replace the active scope, bump the generation and notify
    /// subscribers. Setting the same scope again is a no-op.
    pub fn set(&self, scope: Scope) {
        if self.scope.get() == scope {
            return;
        }
        self.scope.set(scope);
        self.generation.set(self.generation.get() + 1);
        for subscriber in self.subscribers.borrow().iter() {
            subscriber(scope);
        }
    }

    pub fn subscribe(&self, f: impl Fn(Scope) + 'static) {
        self.subscribers.borrow_mut().push(Box::new(f));
    }

    /// Ticket stamped with the generation a refresh cycle started under.
    pub fn ticket(&self) -> ScopeTicket {
        ScopeTicket {
            generation: self.generation.get(),
        }
    }
}

/// Stamp for detecting stale fetch results.
///
/// There is no fetch cancellation; a superseded fetch simply finds its
/// ticket outdated when it resolves and its result is discarded instead
/// of rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScopeTicket {
    generation: u64,
}

impl ScopeTicket {
    pub fn is_current(&self, store: &ScopeStore) -> bool {
        self.generation == store.generation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn iso_week_crosses_year_boundary() {
        assert_eq!(iso_week_and_year(date(2021, 1, 1)), (2020, 53));
        assert_eq!(iso_week_and_year(date(2021, 1, 4)), (2021, 1));
        assert_eq!(iso_week_and_year(date(2020, 12, 31)), (2020, 53));
        assert_eq!(iso_week_and_year(date(2024, 3, 20)), (2024, 12));
    }

    #[test]
    fn weeks_per_year() {
        assert_eq!(weeks_in_iso_year(2020), 53);
        assert_eq!(weeks_in_iso_year(2021), 52);
        assert_eq!(weeks_in_iso_year(2024), 52);
    }

    #[test]
    fn encode_parse_round_trip() {
        let today = date(2024, 6, 1);
        for year in [2020, 2021, 2024] {
            for week in [1, 12, weeks_in_iso_year(year)] {
                let scope = Scope::Weekly { week, year };
                assert_eq!(parse(&encode(scope), None, None, today), scope);
            }
        }
        assert_eq!(parse(&encode(Scope::AllTime), None, None, today), Scope::AllTime);
    }

    #[test]
    fn parse_precedence_url_over_picker_over_default() {
        let today = date(2024, 6, 1);
        let scope = parse(
            "week=12&year=2024",
            Some("2023-W05"),
            Some(date(2022, 2, 2)),
            today,
        );
        assert_eq!(scope, Scope::Weekly { week: 12, year: 2024 });

        let scope = parse("", Some("2023-W05"), Some(date(2022, 2, 2)), today);
        assert_eq!(scope, Scope::Weekly { week: 5, year: 2023 });

        let scope = parse("", None, Some(date(2022, 2, 2)), today);
        assert_eq!(scope, Scope::Weekly { week: 5, year: 2022 });

        let scope = parse("", None, None, today);
        assert_eq!(scope, Scope::for_date(today));
    }

    #[test]
    fn malformed_input_falls_back_to_current_week() {
        let today = date(2024, 6, 1);
        let current = Scope::for_date(today);
        assert_eq!(parse("week=abc&year=2024", None, None, today), current);
        assert_eq!(parse("week=0&year=2024", None, None, today), current);
        assert_eq!(parse("week=54&year=2024", None, None, today), current);
        // 2021 has 52 ISO weeks, so week 53 is invalid for it.
        assert_eq!(parse("week=53&year=2021", None, None, today), current);
        assert_eq!(parse("", Some("garbage"), None, today), current);
    }

    #[test]
    fn all_time_encoding_has_no_week_params() {
        let q = encode(Scope::AllTime);
        assert_eq!(q, "scope=all");
        let merged = merge_into_query(Scope::AllTime, "week=12&year=2024&dept=mills");
        assert!(merged.contains("scope=all"));
        assert!(merged.contains("dept=mills"));
        assert!(!merged.contains("week="));
        assert!(!merged.contains("year="));
    }

    #[test]
    fn merge_preserves_unrelated_params() {
        let merged = merge_into_query(
            Scope::Weekly { week: 7, year: 2025 },
            "?scope=all&page=2",
        );
        assert!(merged.contains("page=2"));
        assert!(merged.contains("scope=weekly"));
        assert!(merged.contains("week=7"));
        assert!(merged.contains("year=2025"));
    }

    #[test]
    fn picker_value_is_zero_padded() {
        assert_eq!(
            Scope::Weekly { week: 5, year: 2024 }.picker_value().as_deref(),
            Some("2024-W05")
        );
        assert_eq!(Scope::AllTime.picker_value(), None);
        assert_eq!(parse_picker_value("2024-W05"), Some((5, 2024)));
        assert_eq!(parse_picker_value("2024-W60"), None);
        assert_eq!(parse_picker_value("nonsense"), None);
    }

    #[test]
    fn store_notifies_subscribers_once_per_change() {
        let store = ScopeStore::new(Scope::AllTime);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        store.subscribe(move |scope| sink.borrow_mut().push(scope));

        let weekly = Scope::Weekly { week: 3, year: 2025 };
        store.set(weekly);
        store.set(weekly); // same scope, no notification
        store.set(Scope::AllTime);

        assert_eq!(seen.borrow().as_slice(), &[weekly, Scope::AllTime]);
        assert_eq!(store.generation(), 2);
    }

    #[test]
    fn stale_ticket_detects_superseded_scope() {
        let store = ScopeStore::new(Scope::Weekly { week: 1, year: 2024 });
        let first = store.ticket();
        store.set(Scope::Weekly { week: 2, year: 2024 });
        let second = store.ticket();
        store.set(Scope::Weekly { week: 3, year: 2024 });

        assert!(!first.is_current(&store));
        assert!(!second.is_current(&store));
        assert!(store.ticket().is_current(&store));
    }
}
