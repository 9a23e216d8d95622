#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Route contract test.
//!
//! The routes exposed by the server are pinned in
//! tests/fixtures/api_routes.txt. Widgets and external dashboards build
//! URLs against these paths, so any change has to be deliberate: update
//! the golden file together with the router and call the change out in
//! review.

use std::collections::BTreeSet;
use std::fs;

const GOLDEN: &str = "tests/fixtures/api_routes.txt";
const ROUTER: &str = "src/api/mod.rs";

fn golden_routes() -> Vec<String> {
    fs::read_to_string(GOLDEN)
        .expect("missing golden route file")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Scans the router source for `.route("<path>", get(...))` lines.
/// Text-level on purpose: it catches route edits without needing the
/// router to be constructible in a unit test.
fn routes_in_source() -> BTreeSet<String> {
    let source = fs::read_to_string(ROUTER).expect("missing router source");
    let mut found = BTreeSet::new();

    for line in source.lines() {
        let line = line.trim();
        if line.starts_with("//") {
            continue;
        }
        let Some(at) = line.find(".route(\"") else {
            continue;
        };
        let rest = &line[at + 8..];
        let Some(end) = rest.find('"') else { continue };
        let path = &rest[..end];

        let method = if line.contains("get(") {
            "GET"
        } else if line.contains("post(") {
            "POST"
        } else {
            continue;
        };
        found.insert(format!("{method} {path}"));
    }
    found
}

#[test]
fn router_matches_pinned_routes() {
    let golden: BTreeSet<String> = golden_routes().into_iter().collect();
    let actual = routes_in_source();

    let added: Vec<_> = actual.difference(&golden).collect();
    let removed: Vec<_> = golden.difference(&actual).collect();
    assert!(
        added.is_empty() && removed.is_empty(),
        "route contract drift\n  unpinned: {added:?}\n  missing: {removed:?}\n\
         update {GOLDEN} if the change is intentional"
    );
}

#[test]
fn pinned_routes_are_sorted_and_unique() {
    let routes = golden_routes();
    let deduped: BTreeSet<&String> = routes.iter().collect();
    assert_eq!(routes.len(), deduped.len(), "duplicate entries in {GOLDEN}");

    let mut sorted = routes.clone();
    sorted.sort();
    assert_eq!(routes, sorted, "{GOLDEN} must stay sorted");
}
