// Tracker mock
// In-memory tracker for tests: sums increments and keeps absolute values per
// metric name and per labelled series.
//
// Numan Thabit 2025 Nov

use crate::context::Context;
use crate::prom::labels::LabelSet;
use crate::tracker::{Adder, Setter, Tracker, TrackerProvider};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Collects stats for tests.
///
/// Values are aggregated per name (labels ignored) and per series
/// `name{k="v",...}` with keys sorted and values escaped the way the
/// Prometheus text format does. Ambient context labels are merged with
/// call-site labels like [`crate::PrometheusTracker`] does.
#[derive(Debug, Default)]
pub struct TrackerMock {
    inner: Mutex<MockValues>,
}

#[derive(Debug, Default)]
struct MockValues {
    values: HashMap<String, f64>,
    labeled_values: HashMap<String, f64>,
}

impl TrackerMock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collected value by name, or by series when `labels` are given.
    pub fn value(&self, name: &str, labels: &[&str]) -> f64 {
        let inner = self.inner.lock();
        if labels.is_empty() {
            inner.values.get(name).copied().unwrap_or_default()
        } else {
            let key = series_key(name, &LabelSet::compose::<&str, &str>(&[], labels));
            inner.labeled_values.get(&key).copied().unwrap_or_default()
        }
    }

    /// Collected value truncated to an integer.
    pub fn int(&self, name: &str, labels: &[&str]) -> i64 {
        self.value(name, labels) as i64
    }

    /// Snapshot of values per name.
    pub fn values(&self) -> HashMap<String, f64> {
        self.inner.lock().values.clone()
    }

    /// Snapshot of values per series.
    pub fn labeled_values(&self) -> HashMap<String, f64> {
        self.inner.lock().labeled_values.clone()
    }

    /// Series as sorted `series value` lines.
    pub fn metrics(&self) -> String {
        let inner = self.inner.lock();
        let mut lines: Vec<String> = inner
            .labeled_values
            .iter()
            .map(|(series, value)| format!("{series} {value}"))
            .collect();
        lines.sort();
        lines.join("\n")
    }

    fn record(&self, ctx: &Context, name: &str, value: f64, labels: &[&str], absolute: bool) {
        let key = series_key(name, &LabelSet::compose(ctx.labels(), labels));

        let mut inner = self.inner.lock();
        if absolute {
            inner.values.insert(name.to_owned(), value);
            inner.labeled_values.insert(key, value);
        } else {
            *inner.values.entry(name.to_owned()).or_default() += value;
            *inner.labeled_values.entry(key).or_default() += value;
        }
    }
}

fn series_key(name: &str, labels: &LabelSet) -> String {
    let pairs: Vec<String> = labels
        .pairs()
        .map(|(k, v)| format!("{k}=\"{}\"", escape(v)))
        .collect();
    format!("{name}{{{}}}", pairs.join(","))
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

impl Adder for TrackerMock {
    fn add(&self, ctx: &Context, name: &str, increment: f64, labels_and_values: &[&str]) {
        self.record(ctx, name, increment, labels_and_values, false);
    }
}

impl Setter for TrackerMock {
    fn set(&self, ctx: &Context, name: &str, absolute: f64, labels_and_values: &[&str]) {
        self.record(ctx, name, absolute, labels_and_values, true);
    }
}

impl TrackerProvider for TrackerMock {
    fn stats_tracker(&self) -> &dyn Tracker {
        self
    }
}
