// Declaration registry
// Holds explicit construction intent per metric name: which collector kind to
// build on first use and with which options.
//
// Numan Thabit 2025 Nov

use super::sanitize::sanitize;
use crate::prom::MeasurementKind;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HistogramOptions {
    pub help: Option<String>,
    /// Upper bounds; `prometheus::DEFAULT_BUCKETS` when unset.
    pub buckets: Option<Vec<f64>>,
}

impl HistogramOptions {
    pub fn with_buckets(buckets: impl Into<Vec<f64>>) -> Self {
        Self {
            help: None,
            buckets: Some(buckets.into()),
        }
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SummaryOptions {
    pub help: Option<String>,
    /// Quantiles to export, e.g. `[0.5, 0.9, 0.99]`. Only `_sum` and
    /// `_count` are exported when empty.
    pub quantiles: Vec<f64>,
    /// Number of most recent samples quantiles are computed over.
    pub window: Option<usize>,
}

impl SummaryOptions {
    pub fn with_quantiles(quantiles: impl Into<Vec<f64>>) -> Self {
        Self {
            quantiles: quantiles.into(),
            ..Self::default()
        }
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CounterOptions {
    pub help: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GaugeOptions {
    pub help: Option<String>,
}

impl CounterOptions {
    pub fn with_help(help: impl Into<String>) -> Self {
        Self {
            help: Some(help.into()),
        }
    }
}

impl GaugeOptions {
    pub fn with_help(help: impl Into<String>) -> Self {
        Self {
            help: Some(help.into()),
        }
    }
}

/// Collector construction intent for one metric name.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Histogram(HistogramOptions),
    Summary(SummaryOptions),
    Counter(CounterOptions),
    Gauge(GaugeOptions),
}

#[derive(Debug, Default)]
struct Tables {
    histograms: HashMap<String, HistogramOptions>,
    summaries: HashMap<String, SummaryOptions>,
    counters: HashMap<String, CounterOptions>,
    gauges: HashMap<String, GaugeOptions>,
}

/// Declarations keyed by sanitized metric name, one table per kind.
#[derive(Debug, Default)]
pub struct Declarations {
    tables: RwLock<Tables>,
}

impl Declarations {
    /// Stores `declaration` under the sanitized `name`. The last declaration
    /// of a kind wins.
    pub fn declare(&self, name: &str, declaration: Declaration) {
        let name = sanitize(name).into_owned();
        let mut tables = self.tables.write();
        match declaration {
            Declaration::Histogram(opts) => {
                tables.histograms.insert(name, opts);
            }
            Declaration::Summary(opts) => {
                tables.summaries.insert(name, opts);
            }
            Declaration::Counter(opts) => {
                tables.counters.insert(name, opts);
            }
            Declaration::Gauge(opts) => {
                tables.gauges.insert(name, opts);
            }
        }
    }

    /// Picks the collector to build for a sanitized name.
    ///
    /// Histograms and summaries win regardless of the measurement kind,
    /// increments default to counters, everything else becomes a gauge.
    pub fn resolve(&self, name: &str, kind: MeasurementKind) -> Declaration {
        let tables = self.tables.read();
        if let Some(opts) = tables.histograms.get(name) {
            return Declaration::Histogram(opts.clone());
        }
        if let Some(opts) = tables.summaries.get(name) {
            return Declaration::Summary(opts.clone());
        }
        if kind == MeasurementKind::Increment {
            return Declaration::Counter(tables.counters.get(name).cloned().unwrap_or_default());
        }
        Declaration::Gauge(tables.gauges.get(name).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_follows_kind_table_order() {
        let decls = Declarations::default();
        decls.declare("latency", Declaration::Counter(CounterOptions::with_help("c")));
        decls.declare("latency", Declaration::Summary(SummaryOptions::default()));
        decls.declare(
            "latency",
            Declaration::Histogram(HistogramOptions::with_buckets([1.0, 2.0])),
        );

        assert_eq!(
            decls.resolve("latency", MeasurementKind::Absolute),
            Declaration::Histogram(HistogramOptions::with_buckets([1.0, 2.0]))
        );
    }

    #[test]
    fn defaults_depend_on_measurement_kind() {
        let decls = Declarations::default();
        assert_eq!(
            decls.resolve("hits", MeasurementKind::Increment),
            Declaration::Counter(CounterOptions::default())
        );
        assert_eq!(
            decls.resolve("hits", MeasurementKind::Absolute),
            Declaration::Gauge(GaugeOptions::default())
        );
    }

    #[test]
    fn counter_declaration_ignored_for_absolute_values() {
        let decls = Declarations::default();
        decls.declare("items", Declaration::Counter(CounterOptions::with_help("items")));
        assert_eq!(
            decls.resolve("items", MeasurementKind::Absolute),
            Declaration::Gauge(GaugeOptions::default())
        );
    }

    #[test]
    fn names_are_sanitized_and_last_writer_wins() {
        let decls = Declarations::default();
        decls.declare("some.size", Declaration::Histogram(HistogramOptions::with_buckets([1.0])));
        decls.declare("some-size", Declaration::Histogram(HistogramOptions::with_buckets([5.0])));
        assert_eq!(
            decls.resolve("some_size", MeasurementKind::Increment),
            Declaration::Histogram(HistogramOptions::with_buckets([5.0]))
        );
    }
}
