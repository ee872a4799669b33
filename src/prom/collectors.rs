// Typed collector adapters
// Wraps the four backend primitives behind one `apply(label_values, value)`
// operation selected once, when the collector is materialized.
//
// Numan Thabit 2025 Nov

use super::declarations::Declaration;
use super::summary::SummaryVec;
use prometheus::{CounterVec, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry};
use std::fmt;
use tracing::debug;

/// Kind of measurement reported by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasurementKind {
    /// A delta or an observation, see [`crate::Adder::add`].
    Increment,
    /// An absolute value, see [`crate::Setter::set`].
    Absolute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectorKind {
    Counter,
    Gauge,
    Histogram,
    Summary,
}

impl fmt::Display for CollectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CollectorKind::Counter => "counter",
            CollectorKind::Gauge => "gauge",
            CollectorKind::Histogram => "histogram",
            CollectorKind::Summary => "summary",
        })
    }
}

impl Declaration {
    pub fn kind(&self) -> CollectorKind {
        match self {
            Declaration::Histogram(_) => CollectorKind::Histogram,
            Declaration::Summary(_) => CollectorKind::Summary,
            Declaration::Counter(_) => CollectorKind::Counter,
            Declaration::Gauge(_) => CollectorKind::Gauge,
        }
    }
}

/// Materialized backend collector.
#[derive(Clone)]
pub(crate) enum Collector {
    Counter(CounterVec),
    Gauge(GaugeVec),
    Histogram(HistogramVec),
    Summary(SummaryVec),
    /// The backend refused to build the collector; values are dropped.
    Discard(CollectorKind),
}

/// Naming shared by every collector built by one tracker.
#[derive(Debug, Clone, Default)]
pub(crate) struct Naming {
    pub namespace: Option<String>,
    pub default_help: String,
    pub const_labels: std::collections::HashMap<String, String>,
}

impl Naming {
    fn opts(&self, name: &str, help: Option<&str>) -> Opts {
        let help = help
            .filter(|h| !h.is_empty())
            .unwrap_or(&self.default_help);
        let mut opts = Opts::new(name, help).const_labels(self.const_labels.clone());
        if let Some(ns) = self.namespace.as_deref().filter(|ns| !ns.is_empty()) {
            opts = opts.namespace(ns);
        }
        opts
    }
}

impl Collector {
    /// Builds the collector described by `declaration` with sorted
    /// `label_keys`.
    pub(crate) fn build(
        declaration: &Declaration,
        name: &str,
        label_keys: &[&str],
        naming: &Naming,
    ) -> prometheus::Result<Self> {
        Ok(match declaration {
            Declaration::Histogram(o) => {
                let mut opts = HistogramOpts::from(naming.opts(name, o.help.as_deref()));
                if let Some(buckets) = &o.buckets {
                    opts = opts.buckets(buckets.clone());
                }
                Collector::Histogram(HistogramVec::new(opts, label_keys)?)
            }
            Declaration::Summary(o) => Collector::Summary(SummaryVec::new(
                naming.opts(name, o.help.as_deref()),
                label_keys,
                &o.quantiles,
                o.window,
            )?),
            Declaration::Counter(o) => Collector::Counter(CounterVec::new(
                naming.opts(name, o.help.as_deref()),
                label_keys,
            )?),
            Declaration::Gauge(o) => Collector::Gauge(GaugeVec::new(
                naming.opts(name, o.help.as_deref()),
                label_keys,
            )?),
        })
    }

    pub(crate) fn kind(&self) -> CollectorKind {
        match self {
            Collector::Counter(_) => CollectorKind::Counter,
            Collector::Gauge(_) => CollectorKind::Gauge,
            Collector::Histogram(_) => CollectorKind::Histogram,
            Collector::Summary(_) => CollectorKind::Summary,
            Collector::Discard(kind) => *kind,
        }
    }

    pub(crate) fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        match self {
            Collector::Counter(c) => registry.register(Box::new(c.clone())),
            Collector::Gauge(g) => registry.register(Box::new(g.clone())),
            Collector::Histogram(h) => registry.register(Box::new(h.clone())),
            Collector::Summary(s) => registry.register(Box::new(s.clone())),
            Collector::Discard(_) => Ok(()),
        }
    }

    /// Records `value` for the series selected by `label_values`, ordered by
    /// label key. Cardinality mismatches are dropped silently.
    pub(crate) fn apply(&self, label_values: &[&str], value: f64) {
        match self {
            Collector::Counter(c) => {
                if value.is_nan() || value < 0.0 {
                    // the backend counter panics on negative increments
                    debug!(value, "dropping negative counter increment");
                    return;
                }
                if let Ok(counter) = c.get_metric_with_label_values(label_values) {
                    counter.inc_by(value);
                }
            }
            Collector::Gauge(g) => {
                if let Ok(gauge) = g.get_metric_with_label_values(label_values) {
                    gauge.set(value);
                }
            }
            Collector::Histogram(h) => {
                if let Ok(histogram) = h.get_metric_with_label_values(label_values) {
                    histogram.observe(value);
                }
            }
            Collector::Summary(s) => {
                let _ = s.observe(label_values, value);
            }
            Collector::Discard(_) => {}
        }
    }

    /// Number of exported series, zero for discarded collectors.
    #[cfg(test)]
    pub(crate) fn series(&self) -> usize {
        use prometheus::core::Collector as _;

        let families = match self {
            Collector::Counter(c) => c.collect(),
            Collector::Gauge(g) => g.collect(),
            Collector::Histogram(h) => h.collect(),
            Collector::Summary(s) => s.collect(),
            Collector::Discard(_) => Vec::new(),
        };
        families.iter().map(|mf| mf.get_metric().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prom::declarations::{CounterOptions, GaugeOptions, HistogramOptions};
    use prometheus::core::Collector as _;

    fn naming() -> Naming {
        Naming {
            default_help: "auto-created".to_owned(),
            ..Naming::default()
        }
    }

    #[test]
    fn counter_adds_and_skips_negative_deltas() {
        let c = Collector::build(
            &Declaration::Counter(CounterOptions::default()),
            "hits",
            &["route"],
            &naming(),
        )
        .unwrap();
        c.apply(&["/"], 2.0);
        c.apply(&["/"], -1.0);
        c.apply(&["/"], 3.0);
        match &c {
            Collector::Counter(vec) => assert_eq!(vec.with_label_values(&["/"]).get(), 5.0),
            _ => panic!("expected counter"),
        }
    }

    #[test]
    fn gauge_sets_absolute_value() {
        let g = Collector::build(
            &Declaration::Gauge(GaugeOptions::default()),
            "temperature",
            &[],
            &naming(),
        )
        .unwrap();
        g.apply(&[], 33.3);
        g.apply(&[], 10.0);
        match &g {
            Collector::Gauge(vec) => assert_eq!(vec.with_label_values(&[]).get(), 10.0),
            _ => panic!("expected gauge"),
        }
    }

    #[test]
    fn histogram_observes_samples() {
        let h = Collector::build(
            &Declaration::Histogram(HistogramOptions::with_buckets([1.0, 5.0])),
            "size",
            &["l"],
            &naming(),
        )
        .unwrap();
        h.apply(&["v"], 0.5);
        h.apply(&["v"], 4.0);
        match &h {
            Collector::Histogram(vec) => {
                let histogram = vec.with_label_values(&["v"]);
                assert_eq!(histogram.get_sample_count(), 2);
                assert_eq!(histogram.get_sample_sum(), 4.5);
            }
            _ => panic!("expected histogram"),
        }
    }

    #[test]
    fn wrong_cardinality_is_ignored() {
        let c = Collector::build(
            &Declaration::Counter(CounterOptions::default()),
            "hits",
            &["a", "b"],
            &naming(),
        )
        .unwrap();
        c.apply(&["only-one"], 1.0);
        assert_eq!(c.series(), 0);
        assert_eq!(c.kind(), CollectorKind::Counter);
    }

    #[test]
    fn invalid_names_fail_to_build() {
        let declaration = Declaration::Gauge(GaugeOptions::default());
        assert!(Collector::build(&declaration, "1st", &[], &naming()).is_err());
        assert!(Collector::build(&declaration, "ok", &["bad-key"], &naming()).is_err());
    }

    #[test]
    fn namespace_prefixes_the_name() {
        let naming = Naming {
            namespace: Some("app".to_owned()),
            ..naming()
        };
        let g = Collector::build(
            &Declaration::Gauge(GaugeOptions::with_help("is up")),
            "up",
            &[],
            &naming,
        )
        .unwrap();
        g.apply(&[], 1.0);
        let Collector::Gauge(vec) = &g else {
            panic!("expected gauge")
        };
        let families = vec.collect();
        assert_eq!(families[0].get_name(), "app_up");
        assert_eq!(families[0].get_help(), "is up");
    }
}
