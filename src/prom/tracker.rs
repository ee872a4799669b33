// Collector cache
// This file implements the Prometheus stats tracker: measurement calls are
// resolved to typed collectors that are created and registered on first use
// and served from a lock-free map afterwards.
//
// Numan Thabit 2025 Nov

use super::collectors::{Collector, MeasurementKind, Naming};
use super::declarations::{
    CounterOptions, Declaration, Declarations, GaugeOptions, HistogramOptions, SummaryOptions,
};
use super::labels::{with_pooled, LabelSet};
use super::sanitize::sanitize;
use crate::config::TrackerConfig;
use crate::context::Context;
use crate::errors::StatsError;
use crate::tracker::{Adder, Setter, Tracker, TrackerProvider};
use parking_lot::Mutex;
use prometheus::Registry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Help text of collectors created without a declared one.
pub const DEFAULT_HELP: &str = "auto-created";

/// Label values up to this count are passed to the backend without a heap
/// allocation.
const INLINE_LABELS: usize = 16;

/// Receives collector construction and registration failures together with
/// the sorted label keys of the failing collector.
pub type ErrorHandler = Arc<dyn Fn(&Context, &StatsError, &[String]) + Send + Sync>;

/// Collector bound to one sanitized name and one sorted label key set.
/// Immutable once created and kept for the lifetime of the tracker.
struct CollectorEntry {
    label_keys: Box<[String]>,
    collector: Collector,
}

impl CollectorEntry {
    fn apply(&self, labels: &LabelSet, value: f64) {
        if labels.len() <= INLINE_LABELS {
            let mut inline = [""; INLINE_LABELS];
            for (slot, v) in inline.iter_mut().zip(labels.values()) {
                *slot = v;
            }
            self.collector.apply(&inline[..labels.len()], value);
        } else {
            let values: Vec<&str> = labels.values().collect();
            self.collector.apply(&values, value);
        }
    }
}

/// Stats tracker backed by a [`prometheus::Registry`].
///
/// Counters serve increments, gauges serve absolute values, and declared
/// histograms or summaries take precedence over both. Every distinct
/// (sanitized name, label key set) is registered exactly once; label values
/// select series within that collector.
///
/// ```
/// use ambient_stats::{Adder, Context, HistogramOptions, PrometheusTracker, Setter};
///
/// let tracker = PrometheusTracker::new(prometheus::Registry::new());
/// tracker.declare_histogram(
///     "my_latency_seconds",
///     HistogramOptions::with_buckets([1e-4, 1e-3, 1e-2, 1e-1, 1.0, 10.0, 100.0]),
/// );
///
/// let ctx = Context::background().with_labels(&["ctx_label", "ctx-value0"]);
/// let ctx = ctx.with_labels(&["ctx_label", "ctx-value1"]);
///
/// tracker.add(&ctx, "my_count", 1.0, &["some_label", "some-value"]);
/// tracker.add(&ctx, "my_latency_seconds", 1.23, &[]);
/// tracker.set(&ctx, "temperature", 33.3, &[]);
/// ```
pub struct PrometheusTracker {
    registry: Registry,
    naming: Naming,
    declarations: Declarations,
    /// Hot path: raw or sanitized name, then label key fingerprint.
    collectors: papaya::HashMap<String, papaya::HashMap<u64, Arc<CollectorEntry>>>,
    /// Slow path: sanitized name to every key set materialized for it.
    /// Holding this lock serializes collector creation.
    canonical: Mutex<HashMap<String, Vec<Arc<CollectorEntry>>>>,
    error_handler: Option<ErrorHandler>,
}

impl PrometheusTracker {
    /// Creates a tracker that registers collectors in `registry`.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            naming: Naming {
                default_help: DEFAULT_HELP.to_owned(),
                ..Naming::default()
            },
            declarations: Declarations::default(),
            collectors: papaya::HashMap::new(),
            canonical: Mutex::new(HashMap::new()),
            error_handler: None,
        }
    }

    /// Creates a tracker with naming defaults and declarations from `config`.
    pub fn from_config(registry: Registry, config: &TrackerConfig) -> Self {
        let mut tracker = Self::new(registry);
        tracker.naming = Naming {
            namespace: config.namespace.clone(),
            default_help: if config.default_help.is_empty() {
                DEFAULT_HELP.to_owned()
            } else {
                config.default_help.clone()
            },
            const_labels: config.const_labels.clone(),
        };
        for (name, declaration) in config.declarations() {
            tracker.declare(name, declaration);
        }
        tracker
    }

    /// Installs the callback receiving construction and registration errors.
    /// Without one they are only logged.
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Context, &StatsError, &[String]) + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Number of collectors materialized so far.
    pub fn materialized(&self) -> usize {
        self.canonical.lock().values().map(Vec::len).sum()
    }

    /// Stores construction intent for `name`. Has no effect on collectors
    /// that were already materialized.
    pub fn declare(&self, name: &str, declaration: Declaration) {
        self.declarations.declare(name, declaration);
    }

    /// Turns increments of `name` into histogram observations.
    pub fn declare_histogram(&self, name: &str, opts: HistogramOptions) {
        self.declare(name, Declaration::Histogram(opts));
    }

    /// Turns increments of `name` into summary observations.
    pub fn declare_summary(&self, name: &str, opts: SummaryOptions) {
        self.declare(name, Declaration::Summary(opts));
    }

    pub fn declare_counter(&self, name: &str, opts: CounterOptions) {
        self.declare(name, Declaration::Counter(opts));
    }

    pub fn declare_gauge(&self, name: &str, opts: GaugeOptions) {
        self.declare(name, Declaration::Gauge(opts));
    }

    fn collect(
        &self,
        ctx: &Context,
        kind: MeasurementKind,
        name: &str,
        value: f64,
        labels_and_values: &[&str],
    ) {
        with_pooled(|labels| {
            labels.fill(ctx.labels(), labels_and_values);
            let entry = match self.lookup(name, labels) {
                Some(entry) => entry,
                None => self.materialize(ctx, kind, name, labels),
            };
            entry.apply(labels, value);
        })
    }

    fn lookup(&self, name: &str, labels: &LabelSet) -> Option<Arc<CollectorEntry>> {
        let by_name = self.collectors.pin();
        let by_keys = by_name.get(name)?;
        let by_keys = by_keys.pin();
        let entry = by_keys.get(&labels.key_fingerprint())?;
        // fingerprints may collide, key sets may not
        labels.has_keys(&entry.label_keys[..]).then(|| Arc::clone(entry))
    }

    fn materialize(
        &self,
        ctx: &Context,
        kind: MeasurementKind,
        name: &str,
        labels: &LabelSet,
    ) -> Arc<CollectorEntry> {
        let (entry, failure) = {
            let mut canonical = self.canonical.lock();
            if let Some(entry) = self.lookup(name, labels) {
                return entry;
            }

            let sanitized = sanitize(name);
            let existing = canonical.get(sanitized.as_ref()).and_then(|entries| {
                entries
                    .iter()
                    .find(|e| labels.has_keys(&e.label_keys[..]))
                    .cloned()
            });
            let (entry, failure) = match existing {
                Some(entry) => (entry, None),
                None => {
                    let (entry, failure) = self.create(kind, &sanitized, labels);
                    canonical
                        .entry(sanitized.clone().into_owned())
                        .or_default()
                        .push(Arc::clone(&entry));
                    (entry, failure)
                }
            };

            self.remember(name, labels.key_fingerprint(), &entry);
            if sanitized != name {
                self.remember(&sanitized, labels.key_fingerprint(), &entry);
            }
            (entry, failure)
        };

        if let Some(err) = failure {
            self.report(ctx, &err, &entry.label_keys);
        }
        entry
    }

    fn create(
        &self,
        kind: MeasurementKind,
        name: &str,
        labels: &LabelSet,
    ) -> (Arc<CollectorEntry>, Option<StatsError>) {
        let declaration = self.declarations.resolve(name, kind);
        let keys: Vec<&str> = labels.keys().collect();

        let (collector, failure) = match Collector::build(&declaration, name, &keys, &self.naming)
        {
            Ok(collector) => {
                let failure = collector.register(&self.registry).err().map(|source| {
                    StatsError::Register {
                        kind: collector.kind(),
                        name: name.to_owned(),
                        source,
                    }
                });
                (collector, failure)
            }
            Err(source) => (
                Collector::Discard(declaration.kind()),
                Some(StatsError::Construct {
                    kind: declaration.kind(),
                    name: name.to_owned(),
                    source,
                }),
            ),
        };

        debug!(
            metric = name,
            kind = %collector.kind(),
            labels = ?keys,
            "materialized stats collector"
        );

        let entry = CollectorEntry {
            label_keys: keys.iter().map(|k| (*k).to_owned()).collect(),
            collector,
        };
        (Arc::new(entry), failure)
    }

    fn remember(&self, name: &str, fingerprint: u64, entry: &Arc<CollectorEntry>) {
        let by_name = self.collectors.pin();
        let by_keys = by_name.get_or_insert_with(name.to_owned(), papaya::HashMap::new);
        by_keys.pin().insert(fingerprint, Arc::clone(entry));
    }

    fn report(&self, ctx: &Context, err: &StatsError, label_keys: &[String]) {
        warn!(error = %err, labels = ?label_keys, "stats collector unavailable");
        if let Some(handler) = &self.error_handler {
            handler(ctx, err, label_keys);
        }
    }
}

impl Default for PrometheusTracker {
    fn default() -> Self {
        Self::new(Registry::new())
    }
}

impl fmt::Debug for PrometheusTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrometheusTracker")
            .field("naming", &self.naming)
            .field("declarations", &self.declarations)
            .field("materialized", &self.materialized())
            .field("error_handler", &self.error_handler.is_some())
            .finish_non_exhaustive()
    }
}

impl Adder for PrometheusTracker {
    /// Adds to a counter, or observes into a declared histogram or summary.
    fn add(&self, ctx: &Context, name: &str, increment: f64, labels_and_values: &[&str]) {
        self.collect(ctx, MeasurementKind::Increment, name, increment, labels_and_values);
    }
}

impl Setter for PrometheusTracker {
    /// Sets a gauge, or observes into a declared histogram or summary.
    fn set(&self, ctx: &Context, name: &str, absolute: f64, labels_and_values: &[&str]) {
        self.collect(ctx, MeasurementKind::Absolute, name, absolute, labels_and_values);
    }
}

impl TrackerProvider for PrometheusTracker {
    fn stats_tracker(&self) -> &dyn Tracker {
        self
    }
}
