// Summary collector
// The prometheus crate ships counters, gauges and histograms only. This file
// adds a labelled summary exporting `_sum`, `_count` and optional quantiles
// over a sliding window of recent samples.
//
// Numan Thabit 2025 Nov

use parking_lot::{Mutex, RwLock};
use prometheus::core::{Collector, Desc};
use prometheus::proto::{LabelPair, Metric, MetricFamily, MetricType, Quantile, Summary};
use prometheus::Opts;
use rustc_hash::FxHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::Hasher;
use std::sync::Arc;

/// Samples kept per series for quantile estimation unless configured.
pub const DEFAULT_WINDOW: usize = 500;

/// Labelled summary, cheap to clone; clones share state.
#[derive(Clone)]
pub struct SummaryVec {
    core: Arc<SummaryCore>,
}

struct SummaryCore {
    desc: Desc,
    quantiles: Vec<f64>,
    window: usize,
    children: RwLock<HashMap<u64, Arc<SummaryChild>>>,
}

struct SummaryChild {
    label_values: Vec<String>,
    state: Mutex<SummaryState>,
}

#[derive(Default)]
struct SummaryState {
    count: u64,
    sum: f64,
    samples: VecDeque<f64>,
}

impl SummaryVec {
    pub fn new(
        opts: Opts,
        label_names: &[&str],
        quantiles: &[f64],
        window: Option<usize>,
    ) -> prometheus::Result<Self> {
        if let Some(q) = quantiles.iter().find(|q| !(0.0..=1.0).contains(*q)) {
            return Err(prometheus::Error::Msg(format!(
                "quantile {q} is outside of [0, 1]"
            )));
        }
        let window = window.unwrap_or(DEFAULT_WINDOW);
        if window == 0 && !quantiles.is_empty() {
            return Err(prometheus::Error::Msg(
                "quantile window must hold at least one sample".to_owned(),
            ));
        }
        let desc = Desc::new(
            opts.fq_name(),
            opts.help.clone(),
            label_names.iter().map(|l| (*l).to_owned()).collect(),
            opts.const_labels.clone(),
        )?;
        let mut quantiles = quantiles.to_vec();
        quantiles.sort_by(f64::total_cmp);
        quantiles.dedup();
        Ok(Self {
            core: Arc::new(SummaryCore {
                desc,
                quantiles,
                window,
                children: RwLock::new(HashMap::new()),
            }),
        })
    }

    /// Records one sample for the series selected by `label_values`, given in
    /// the order of the label names passed to [`SummaryVec::new`].
    pub fn observe(&self, label_values: &[&str], value: f64) -> prometheus::Result<()> {
        let expected = self.core.desc.variable_labels.len();
        if label_values.len() != expected {
            return Err(prometheus::Error::InconsistentCardinality {
                expect: expected,
                got: label_values.len(),
            });
        }
        let child = self.child(label_values);
        let mut state = child.state.lock();
        state.count += 1;
        state.sum += value;
        if !self.core.quantiles.is_empty() {
            if state.samples.len() == self.core.window {
                state.samples.pop_front();
            }
            state.samples.push_back(value);
        }
        Ok(())
    }

    fn child(&self, label_values: &[&str]) -> Arc<SummaryChild> {
        let hash = hash_label_values(label_values);
        if let Some(child) = self.core.children.read().get(&hash) {
            return Arc::clone(child);
        }
        let mut children = self.core.children.write();
        Arc::clone(children.entry(hash).or_insert_with(|| {
            Arc::new(SummaryChild {
                label_values: label_values.iter().map(|v| (*v).to_owned()).collect(),
                state: Mutex::new(SummaryState {
                    samples: VecDeque::with_capacity(self.core.window.min(64)),
                    ..SummaryState::default()
                }),
            })
        }))
    }
}

// Same trade-off as the crate's own metric vectors: series are keyed by a
// hash of their label values.
fn hash_label_values(label_values: &[&str]) -> u64 {
    let mut hasher = FxHasher::default();
    for value in label_values {
        hasher.write(value.as_bytes());
        hasher.write_u8(0xff);
    }
    hasher.finish()
}

impl SummaryChild {
    fn metric(&self, desc: &Desc, quantiles: &[f64]) -> Metric {
        let mut labels: Vec<LabelPair> = desc.const_label_pairs.clone();
        for (name, value) in desc.variable_labels.iter().zip(&self.label_values) {
            let mut pair = LabelPair::default();
            pair.set_name(name.clone());
            pair.set_value(value.clone());
            labels.push(pair);
        }
        labels.sort_by(|a, b| a.get_name().cmp(b.get_name()));

        let state = self.state.lock();
        let mut sorted: Vec<f64> = state.samples.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);

        let mut summary = Summary::default();
        summary.set_sample_count(state.count);
        summary.set_sample_sum(state.sum);
        let exported: Vec<Quantile> = quantiles
            .iter()
            .map(|&q| {
                let mut quantile = Quantile::default();
                quantile.set_quantile(q);
                quantile.set_value(rank(&sorted, q));
                quantile
            })
            .collect();
        summary.set_quantile(exported.into());

        let mut metric = Metric::default();
        metric.set_label(labels.into());
        metric.set_summary(summary);
        metric
    }
}

/// Nearest-rank quantile of sorted samples, NaN without samples.
fn rank(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let idx = (q * sorted.len() as f64).ceil() as usize;
    sorted[idx.saturating_sub(1).min(sorted.len() - 1)]
}

impl Collector for SummaryVec {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.core.desc]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let children = self.core.children.read();
        let metrics: Vec<Metric> = children
            .values()
            .map(|child| child.metric(&self.core.desc, &self.core.quantiles))
            .collect();

        let mut family = MetricFamily::default();
        family.set_name(self.core.desc.fq_name.clone());
        family.set_help(self.core.desc.help.clone());
        family.set_field_type(MetricType::SUMMARY);
        family.set_metric(metrics.into());
        vec![family]
    }
}
