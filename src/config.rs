// Configuration management module
// This file handles loading the tracker configuration from an optional
// config file layered under environment variables.
//
// Numan Thabit 2025 Nov

use crate::errors::StatsError;
use crate::prom::{
    CounterOptions, Declaration, GaugeOptions, HistogramOptions, SummaryOptions, DEFAULT_HELP,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Environment variable prefix, e.g. `STATS_NAMESPACE=app`.
pub const ENV_PREFIX: &str = "STATS";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Prefix joined to every metric name with `_`
    pub namespace: Option<String>,
    /// Help text for collectors declared without one
    pub default_help: String,
    /// Constant labels attached to every collector
    pub const_labels: HashMap<String, String>,
    /// Histogram declarations keyed by metric name
    pub histograms: HashMap<String, HistogramOptions>,
    /// Summary declarations keyed by metric name
    pub summaries: HashMap<String, SummaryOptions>,
    pub counters: HashMap<String, CounterOptions>,
    pub gauges: HashMap<String, GaugeOptions>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            default_help: DEFAULT_HELP.to_owned(),
            const_labels: HashMap::new(),
            histograms: HashMap::new(),
            summaries: HashMap::new(),
            counters: HashMap::new(),
            gauges: HashMap::new(),
        }
    }
}

impl TrackerConfig {
    /// Loads `file` (if any) overridden by `STATS_*` environment variables.
    /// Nested keys use `__`, e.g. `STATS_CONST_LABELS__SERVICE=api`.
    pub fn load(file: Option<&Path>) -> Result<Self, StatsError> {
        Self::load_with_prefix(file, ENV_PREFIX)
    }

    pub fn load_with_prefix(file: Option<&Path>, env_prefix: &str) -> Result<Self, StatsError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }
        let cfg = builder
            .add_source(
                config::Environment::with_prefix(env_prefix)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;
        Ok(cfg.try_deserialize()?)
    }

    /// Every configured declaration with its metric name.
    pub fn declarations(&self) -> impl Iterator<Item = (&str, Declaration)> + '_ {
        let histograms = self
            .histograms
            .iter()
            .map(|(name, o)| (name.as_str(), Declaration::Histogram(o.clone())));
        let summaries = self
            .summaries
            .iter()
            .map(|(name, o)| (name.as_str(), Declaration::Summary(o.clone())));
        let counters = self
            .counters
            .iter()
            .map(|(name, o)| (name.as_str(), Declaration::Counter(o.clone())));
        let gauges = self
            .gauges
            .iter()
            .map(|(name, o)| (name.as_str(), Declaration::Gauge(o.clone())));
        histograms.chain(summaries).chain(counters).chain(gauges)
    }
}
