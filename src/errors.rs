// Error types and error handling module
// This file defines the errors surfaced by the stats tracker. Measurement
// calls never return them; they reach the registered error handler instead.
//
// Numan Thabit 2025 Nov

use crate::prom::CollectorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    /// The backend refused to build the collector, e.g. the sanitized name or
    /// a label key is not a legal Prometheus identifier.
    #[error("construct {kind} collector {name:?}: {source}")]
    Construct {
        kind: CollectorKind,
        name: String,
        #[source]
        source: prometheus::Error,
    },
    /// The collector was built but the registry rejected it, typically a
    /// conflicting descriptor for the same fully-qualified name.
    #[error("register {kind} collector {name:?}: {source}")]
    Register {
        kind: CollectorKind,
        name: String,
        #[source]
        source: prometheus::Error,
    },
    #[error("load configuration: {0}")]
    Config(#[from] config::ConfigError),
}

impl StatsError {
    /// Metric name the failure relates to, if any.
    pub fn metric_name(&self) -> Option<&str> {
        match self {
            StatsError::Construct { name, .. } | StatsError::Register { name, .. } => Some(name),
            StatsError::Config(_) => None,
        }
    }
}
