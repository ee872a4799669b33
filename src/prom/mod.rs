// Prometheus-backed stats tracker
// Resolves free-form measurement calls to lazily registered Prometheus
// collectors.
//
// Numan Thabit 2025 Nov

pub mod collectors;
pub mod declarations;
pub mod labels;
pub mod sanitize;
pub mod summary;
pub mod tracker;

pub use collectors::{CollectorKind, MeasurementKind};
pub use declarations::{
    CounterOptions, Declaration, Declarations, GaugeOptions, HistogramOptions, SummaryOptions,
};
pub use labels::LabelSet;
pub use sanitize::sanitize;
pub use summary::SummaryVec;
pub use tracker::{ErrorHandler, PrometheusTracker, DEFAULT_HELP};
