// Library root module for ambient-stats
// This file defines the public API and module structure for the ambient-stats
// library: tracker interfaces, context labels and the Prometheus-backed tracker
//
// Numan Thabit 2025 Nov

pub mod config;
pub mod context;
pub mod errors;
pub mod mock;
pub mod noop;
pub mod prom;
pub mod tracker;

pub use config::TrackerConfig;
pub use context::Context;
pub use errors::StatsError;
pub use mock::TrackerMock;
pub use noop::NoOp;
pub use prom::{
    CounterOptions, Declaration, GaugeOptions, HistogramOptions, PrometheusTracker,
    SummaryOptions,
};
pub use tracker::{Adder, AdderFn, Setter, SetterFn, Tracker, TrackerProvider};
