// No-op tracker
// Stub used where stats collection is disabled.
//
// Numan Thabit 2025 Nov

use crate::context::Context;
use crate::tracker::{Adder, Setter, Tracker, TrackerProvider};

/// Tracker that discards every measurement.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOp;

impl Adder for NoOp {
    /// Discards the increment, which may be negative.
    fn add(&self, _ctx: &Context, _name: &str, _increment: f64, _labels_and_values: &[&str]) {}
}

impl Setter for NoOp {
    fn set(&self, _ctx: &Context, _name: &str, _absolute: f64, _labels_and_values: &[&str]) {}
}

impl TrackerProvider for NoOp {
    fn stats_tracker(&self) -> &dyn Tracker {
        self
    }
}
