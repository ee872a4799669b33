// Tracker traits
// This file defines the measurement interfaces application code depends on,
// independent of the metric backend that eventually stores the values.
//
// Numan Thabit 2025 Nov

use crate::context::Context;

/// Incremental metric collector.
pub trait Adder {
    /// Collects an additional or observable value.
    ///
    /// `labels_and_values` is a flat `key, value, ...` list merged over the
    /// ambient labels of `ctx`.
    fn add(&self, ctx: &Context, name: &str, increment: f64, labels_and_values: &[&str]);
}

/// Absolute value collector.
pub trait Setter {
    /// Collects an absolute value, e.g. the number of open connections.
    fn set(&self, ctx: &Context, name: &str, absolute: f64, labels_and_values: &[&str]);
}

/// Full stats collector.
pub trait Tracker: Adder + Setter {}

impl<T: Adder + Setter + ?Sized> Tracker for T {}

/// Service locator for components that hold a tracker.
pub trait TrackerProvider {
    fn stats_tracker(&self) -> &dyn Tracker;
}

/// Implements [`Adder`] with a closure.
pub struct AdderFn<F>(pub F);

impl<F> Adder for AdderFn<F>
where
    F: Fn(&Context, &str, f64, &[&str]),
{
    fn add(&self, ctx: &Context, name: &str, increment: f64, labels_and_values: &[&str]) {
        (self.0)(ctx, name, increment, labels_and_values)
    }
}

/// Implements [`Setter`] with a closure.
pub struct SetterFn<F>(pub F);

impl<F> Setter for SetterFn<F>
where
    F: Fn(&Context, &str, f64, &[&str]),
{
    fn set(&self, ctx: &Context, name: &str, absolute: f64, labels_and_values: &[&str]) {
        (self.0)(ctx, name, absolute, labels_and_values)
    }
}

impl<T: Adder + ?Sized> Adder for std::sync::Arc<T> {
    fn add(&self, ctx: &Context, name: &str, increment: f64, labels_and_values: &[&str]) {
        (**self).add(ctx, name, increment, labels_and_values)
    }
}

impl<T: Setter + ?Sized> Setter for std::sync::Arc<T> {
    fn set(&self, ctx: &Context, name: &str, absolute: f64, labels_and_values: &[&str]) {
        (**self).set(ctx, name, absolute, labels_and_values)
    }
}
