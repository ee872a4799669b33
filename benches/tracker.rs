use ambient_stats::{Adder, Context, HistogramOptions, PrometheusTracker, Setter};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use prometheus::{CounterVec, Opts, Registry};
use std::hint::black_box;

fn bench_add_vs_raw_counter(c: &mut Criterion) {
    let mut group = c.benchmark_group("counter_add");

    let raw = CounterVec::new(Opts::new("raw_count", "raw"), &["l", "name"]).unwrap();
    group.bench_function("raw_counter_vec", |b| {
        b.iter(|| {
            raw.with_label_values(&["v", "n"]).inc_by(black_box(1.0));
        })
    });

    let tracker = PrometheusTracker::new(Registry::new());
    let ctx = Context::background().with_labels(&["l", "v"]);
    tracker.add(&ctx, "some_count", 1.0, &["name", "n"]);
    group.bench_function("tracker_add", |b| {
        b.iter(|| tracker.add(&ctx, "some_count", black_box(1.0), &["name", "n"]))
    });

    // raw name differs from the sanitized one, both are cached
    tracker.add(&ctx, "some.count", 1.0, &["name", "n"]);
    group.bench_function("tracker_add_unsanitized", |b| {
        b.iter(|| tracker.add(&ctx, "some.count", black_box(1.0), &["name", "n"]))
    });

    group.finish();
}

fn bench_label_width(c: &mut Criterion) {
    let mut group = c.benchmark_group("label_width");
    let tracker = PrometheusTracker::new(Registry::new());
    let ctx = Context::background();

    for width in [1usize, 4, 16, 24] {
        let keys: Vec<String> = (0..width).map(|i| format!("k{i}")).collect();
        let labels: Vec<&str> = keys.iter().flat_map(|k| [k.as_str(), "v"]).collect();
        let name = format!("wide_{width}");
        tracker.set(&ctx, &name, 0.0, &labels);

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(width), &labels, |b, labels| {
            b.iter(|| tracker.set(&ctx, &name, black_box(1.0), labels))
        });
    }
    group.finish();
}

fn bench_histogram_observe(c: &mut Criterion) {
    let tracker = PrometheusTracker::new(Registry::new());
    tracker.declare_histogram(
        "latency_seconds",
        HistogramOptions::with_buckets([1e-4, 1e-3, 1e-2, 1e-1, 1.0]),
    );
    let ctx = Context::background().with_labels(&["route", "/orders"]);

    c.bench_function("histogram_observe", |b| {
        b.iter(|| tracker.add(&ctx, "latency_seconds", black_box(0.004), &[]))
    });
}

criterion_group!(
    benches,
    bench_add_vs_raw_counter,
    bench_label_width,
    bench_histogram_observe
);
criterion_main!(benches);
