use ambient_stats::{
    Adder, Context as StatsContext, HistogramOptions, PrometheusTracker, Setter, TrackerConfig,
};
use anyhow::{anyhow, Context, Result};
use prometheus::{Encoder, Registry, TextEncoder};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const WORKERS: usize = 8;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing().context("initialize tracing subscriber")?;

    if let Err(err) = run().await {
        tracing::error!(error = ?err, "fatal stats demo error");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = TrackerConfig::load(config_path.as_deref())
        .context("load configuration from file and environment")?;
    let rounds: u32 = match std::env::var("DEMO_ROUNDS") {
        Ok(raw) => raw.parse().with_context(|| format!("invalid DEMO_ROUNDS: {raw}"))?,
        Err(_) => 3,
    };

    let registry = Registry::new();
    let tracker = PrometheusTracker::from_config(registry, &config).with_error_handler(
        |_ctx, err, labels| warn!(error = %err, labels = ?labels, "stats collector rejected"),
    );
    if !config.histograms.contains_key("request_latency_seconds") {
        tracker.declare_histogram(
            "request.latency.seconds",
            HistogramOptions::with_buckets([1e-4, 1e-3, 1e-2, 1e-1, 1.0]).help("request latency"),
        );
    }
    let tracker = Arc::new(tracker);

    info!(
        namespace = ?config.namespace,
        workers = WORKERS,
        rounds = rounds,
        "stats demo online"
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut round = 0;
    while round < rounds {
        tokio::select! {
            _ = ticker.tick() => {
                round += 1;
                simulate_round(&tracker, round).await?;
                info!(round = round, collectors = tracker.materialized(), "round recorded");
            }
            res = tokio::signal::ctrl_c() => {
                if let Err(err) = res {
                    warn!(error = %err, "ctrl_c listener error");
                }
                info!("Shutdown signal received, exiting");
                break;
            }
        }
    }

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&tracker.registry().gather(), &mut buffer)
        .context("encode metrics")?;
    println!("{}", String::from_utf8(buffer).context("metrics are not utf-8")?);
    Ok(())
}

async fn simulate_round(tracker: &Arc<PrometheusTracker>, round: u32) -> Result<()> {
    let base = StatsContext::background().with_labels(&["round", round.to_string().as_str()]);
    let mut handles = Vec::with_capacity(WORKERS);
    for worker in 0..WORKERS {
        let tracker = Arc::clone(tracker);
        let ctx = base.with_labels(&["worker", worker.to_string().as_str()]);
        handles.push(tokio::spawn(async move {
            let started = Instant::now();
            let route = if worker % 2 == 0 { "/orders" } else { "/quotes" };
            tracker.add(&ctx, "requests.total", 1.0, &["route", route]);
            tracker.add(
                &ctx,
                "request.latency.seconds",
                started.elapsed().as_secs_f64(),
                &[],
            );
            debug!(worker = worker, route = route, "request recorded");
        }));
    }
    for handle in handles {
        handle.await.map_err(|err| anyhow!("worker task failed: {err}"))?;
    }
    tracker.set(
        &StatsContext::background(),
        "workers.active",
        WORKERS as f64,
        &[],
    );
    Ok(())
}

fn init_tracing() -> Result<()> {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("tracing subscriber init: {err}"))
}
