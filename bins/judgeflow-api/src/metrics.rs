// Prometheus metrics for the Judgeflow API

use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Submissions that reached a terminal status
    pub static ref SUBMISSIONS_JUDGED: CounterVec = CounterVec::new(
        Opts::new("judgeflow_submissions_judged_total", "Total number of submissions judged"),
        &["language", "status"]
    )
    .expect("metric can be created");

    // Submissions refused before dispatch
    pub static ref SUBMISSIONS_REJECTED: CounterVec = CounterVec::new(
        Opts::new("judgeflow_submissions_rejected_total", "Total submissions rejected by validation"),
        &["reason"]
    )
    .expect("metric can be created");

    pub static ref SUBMISSIONS_QUEUED: CounterVec = CounterVec::new(
        Opts::new("judgeflow_submissions_queued_total", "Total submissions handed to the worker queue"),
        &["language"]
    )
    .expect("metric can be created");

    // Wall-clock time of a synchronous judge, in milliseconds
    pub static ref JUDGING_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "judgeflow_judging_duration_ms",
            "Time to judge one submission in milliseconds"
        )
        .buckets(vec![250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0, 60000.0]),
        &["language"]
    )
    .expect("metric can be created");
}

pub fn init_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(SUBMISSIONS_JUDGED.clone()))?;
    REGISTRY.register(Box::new(SUBMISSIONS_REJECTED.clone()))?;
    REGISTRY.register(Box::new(SUBMISSIONS_QUEUED.clone()))?;
    REGISTRY.register(Box::new(JUDGING_DURATION.clone()))?;
    Ok(())
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> prometheus::Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

pub fn record_judged(language: &str, status: &str, duration_ms: f64) {
    SUBMISSIONS_JUDGED.with_label_values(&[language, status]).inc();
    JUDGING_DURATION.with_label_values(&[language]).observe(duration_ms);
}

pub fn record_rejected(reason: &str) {
    SUBMISSIONS_REJECTED.with_label_values(&[reason]).inc();
}

pub fn record_queued(language: &str) {
    SUBMISSIONS_QUEUED.with_label_values(&[language]).inc();
}
