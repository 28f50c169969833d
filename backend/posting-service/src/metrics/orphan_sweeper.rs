//! Prometheus metrics for the orphan sweeper background job
//!
//! Tracks sweep cycles, reclaimed items and failures

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, HistogramVec,
    IntCounterVec, IntGauge,
};
use std::time::Duration;

/// Total number of sweep cycles run (success/error)
static SWEEP_RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "orphan_sweeper_runs_total",
        "Total number of orphan sweep cycles (success/error)",
        &["status"]
    )
    .expect("failed to register orphan_sweeper_runs_total")
});

static SWEEP_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "orphan_sweeper_duration_seconds",
        "Duration of orphan sweep operations",
        &["operation"],
        vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("failed to register orphan_sweeper_duration_seconds")
});

/// Unreferenced items found in the last cycle
static ORPHANS_FOUND: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "orphan_sweeper_orphans_found",
        "Unreferenced content items found in last sweep cycle"
    )
    .expect("failed to register orphan_sweeper_orphans_found")
});

static ORPHANS_DELETED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "orphan_sweeper_deleted_total",
        "Total orphaned content items reclaimed",
        &["content_type"]
    )
    .expect("failed to register orphan_sweeper_deleted_total")
});

static ORPHANS_FAILED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "orphan_sweeper_failed_total",
        "Orphaned content items that could not be reclaimed",
        &["content_type"]
    )
    .expect("failed to register orphan_sweeper_failed_total")
});

/// Record a sweep cycle completion
pub fn record_sweep_run(status: &str) {
    SWEEP_RUNS_TOTAL.with_label_values(&[status]).inc();
}

pub fn record_sweep_duration(operation: &str, duration: Duration) {
    SWEEP_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration.as_secs_f64());
}

pub fn set_orphans_found(count: i64) {
    ORPHANS_FOUND.set(count);
}

pub fn record_orphan_deleted(content_type: &str) {
    ORPHANS_DELETED_TOTAL
        .with_label_values(&[content_type])
        .inc();
}

pub fn record_orphan_failed(content_type: &str) {
    ORPHANS_FAILED_TOTAL
        .with_label_values(&[content_type])
        .inc();
}
