//! Prometheus metrics for uploads, reconciliation and cleanup

use once_cell::sync::Lazy;
use prometheus::{register_histogram, register_int_counter_vec, Histogram, IntCounterVec};
use std::time::Duration;

static UPLOADS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "posting_attachment_uploads_total",
        "Blob uploads issued for attachments (by media kind and outcome)",
        &["kind", "status"]
    )
    .expect("failed to register posting_attachment_uploads_total")
});

/// Wall time of a whole upload batch, from first put to last completion
static UPLOAD_BATCH_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "posting_attachment_upload_batch_seconds",
        "Duration of concurrent upload batches",
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("failed to register posting_attachment_upload_batch_seconds")
});

static SLOT_ACTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "posting_reconcile_slot_actions_total",
        "Per-position reconciliation decisions",
        &["action"]
    )
    .expect("failed to register posting_reconcile_slot_actions_total")
});

static CLEANUP_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "posting_cleanup_failures_total",
        "Content items or blobs that could not be reclaimed",
        &["path"]
    )
    .expect("failed to register posting_cleanup_failures_total")
});

pub fn record_upload(kind: &str, status: &str) {
    UPLOADS_TOTAL.with_label_values(&[kind, status]).inc();
}

pub fn record_upload_batch_duration(duration: Duration) {
    UPLOAD_BATCH_SECONDS.observe(duration.as_secs_f64());
}

pub fn record_slot_action(action: &str) {
    SLOT_ACTIONS_TOTAL.with_label_values(&[action]).inc();
}

pub fn record_slot_actions(action: &str, count: usize) {
    SLOT_ACTIONS_TOTAL
        .with_label_values(&[action])
        .inc_by(count as u64);
}

/// `path` is `edit` for post-commit cleanup, `cascade` for parent deletion
pub fn record_cleanup_failures(path: &str, count: usize) {
    CLEANUP_FAILURES_TOTAL
        .with_label_values(&[path])
        .inc_by(count as u64);
}
