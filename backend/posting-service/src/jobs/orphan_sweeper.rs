//! Orphan Sweeper Background Job
//!
//! Content items become unreferenced when a request dies between creating
//! records and committing its parent, or when post-commit cleanup fails.
//! This job finds items no post or message references, older than a grace
//! period, and reclaims each one (blob first, then record). A blob another
//! content item still carries stays; only the orphaned record goes.
//!
//! The grace period must outlast any in-flight request: a record created
//! moments ago is legitimately unreferenced until its parent commits.

use crate::config::SweeperConfig;
use crate::db::OrphanScanner;
use crate::error::{AppError, CleanupTarget, Result};
use crate::metrics::orphan_sweeper as metrics;
use crate::services::AttachmentEngine;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use uuid::Uuid;

/// Outcome of one sweep cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub found: usize,
    pub reclaimed: usize,
    pub failed: usize,
}

pub struct OrphanSweeper {
    scanner: Arc<dyn OrphanScanner>,
    engine: AttachmentEngine,
    config: SweeperConfig,
}

impl OrphanSweeper {
    pub fn new(
        scanner: Arc<dyn OrphanScanner>,
        engine: AttachmentEngine,
        config: SweeperConfig,
    ) -> Self {
        Self {
            scanner,
            engine,
            config,
        }
    }

    /// Reclaim one batch of orphans. Individual failures are counted, not
    /// fatal; only a failed scan fails the cycle.
    pub async fn run_cycle(&self) -> Result<SweepReport> {
        let grace = chrono::Duration::from_std(Duration::from_secs(self.config.grace_period_secs))
            .map_err(|e| AppError::Internal(format!("invalid grace period: {}", e)))?;
        let cutoff = Utc::now() - grace;

        let orphans = self
            .scanner
            .find_orphans(cutoff, self.config.batch_size)
            .await?;
        metrics::set_orphans_found(orphans.len() as i64);

        if orphans.is_empty() {
            tracing::debug!("No orphaned content items");
            return Ok(SweepReport::default());
        }

        tracing::info!(orphans = orphans.len(), cutoff = %cutoff, "Reclaiming orphaned content items");

        let urls: Vec<String> = orphans
            .iter()
            .filter_map(|item| item.payload.blob_url().map(str::to_string))
            .collect();
        let ids: Vec<Uuid> = orphans.iter().map(|item| item.id).collect();
        let urls_in_use = self.scanner.urls_in_use(&urls, &ids).await?;
        if !urls_in_use.is_empty() {
            tracing::info!(
                shared_blobs = urls_in_use.len(),
                "Keeping blobs still carried by other content items"
            );
        }

        let failures = self.engine.reclaim(&orphans, &urls_in_use).await;
        let failed_ids: HashSet<_> = failures
            .iter()
            .filter_map(|failure| match &failure.target {
                CleanupTarget::Item { content_id, .. } => Some(*content_id),
                CleanupTarget::Blob { .. } => None,
            })
            .collect();

        for failure in &failures {
            tracing::warn!(failure = %failure, "Failed to reclaim orphaned content item");
        }

        let mut report = SweepReport {
            found: orphans.len(),
            ..SweepReport::default()
        };
        for item in &orphans {
            if failed_ids.contains(&item.id) {
                metrics::record_orphan_failed(item.kind().as_str());
                report.failed += 1;
            } else {
                metrics::record_orphan_deleted(item.kind().as_str());
                report.reclaimed += 1;
            }
        }

        Ok(report)
    }
}

/// Run sweep cycles forever on the configured interval.
pub async fn start_orphan_sweeper(sweeper: OrphanSweeper) {
    let interval = Duration::from_secs(sweeper.config.interval_secs);

    tracing::info!(
        interval_secs = sweeper.config.interval_secs,
        grace_period_secs = sweeper.config.grace_period_secs,
        batch_size = sweeper.config.batch_size,
        "Starting orphan sweeper background job"
    );

    loop {
        sleep(interval).await;

        let cycle_start = Instant::now();
        match sweeper.run_cycle().await {
            Ok(report) => {
                metrics::record_sweep_run("success");
                metrics::record_sweep_duration("total", cycle_start.elapsed());
                tracing::info!(
                    found = report.found,
                    reclaimed = report.reclaimed,
                    failed = report.failed,
                    duration_ms = cycle_start.elapsed().as_millis(),
                    "Orphan sweep cycle completed"
                );
            }
            Err(e) => {
                metrics::record_sweep_run("error");
                metrics::record_sweep_duration("total", cycle_start.elapsed());
                tracing::error!(error = %e, duration_ms = cycle_start.elapsed().as_millis(), "Orphan sweep failed");
            }
        }
    }
}
