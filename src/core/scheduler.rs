//! Periodic auto-scan trigger.
//!
//! Lives outside the coordinator: it only calls `start_scan` on a timer and
//! re-reads the configuration every round, so toggling auto-scan or changing
//! the interval takes effect without a restart.

use crate::core::coordinator::{ScanCoordinator, ScanOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How often a disabled scheduler re-checks the configuration.
const IDLE_POLL: Duration = Duration::from_secs(60);

/// Run scans every `scanIntervalMinutes` while `autoScan` is enabled.
///
/// Runs until the cancellation token is triggered.
pub async fn run_auto_scan(coordinator: Arc<ScanCoordinator>, cancel: CancellationToken) {
    tracing::info!("Auto-scan scheduler started");

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let config = coordinator.config().get();
        let wait = if config.auto_scan {
            tracing::debug!("Auto-scan triggered");
            let summary = tokio::select! {
                summary = coordinator.start_scan() => summary,
                _ = cancel.cancelled() => break,
            };
            if summary.outcome == ScanOutcome::AlreadyRunning {
                tracing::debug!("Auto-scan skipped, a scan is already running");
            }
            Duration::from_secs(config.scan_interval_minutes.max(1) * 60)
        } else {
            IDLE_POLL
        };

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = cancel.cancelled() => break,
        }
    }

    tracing::info!("Auto-scan scheduler stopped");
}
