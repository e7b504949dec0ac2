//! Rate window sweeper background task.
//!
//! Periodically drops rate-limit keys whose newest timestamp has left the
//! window, so memory tracks active callers rather than every caller seen.
//!
//! # Graceful Shutdown
//!
//! The task exits when the cancellation token is triggered.

use crate::services::AdmissionController;
use common::clock::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Sweep interval used when the window is longer than this.
pub const MAX_SWEEP_INTERVAL_SECONDS: u64 = 60;

/// Interval for a given window: the window itself, capped at
/// `MAX_SWEEP_INTERVAL_SECONDS`.
pub fn sweep_interval(window_seconds: u64) -> Duration {
    Duration::from_secs(window_seconds.clamp(1, MAX_SWEEP_INTERVAL_SECONDS))
}

/// Run the sweeper loop until `cancel_token` fires.
pub async fn start_rate_window_sweeper(
    controller: Arc<AdmissionController>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    info!(
        target: "gateway.task.rate_window_sweep",
        interval_seconds = interval.as_secs(),
        "Starting rate window sweeper"
    );

    let mut ticker = tokio::time::interval(interval);
    // First tick completes immediately; nothing to sweep yet
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = controller.limiter().sweep(clock.now());
                if removed > 0 {
                    debug!(
                        target: "gateway.task.rate_window_sweep",
                        removed = removed,
                        tracked = controller.limiter().tracked_keys(),
                        "Swept idle rate limit keys"
                    );
                }
            }
            _ = cancel_token.cancelled() => {
                info!(
                    target: "gateway.task.rate_window_sweep",
                    "Rate window sweeper received shutdown signal, exiting"
                );
                break;
            }
        }
    }
}
