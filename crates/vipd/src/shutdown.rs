//! Shutdown coordination.

use common::Result;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Observes termination requests and triggers cooperative cancellation.
///
/// Two separate signals reach the leadership controller: `cancel`
/// unblocks an in-flight campaign, `stop` unblocks the cadence wait
/// between campaigns. Both are single-writer (this task) and idempotent
/// to observe.
pub struct ShutdownCoordinator {
    cancel: CancellationToken,
    stop: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new(cancel: CancellationToken, stop: CancellationToken) -> Self {
        Self { cancel, stop }
    }

    /// Wait for SIGINT or SIGTERM, then fire both tokens once.
    ///
    /// Later termination requests have no additional effect: the
    /// installed handlers keep absorbing the signals and the tokens are
    /// already cancelled.
    pub async fn run(self) -> Result<()> {
        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = interrupt.recv() => info!("Received SIGINT"),
            _ = terminate.recv() => info!("Received SIGTERM"),
        }

        self.cancel.cancel();
        self.stop.cancel();
        Ok(())
    }
}
