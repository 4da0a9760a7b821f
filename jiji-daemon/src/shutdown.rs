//! Signal-driven graceful shutdown (spec.md §4.K, §5).
//!
//! A termination signal sets a flag observed at the top of every loop
//! iteration and between major steps; in-flight subprocess calls are left
//! to complete on their own bounded deadlines. No in-flight request
//! draining is needed here -- a tick has no inbound connections to
//! drain, only outbound calls that already carry their own timeouts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tracing::info;

/// Poll interval for [`ShutdownController::wait_until_triggered`]: short
/// enough to notice a signal promptly, long enough not to busy-wait.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
pub struct ShutdownController {
    flag: Arc<AtomicBool>,
}

impl ShutdownController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Installs `SIGTERM`/`SIGINT` handlers and spawns a task that waits
    /// on them, setting the shutdown flag once either fires.
    ///
    /// # Errors
    ///
    /// Returns an error if the process's signal handlers cannot be
    /// installed (this only happens under resource exhaustion).
    pub fn spawn_signal_listener(&self) -> anyhow::Result<JoinHandle<()>> {
        let flag = Arc::clone(&self.flag);
        let mut term = signal(SignalKind::terminate()).context("install SIGTERM handler")?;
        let mut interrupt = signal(SignalKind::interrupt()).context("install SIGINT handler")?;

        Ok(tokio::spawn(async move {
            tokio::select! {
                _ = term.recv() => info!("received SIGTERM"),
                _ = interrupt.recv() => info!("received SIGINT"),
            }

            flag.store(true, Ordering::SeqCst);
        }))
    }

    /// Resolves as soon as the shutdown flag is set, so the reconciliation
    /// loop's inter-tick sleep can be raced against it with `tokio::select!`
    /// instead of waiting out the full `loop_interval` before noticing a
    /// termination signal.
    pub async fn wait_until_triggered(&self) {
        while !self.is_shutting_down() {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}
