//! Shutdown Coordinator: process-wide draining flag, active-request
//! counter, and the signal-driven drain sequence. The same
//! atomic-flag-flipped-from-a-signal-task shape the browser pool uses for
//! its own shutdown flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

#[derive(Default)]
pub struct Coordinator {
    draining: AtomicBool,
    active: AtomicI64,
}

impl Coordinator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    pub fn mark_draining(&self) {
        self.draining.store(true, Ordering::SeqCst);
    }

    pub fn inc(&self) {
        self.active.fetch_add(1, Ordering::SeqCst);
    }

    pub fn dec(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn active(&self) -> i64 {
        self.active.load(Ordering::SeqCst)
    }

    /// Wait for `active()` to reach zero, or `timeout` to elapse first.
    /// Returns `true` if drained cleanly, `false` on timeout.
    pub async fn await_drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.active() > 0 {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        true
    }
}

/// Waits for SIGINT or (on unix) SIGTERM.
pub async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn draining_idempotent() {
        let coord = Coordinator::new();
        coord.mark_draining();
        coord.mark_draining();
        assert!(coord.is_draining());
    }

    #[tokio::test]
    async fn drain_returns_immediately_when_no_active_requests() {
        let coord = Coordinator::new();
        assert!(coord.await_drain(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn drain_times_out_with_active_requests() {
        let coord = Coordinator::new();
        coord.inc();
        assert!(!coord.await_drain(Duration::from_millis(20)).await);
    }
}
