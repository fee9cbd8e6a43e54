// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Graceful shutdown coordination.
//!
//! SIGINT/SIGTERM clear a process-wide run flag; the uplink session
//! observes the flag between receive iterations (its receive call is
//! bounded), so shutdown latency is at most one receive timeout. The same
//! flag can be cleared programmatically for tests and embedding.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

// =============================================================================
// ShutdownCoordinator
// =============================================================================

/// Holds the run flag and installs the signal handlers.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    run: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    /// Creates a coordinator with the run flag raised.
    pub fn new() -> Self {
        Self {
            run: Arc::new(AtomicBool::new(true)),
        }
    }

    /// The shared run flag; `false` means shut down.
    pub fn run_flag(&self) -> Arc<AtomicBool> {
        self.run.clone()
    }

    /// Returns `true` while the process should keep running.
    pub fn is_running(&self) -> bool {
        self.run.load(Ordering::SeqCst)
    }

    /// Clears the run flag. Idempotent.
    pub fn trigger(&self) {
        if self
            .run
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            info!("shutdown triggered");
        }
    }

    /// Waits for SIGINT or SIGTERM, then clears the run flag.
    pub async fn wait_for_signal(&self) {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(error = %e, "failed to register SIGTERM handler");
                    return;
                }
            };
            let mut sigint = match signal(SignalKind::interrupt()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(error = %e, "failed to register SIGINT handler");
                    return;
                }
            };

            tokio::select! {
                _ = sigterm.recv() => info!("received SIGTERM"),
                _ = sigint.recv() => info!("received SIGINT"),
            }
        }

        #[cfg(not(unix))]
        {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received Ctrl+C");
            }
        }

        self.trigger();
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("running", &self.is_running())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_clears_flag() {
        let coordinator = ShutdownCoordinator::new();
        let flag = coordinator.run_flag();

        assert!(coordinator.is_running());
        assert!(flag.load(Ordering::SeqCst));

        coordinator.trigger();
        assert!(!coordinator.is_running());
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[test]
    fn test_trigger_is_idempotent() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.trigger();
        coordinator.trigger();
        assert!(!coordinator.is_running());
    }

    #[test]
    fn test_clones_share_flag() {
        let coordinator = ShutdownCoordinator::new();
        let clone = coordinator.clone();
        clone.trigger();
        assert!(!coordinator.is_running());
    }
}
