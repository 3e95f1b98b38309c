// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Reaper
//!
//! Background task that deletes sessions whose expiry lies further in the
//! past than the configured retention window. Lazy expiry already makes
//! stale pending sessions unconfirmable; the reaper only bounds storage.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken`, the same pattern as the
//! server's graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::SessionStore;
use crate::clock::Clock;

/// Default interval between purge sweeps.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Periodic purger of long-expired sessions.
pub struct SessionReaper {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    retention: chrono::Duration,
    sweep_interval: Duration,
}

impl SessionReaper {
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>, retention: Duration) -> Self {
        Self {
            store,
            clock,
            retention: chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::MAX),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(reaper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.sweep_interval.as_secs(),
            retention_secs = self.retention.num_seconds(),
            "Session reaper starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Session reaper shutting down");
                return;
            }

            self.sweep().await;

            tokio::select! {
                _ = tokio::time::sleep(self.sweep_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Session reaper shutting down");
                    return;
                }
            }
        }
    }

    /// Execute one sweep. Returns the number of purged sessions.
    pub async fn sweep(&self) -> usize {
        let Some(cutoff) = self.clock.now().checked_sub_signed(self.retention) else {
            return 0;
        };

        match self.store.purge_expired(cutoff).await {
            Ok(0) => 0,
            Ok(count) => {
                info!(count, cutoff = %cutoff, "Session reaper: purged expired sessions");
                count
            }
            Err(e) => {
                warn!(error = %e, "Session reaper: purge failed");
                0
            }
        }
    }
}
