//! Sweeper for abandoned registrations.
//!
//! # Tracing Events
//!
//! - `accounts.cleanup` - Pass finished (deleted count) or failed

use crate::clock::Clock;
use crate::error::{AccountError, Result};
use crate::store::{AccountFilter, AccountStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// How often the sweeper runs and how old an unconfirmed account must be
/// before it is removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CleanupConfig {
    /// Default: 24 hours
    pub period: Duration,
    /// Default: 48 hours
    pub retention: Duration,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(24 * 60 * 60),
            retention: Duration::from_secs(48 * 60 * 60),
        }
    }
}

/// Deletes unconfirmed accounts older than the retention window.
///
/// Each pass is one predicate delete evaluated by the store, so an account
/// confirmed while the pass runs is never removed.
pub struct CleanupSweeper {
    store: Arc<dyn AccountStore>,
    clock: Arc<dyn Clock>,
    config: CleanupConfig,
}

impl std::fmt::Debug for CleanupSweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupSweeper")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CleanupSweeper {
    /// Fails with `Configuration` if the period or retention is zero.
    pub fn new(
        store: Arc<dyn AccountStore>,
        clock: Arc<dyn Clock>,
        config: CleanupConfig,
    ) -> Result<Self> {
        if config.period.is_zero() {
            return Err(AccountError::configuration("cleanup period must be positive"));
        }
        if config.retention.is_zero() {
            return Err(AccountError::configuration("cleanup retention must be positive"));
        }
        Ok(Self {
            store,
            clock,
            config,
        })
    }

    /// Run a single pass. Returns the number of accounts deleted.
    pub async fn sweep_once(&self) -> Result<u64> {
        let retention = chrono::Duration::from_std(self.config.retention)
            .unwrap_or(chrono::Duration::MAX);
        let cutoff = self
            .clock
            .now()
            .checked_sub_signed(retention)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC);

        let deleted = self
            .store
            .delete_where(&AccountFilter::unconfirmed_before(cutoff))
            .await?;

        tracing::info!(
            target: "accounts.cleanup",
            deleted,
            cutoff = %cutoff,
            "Cleanup pass finished"
        );
        Ok(deleted)
    }

    /// Spawn the periodic task. The first pass runs one period after start.
    pub fn start(self) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let period = self.config.period;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(
                target: "accounts.cleanup",
                period_secs = period.as_secs(),
                retention_secs = self.config.retention.as_secs(),
                "Cleanup sweeper started"
            );

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = interval.tick() => {
                        // A failed pass is retried on the next tick.
                        if let Err(err) = self.sweep_once().await {
                            tracing::error!(
                                target: "accounts.cleanup",
                                error = %err,
                                "Cleanup pass failed"
                            );
                        }
                    }
                }
            }

            tracing::info!(target: "accounts.cleanup", "Cleanup sweeper stopped");
        });

        SweeperHandle {
            shutdown_tx,
            handle,
        }
    }
}

/// Handle to a running [`CleanupSweeper`].
pub struct SweeperHandle {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweeper to stop and wait for it.
    ///
    /// A pass already in progress is allowed to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;

        match tokio::time::timeout(Duration::from_secs(5), self.handle).await {
            Ok(_) => tracing::debug!("Cleanup sweeper stopped cleanly"),
            Err(_) => tracing::warn!("Cleanup sweeper did not stop within timeout"),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
