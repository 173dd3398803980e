//! Background reconciler
//!
//! Periodically pushes pending records while the process runs. Each tick is
//! cheap when nothing is pending: only the cache is read.

use crate::engine::SyncEngine;
use crate::error::{SyncError, SyncResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Handle to a running reconcile loop
pub struct Reconciler {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Reconciler {
    /// Start reconciling every `interval`; the first pass runs immediately
    pub fn spawn(engine: Arc<SyncEngine>, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let period = interval.max(MIN_INTERVAL);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(interval_ms = period.as_millis() as u64, "Reconciler started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        tick(&engine).await;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::info!("Reconciler stopped");
        });

        Self { shutdown_tx, handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop the loop and wait for an in-flight pass to finish
    pub async fn shutdown(self) -> SyncResult<()> {
        // Receiver gone means the task already ended
        let _ = self.shutdown_tx.send(true);
        self.handle
            .await
            .map_err(|e| SyncError::Internal(format!("Reconciler task failed: {}", e)))
    }
}

/// One reconcile pass; failures are logged and retried next tick
pub async fn tick(engine: &SyncEngine) -> Option<usize> {
    let pending = match engine.pending_count().await {
        Ok(0) => return Some(0),
        Ok(n) => n,
        Err(e) => {
            tracing::error!(error = %e, "Could not read pending records");
            return None;
        }
    };

    match engine.reconcile_pending().await {
        Ok(synced) => {
            if synced < pending {
                tracing::debug!(synced, pending, "Records still pending after pass");
            }
            Some(synced)
        }
        Err(e) => {
            tracing::error!(error = %e, "Reconcile pass failed");
            None
        }
    }
}
