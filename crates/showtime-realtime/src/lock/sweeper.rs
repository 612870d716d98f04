//! Periodic sweep of expired locks.
//!
//! Lock operations already sweep lazily, but an event nobody touches would
//! keep showing dead locks to its viewers until the next request. The
//! sweeper bounds that staleness to one interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::manager::LockManager;

/// Spawns the sweeper. It stops when `shutdown` fires or its sender drops.
pub fn spawn_sweeper(
    locks: Arc<LockManager>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_secs = interval.as_secs(), "Lock sweeper started");

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {
                    let expired = locks.sweep_all().await;
                    if expired > 0 {
                        tracing::debug!(expired, "Periodic sweep removed expired locks");
                    }
                }
            }
        }

        tracing::info!("Lock sweeper stopped");
    })
}
