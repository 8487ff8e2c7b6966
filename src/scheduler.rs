//! Periodic decay sweep.
//!
//! A tokio task ticks at the configured interval and runs each sweep on a
//! blocking thread. [`SweepScheduler::stop`] signals the loop and waits for it,
//! so no sweep starts after `stop` returns.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::graph::DecayEngine;

pub struct SweepScheduler {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SweepScheduler {
    /// Start sweeping at the engine's configured interval. `None` when decay
    /// is fully disabled.
    pub fn start(engine: DecayEngine) -> Option<Self> {
        if !engine.is_active() {
            info!("decay disabled, sweep scheduler not started");
            return None;
        }
        let interval = engine.params().sweep_interval;
        Some(Self::start_with_interval(engine, interval))
    }

    /// Start sweeping every `interval`. The first sweep runs one interval after start.
    pub fn start_with_interval(engine: DecayEngine, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        info!(interval_secs = interval.as_secs(), "starting decay sweep scheduler");

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval() fires immediately; skip that tick
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown_rx.changed() => {
                        debug!("sweep scheduler received stop signal");
                        break;
                    }
                }
                if *shutdown_rx.borrow() {
                    break;
                }

                let engine = engine.clone();
                match tokio::task::spawn_blocking(move || engine.run_sweep()).await {
                    Ok(Ok(stats)) => debug!(
                        memories_updated = stats.memories_updated,
                        edges_updated = stats.edges_updated,
                        "scheduled sweep finished"
                    ),
                    Ok(Err(e)) => warn!(error = %e, "scheduled decay sweep failed"),
                    Err(e) => warn!(error = %e, "decay sweep task panicked"),
                }
            }
            info!("decay sweep scheduler stopped");
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Signal the loop to stop and wait for it. A sweep already in progress
    /// finishes first.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "sweep scheduler task ended abnormally");
        }
    }
}
