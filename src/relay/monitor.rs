//! Background relay health monitor
//!
//! Re-probes every relay on a fixed cadence so that the fast selection path
//! works from reasonably fresh flags.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use super::selector::RelaySelector;

/// Handle to a running health monitor
pub struct HealthMonitor {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl HealthMonitor {
    /// Spawn the monitor. The first refresh runs immediately.
    pub fn spawn(selector: Arc<RelaySelector>, interval: Duration) -> Self {
        let (shutdown, receiver) = watch::channel(false);
        let handle = tokio::spawn(Self::run(selector, interval, receiver));
        Self { shutdown, handle }
    }

    /// Stop the monitor and wait for the current refresh to finish
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Health monitor task ended abnormally");
        }
    }

    async fn run(selector: Arc<RelaySelector>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(interval_s = interval.as_secs(), "Starting relay health monitor");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Set after a refresh where every relay failed. The flags stay false
        // until the next tick so the outage is visible in the meantime.
        let mut outage = false;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if outage {
                        info!("Resetting relay health flags after total outage");
                        selector.registry().mark_all_healthy();
                    }

                    outage = selector.select_healthy_relay().await.is_none();
                    if outage {
                        warn!("All relays failed their probes");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Relay health monitor stopped");
                        return;
                    }
                }
            }
        }
    }
}
