//! Connectivity monitor driving the online/offline indicator.
//!
//! A lightweight health probe runs once at bootstrap and then on a fixed
//! interval for the life of the session. The result feeds a watch channel
//! consumed by the UI indicator and by the outbox drainer, which holds
//! pending markers back while the backend is unreachable.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use veranda_cloud::CloudBridge;

/// Periodic remote health checker.
pub struct ConnectivityMonitor {
    bridge: Arc<dyn CloudBridge>,
    interval: Duration,
    tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    /// Create a monitor seeded with `initial` reachability.
    ///
    /// Returns the monitor and the receiver side of the indicator.
    #[must_use]
    pub fn new(
        bridge: Arc<dyn CloudBridge>,
        interval: Duration,
        initial: bool,
    ) -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(initial);
        (
            Self {
                bridge,
                interval,
                tx,
            },
            rx,
        )
    }

    /// Probe once and publish the result. Returns the probe outcome.
    pub async fn check_now(&self) -> bool {
        let reachable = self.bridge.check_health().await;
        self.tx.send_if_modified(|current| {
            if *current == reachable {
                false
            } else {
                *current = reachable;
                tracing::info!(reachable, "cloud reachability changed");
                true
            }
        });
        reachable
    }

    /// Run the periodic probe loop until the task is aborted.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(self.interval);
            tick.tick().await; // the bootstrap check already ran
            loop {
                tick.tick().await;
                self.check_now().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veranda_cloud::MockBridge;

    #[tokio::test]
    async fn probe_tracks_bridge_health() {
        let bridge = Arc::new(MockBridge::new());
        let (monitor, rx) =
            ConnectivityMonitor::new(bridge.clone(), Duration::from_secs(30), true);

        assert!(monitor.check_now().await);
        assert!(*rx.borrow());

        bridge.set_healthy(false);
        assert!(!monitor.check_now().await);
        assert!(!*rx.borrow());

        bridge.set_healthy(true);
        assert!(monitor.check_now().await);
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn disabled_bridge_reads_offline() {
        let bridge = Arc::new(MockBridge::disabled());
        let (monitor, rx) =
            ConnectivityMonitor::new(bridge, Duration::from_secs(30), false);

        assert!(!monitor.check_now().await);
        assert!(!*rx.borrow());
    }
}
