//! Engine assembly: wires the store, bridge, hooks, and background tasks.
//!
//! `SyncEngine::start` is the bootstrap entry point: it attaches the cache
//! refresher (always) and the sync interceptor (cloud enabled only), runs
//! the health check, spawns the connectivity monitor and outbox drainer,
//! reconciles every collection against the remote, seeds defaults on a cold
//! start, and leaves the live subscriptions running. Startup never fails on
//! cloud trouble — the UI proceeds with whatever local state exists.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use veranda_cloud::{CloudBridge, CloudConfig, HttpBridge, SubscriptionHandle};
use veranda_store::{LocalDb, RocksStore, Store, StoreError};

use crate::backup::{self, ImportReport};
use crate::bootstrap;
use crate::connectivity::ConnectivityMonitor;
use crate::drainer::OutboxDrainer;
use crate::error::Result;
use crate::interceptor::SyncInterceptor;
use crate::state::{CacheRefresher, StateCache};

/// Configuration for the sync engine's background cadence.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Outbox drain interval in seconds (the drainer also wakes on demand).
    #[serde(default = "EngineConfig::default_drain_interval")]
    pub drain_interval_seconds: u64,

    /// Connectivity probe interval in seconds.
    #[serde(default = "EngineConfig::default_health_interval")]
    pub health_interval_seconds: u64,
}

impl EngineConfig {
    const fn default_drain_interval() -> u64 {
        15
    }

    const fn default_health_interval() -> u64 {
        30
    }

    /// Get the drain interval as a `Duration`.
    #[must_use]
    pub fn drain_interval(&self) -> Duration {
        Duration::from_secs(self.drain_interval_seconds)
    }

    /// Get the health probe interval as a `Duration`.
    #[must_use]
    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval_seconds)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            drain_interval_seconds: Self::default_drain_interval(),
            health_interval_seconds: Self::default_health_interval(),
        }
    }
}

/// The assembled local-first replication engine.
pub struct SyncEngine {
    db: Arc<LocalDb>,
    store: Arc<dyn Store>,
    bridge: Arc<dyn CloudBridge>,
    cache: Arc<StateCache>,
    connectivity: watch::Receiver<bool>,
    drainer: Option<OutboxDrainer>,
    subscriptions: Vec<SubscriptionHandle>,
    tasks: Vec<JoinHandle<()>>,
}

impl SyncEngine {
    /// Open the local database at `data_dir` and start the engine against
    /// the given cloud configuration.
    ///
    /// # Errors
    ///
    /// Returns an error only if the local database cannot be opened; cloud
    /// failures degrade to local-only operation.
    pub async fn open(
        data_dir: impl AsRef<Path>,
        cloud: CloudConfig,
        config: EngineConfig,
    ) -> Result<Self> {
        let store: Arc<dyn Store> = Arc::new(RocksStore::open(data_dir)?);
        let bridge: Arc<dyn CloudBridge> = Arc::new(HttpBridge::new(cloud));
        Ok(Self::start(store, bridge, config).await)
    }

    /// Start the engine over an already-open store and bridge.
    pub async fn start(
        store: Arc<dyn Store>,
        bridge: Arc<dyn CloudBridge>,
        config: EngineConfig,
    ) -> Self {
        let db = Arc::new(LocalDb::new(store.clone()));
        let cache = Arc::new(StateCache::new());
        db.attach_hook(Arc::new(CacheRefresher::new(store.clone(), cache.clone())));

        let mut tasks = Vec::new();
        let mut drainer = None;
        let connectivity = if bridge.is_enabled() {
            let notify = Arc::new(Notify::new());
            db.attach_hook(Arc::new(SyncInterceptor::new(
                store.clone(),
                notify.clone(),
            )));

            let reachable = bridge.check_health().await;
            tracing::info!(reachable, "initial cloud health check");

            let (monitor, rx) =
                ConnectivityMonitor::new(bridge.clone(), config.health_interval(), reachable);
            let outbox = OutboxDrainer::new(
                store.clone(),
                bridge.clone(),
                notify,
                rx.clone(),
                config.drain_interval(),
            );
            drainer = Some(outbox.clone());
            tasks.push(outbox.spawn());
            tasks.push(monitor.spawn());
            rx
        } else {
            tracing::info!("cloud integration disabled, running local-only");
            let (tx, rx) = watch::channel(false);
            drop(tx);
            rx
        };

        let subscriptions = bootstrap::run_bootstrap(&db, &bridge, &cache).await;

        if let Err(e) = cache.refresh_local_state(store.as_ref()) {
            tracing::warn!(error = %e, "initial state refresh failed");
        }

        tracing::info!(
            collections = veranda_core::Collection::ALL.len(),
            subscriptions = subscriptions.len(),
            "sync engine started"
        );

        Self {
            db,
            store,
            bridge,
            cache,
            connectivity,
            drainer,
            subscriptions,
            tasks,
        }
    }

    /// The typed local database — the application's single write path.
    #[must_use]
    pub fn db(&self) -> &Arc<LocalDb> {
        &self.db
    }

    /// The UI-facing state cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<StateCache> {
        &self.cache
    }

    /// The cloud bridge in use.
    #[must_use]
    pub fn bridge(&self) -> &Arc<dyn CloudBridge> {
        &self.bridge
    }

    /// Last known cloud reachability (the online/offline indicator).
    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.connectivity.borrow()
    }

    /// Subscribe to reachability changes.
    #[must_use]
    pub fn watch_connectivity(&self) -> watch::Receiver<bool> {
        self.connectivity.clone()
    }

    /// Re-run the refresh cascade manually.
    ///
    /// # Errors
    ///
    /// Returns an error if a local read fails.
    pub fn refresh(&self) -> std::result::Result<(), StoreError> {
        self.cache.refresh_local_state(self.store.as_ref())
    }

    /// Drain due outbox markers now instead of waiting for the background
    /// cadence (e.g. to flush before shutdown). Returns how many completed;
    /// always 0 when cloud integration is disabled.
    pub async fn drain_outbox(&self) -> usize {
        match &self.drainer {
            Some(drainer) => drainer.drain_once().await,
            None => 0,
        }
    }

    /// Export every collection as one backup document.
    ///
    /// # Errors
    ///
    /// Returns an error if a local read fails.
    pub fn export_database(&self) -> Result<Value> {
        backup::export_database(&self.db)
    }

    /// Import a backup document, replacing the collections it names and
    /// force-reconciling the remote mirror when cloud is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed documents; partial imports are not
    /// rolled back.
    pub async fn import_database(&self, raw: &str) -> Result<ImportReport> {
        backup::import_database(&self.db, self.bridge.as_ref(), raw).await
    }

    /// Tear down subscriptions and background tasks, releasing the store.
    pub async fn shutdown(self) {
        for subscription in self.subscriptions {
            subscription.unsubscribe();
        }
        for task in self.tasks {
            task.abort();
            let _ = task.await;
        }
        tracing::info!("sync engine stopped");
    }
}
