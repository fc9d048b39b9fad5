//! Local-first replication engine for the Veranda property-management
//! system.
//!
//! The local store is the single source of truth: writes land locally first
//! and the UI refreshes from local state immediately, independent of the
//! network. Mirroring to the cloud happens through a persisted outbox
//! drained in the background with retry and backoff; remote state flows in
//! at bootstrap (additive last-write-wins merge) and through live change
//! subscriptions for the rest of the session.
//!
//! # Architecture
//!
//! ```text
//!   UI action                       remote change
//!      │                                 │
//! ┌────▼─────┐   write hooks   ┌─────────▼─────────┐
//! │ LocalDb  │────────────────▶│ live subscription │
//! │ (store)  │  ┌───────────┐  │     handler       │
//! └────┬─────┘  │interceptor│  └─────────┬─────────┘
//!      │        │→ outbox   │            │ apply + LWW
//!      │        └─────┬─────┘            │
//! ┌────▼─────┐  ┌─────▼─────┐      ┌─────▼─────┐
//! │  State   │  │  Outbox   │      │  LocalDb  │
//! │  Cache   │  │  drainer  │      │ (unhooked)│
//! └──────────┘  └─────┬─────┘      └───────────┘
//!                     │ push/remove
//!               ┌─────▼─────┐
//!               │CloudBridge│
//!               └───────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use veranda_cloud::CloudConfig;
//! use veranda_sync::{EngineConfig, SyncEngine};
//!
//! # async fn example() -> Result<(), veranda_sync::SyncError> {
//! let engine = SyncEngine::open(
//!     "/var/lib/veranda/db",
//!     CloudConfig::from_env(),
//!     EngineConfig::default(),
//! )
//! .await?;
//!
//! println!("online: {}", engine.is_online());
//! println!("{} rooms", engine.cache().rooms().len());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod backup;
pub mod bootstrap;
pub mod connectivity;
pub mod drainer;
pub mod engine;
pub mod error;
pub mod interceptor;
pub mod seed;
pub mod state;

pub use backup::{export_database, import_database, ImportReport};
pub use bootstrap::{apply_change, change_handler, run_bootstrap};
pub use connectivity::ConnectivityMonitor;
pub use drainer::OutboxDrainer;
pub use engine::{EngineConfig, SyncEngine};
pub use error::{Result, SyncError};
pub use interceptor::SyncInterceptor;
pub use state::{CacheRefresher, StateCache};
