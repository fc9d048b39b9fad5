//! Cloud bridge for the Veranda sync engine.
//!
//! This crate centralizes all remote access behind four primitives —
//! upsert-many, delete-by-id, select-all, subscribe-to-changes — plus a
//! health probe, so every other component stays ignorant of the specific
//! remote transport; swapping the backend means swapping one trait
//! implementation.
//!
//! The bridge is deliberately infallible at its boundary: transport, auth,
//! and payload errors are logged and normalized to `false` or an empty
//! result. The system favors availability (never block the UI on network
//! state) over error visibility; recovery from push failures is the outbox
//! drainer's job, not the transport's.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐      ┌──────────────────┐
//! │   Sync engine    │─────▶│   CloudBridge    │
//! │ (outbox, pulls)  │      │     (trait)      │
//! └──────────────────┘      └────────┬─────────┘
//!                                    │
//!                        ┌───────────┴───────────┐
//!               ┌────────▼────────┐     ┌────────▼────────┐
//!               │   HttpBridge    │     │   MockBridge    │
//!               │ REST + realtime │     │   (test-utils)  │
//!               └────────┬────────┘     └─────────────────┘
//!                        │ HTTPS / WSS
//!               ┌────────▼────────┐
//!               │ Hosted realtime │
//!               │ relational DB   │
//!               └─────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use veranda_cloud::{CloudBridge, CloudConfig, HttpBridge};
//! use veranda_core::Collection;
//!
//! # async fn example() {
//! let bridge = HttpBridge::new(CloudConfig::from_env());
//!
//! if bridge.check_health().await {
//!     let rooms = bridge.pull_all(Collection::Rooms).await;
//!     println!("{} rooms in the remote mirror", rooms.len());
//! }
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod http;
pub mod realtime;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use config::{CloudConfig, ENV_CLOUD_ANON_KEY, ENV_CLOUD_URL};
pub use error::{CloudError, Result};
pub use http::HttpBridge;
pub use realtime::{ChangeEvent, ChangeHandler, ChangeOp, SubscriptionHandle};

#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockBridge;

use async_trait::async_trait;
use serde_json::Value;
use veranda_core::Collection;

/// The bridge to the remote mirror.
///
/// Implementations never propagate transport errors: mutations report plain
/// success/failure, reads degrade to empty results, and a disabled bridge
/// turns every operation into a no-op. Callers that need retry semantics
/// keep their own pending state (see the sync crate's outbox).
#[async_trait]
pub trait CloudBridge: Send + Sync {
    /// Whether cloud integration is configured and active.
    fn is_enabled(&self) -> bool;

    /// Upsert records into the remote collection, conflict target `id`.
    ///
    /// Returns `true` on success and when the bridge is disabled; `false` on
    /// any transport or backend failure. Never panics.
    async fn push_records(&self, collection: Collection, records: &[Value]) -> bool;

    /// Delete a remote record by id. Idempotent: removing an absent id
    /// reports success.
    async fn remove_record(&self, collection: Collection, id: &str) -> bool;

    /// Fetch the entire remote collection.
    ///
    /// Returns an empty vector on any failure or when disabled — callers
    /// cannot distinguish "empty collection" from "fetch failed".
    async fn pull_all(&self, collection: Collection) -> Vec<Value>;

    /// Open a persistent change subscription for the collection.
    ///
    /// The handler fires for every remote insert/update/delete, including
    /// echoes of this client's own writes. Returns an inert handle when the
    /// bridge is disabled.
    fn subscribe(&self, collection: Collection, handler: ChangeHandler) -> SubscriptionHandle;

    /// Probe remote reachability with a trivial query. Never throws.
    async fn check_health(&self) -> bool;
}
