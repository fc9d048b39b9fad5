//! HTTP bridge over a hosted PostgREST-style backend.
//!
//! Every collection maps to one remote table with a primary key column
//! `id`; upserts name `id` as the conflict target so replaying a push is
//! idempotent. All failures are caught here, logged, and normalized to the
//! infallible [`CloudBridge`] contract — the local-first write path is never
//! blocked or failed by the network.
//!
//! [`CloudBridge`]: crate::CloudBridge

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use veranda_core::Collection;

use crate::config::CloudConfig;
use crate::error::{CloudError, Result};
use crate::realtime::{self, ChangeHandler, SubscriptionHandle};
use crate::CloudBridge;

/// HTTP implementation of the cloud bridge.
pub struct HttpBridge {
    config: CloudConfig,
    client: reqwest::Client,
}

impl HttpBridge {
    /// Create a bridge for the given configuration.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should never happen with
    /// default TLS).
    #[must_use]
    pub fn new(config: CloudConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to create HTTP client");

        Self { config, client }
    }

    /// The bridge configuration.
    #[must_use]
    pub fn config(&self) -> &CloudConfig {
        &self.config
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&self.config.anon_key)
    }

    async fn try_push(&self, collection: Collection, records: &[Value]) -> Result<()> {
        let request = self
            .client
            .post(self.config.rest_url(collection.as_str()))
            .query(&[("on_conflict", "id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(records);

        let response = self.authed(request).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(CloudError::Status(response.status()))
        }
    }

    async fn try_remove(&self, collection: Collection, id: &str) -> Result<()> {
        let request = self
            .client
            .delete(self.config.rest_url(collection.as_str()))
            .query(&[("id", format!("eq.{id}"))]);

        let response = self.authed(request).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(CloudError::Status(response.status()))
        }
    }

    async fn try_pull(&self, collection: Collection) -> Result<Vec<Value>> {
        let request = self
            .client
            .get(self.config.rest_url(collection.as_str()))
            .query(&[("select", "*")]);

        let response = self.authed(request).send().await?;
        if !response.status().is_success() {
            return Err(CloudError::Status(response.status()));
        }

        let body: Value = response.json().await?;
        match body {
            Value::Array(records) => Ok(records),
            other => Err(CloudError::Payload(format!(
                "expected a JSON array, got {other}"
            ))),
        }
    }

    async fn try_health(&self) -> Result<()> {
        let request = self
            .client
            .get(self.config.health_url())
            .query(&[("select", "id"), ("limit", "1")]);

        let response = self.authed(request).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(CloudError::Status(response.status()))
        }
    }
}

#[async_trait]
impl CloudBridge for HttpBridge {
    fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    async fn push_records(&self, collection: Collection, records: &[Value]) -> bool {
        if !self.is_enabled() || records.is_empty() {
            return true;
        }

        match self.try_push(collection, records).await {
            Ok(()) => {
                tracing::debug!(%collection, count = records.len(), "pushed records");
                true
            }
            Err(e) => {
                tracing::warn!(%collection, error = %e, "push failed");
                false
            }
        }
    }

    async fn remove_record(&self, collection: Collection, id: &str) -> bool {
        if !self.is_enabled() {
            return true;
        }

        match self.try_remove(collection, id).await {
            Ok(()) => {
                tracing::debug!(%collection, id, "removed record");
                true
            }
            Err(e) => {
                tracing::warn!(%collection, id, error = %e, "remove failed");
                false
            }
        }
    }

    async fn pull_all(&self, collection: Collection) -> Vec<Value> {
        if !self.is_enabled() {
            return Vec::new();
        }

        match self.try_pull(collection).await {
            Ok(records) => {
                tracing::debug!(%collection, count = records.len(), "pulled collection");
                records
            }
            Err(e) => {
                tracing::warn!(%collection, error = %e, "pull failed");
                Vec::new()
            }
        }
    }

    fn subscribe(&self, collection: Collection, handler: ChangeHandler) -> SubscriptionHandle {
        if !self.is_enabled() {
            return SubscriptionHandle::inert(collection);
        }

        realtime::spawn_subscription(self.config.clone(), collection, handler)
    }

    async fn check_health(&self) -> bool {
        if !self.is_enabled() {
            return false;
        }

        self.try_health().await.is_ok()
    }
}
