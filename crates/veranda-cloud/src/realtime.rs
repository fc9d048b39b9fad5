//! Realtime change subscriptions over a Phoenix-style websocket channel.
//!
//! Each subscription joins one topic (`realtime:public:<table>`) and
//! receives row-level events tagged INSERT/UPDATE/DELETE — including echoes
//! of this client's own writes; echo suppression happens in the reconciler,
//! not here. The channel task keeps the connection alive with periodic
//! heartbeats and reconnects with a fixed delay until unsubscribed.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use veranda_core::Collection;

use crate::config::CloudConfig;
use crate::error::{CloudError, Result};

/// Delay before re-dialing a dropped channel.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Heartbeat cadence expected by the channel protocol.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// The kind of row change a realtime event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    /// A row was inserted.
    Insert,
    /// A row was updated.
    Update,
    /// A row was deleted.
    Delete,
}

impl ChangeOp {
    /// Parse the wire tag (`"INSERT"`, `"UPDATE"`, `"DELETE"`).
    #[must_use]
    pub fn from_wire(tag: &str) -> Option<Self> {
        match tag {
            "INSERT" => Some(Self::Insert),
            "UPDATE" => Some(Self::Update),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// One remote row change delivered to a subscription handler.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// Collection the change belongs to.
    pub collection: Collection,
    /// Kind of change.
    pub op: ChangeOp,
    /// The new row image; absent for deletes.
    pub record: Option<Value>,
    /// The deleted row's id, taken from the old row image.
    pub old_id: Option<String>,
}

impl ChangeEvent {
    /// The id the event refers to, from the new or old row image.
    #[must_use]
    pub fn record_id(&self) -> Option<&str> {
        self.record
            .as_ref()
            .and_then(|r| r.get("id"))
            .and_then(Value::as_str)
            .or(self.old_id.as_deref())
    }
}

/// Callback invoked for every change event observed on a subscription.
pub type ChangeHandler = Arc<dyn Fn(ChangeEvent) + Send + Sync>;

/// Handle to a live subscription; `unsubscribe` tears the channel down.
#[derive(Debug)]
pub struct SubscriptionHandle {
    collection: Collection,
    task: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    /// An inert handle, returned when cloud integration is disabled.
    #[must_use]
    pub fn inert(collection: Collection) -> Self {
        Self {
            collection,
            task: None,
        }
    }

    pub(crate) fn from_task(collection: Collection, task: JoinHandle<()>) -> Self {
        Self {
            collection,
            task: Some(task),
        }
    }

    /// The collection this handle subscribes to.
    #[must_use]
    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// Whether a channel task is running behind this handle.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Tear the channel down.
    pub fn unsubscribe(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!(collection = %self.collection, "subscription closed");
        }
    }
}

/// Phoenix-framed channel message.
#[derive(Debug, Serialize, Deserialize)]
struct ChannelMessage {
    topic: String,
    event: String,
    payload: Value,
    #[serde(rename = "ref")]
    reference: Option<String>,
}

/// Channel topic for a collection's table.
fn topic(collection: Collection) -> String {
    format!("realtime:public:{collection}")
}

/// The join message requesting row-change events for one table.
fn join_message(collection: Collection) -> ChannelMessage {
    ChannelMessage {
        topic: topic(collection),
        event: "phx_join".to_string(),
        payload: json!({
            "config": {
                "postgres_changes": [
                    {"event": "*", "schema": "public", "table": collection.as_str()}
                ]
            }
        }),
        reference: Some("1".to_string()),
    }
}

/// Protocol-level keepalive.
fn heartbeat_message(seq: u64) -> ChannelMessage {
    ChannelMessage {
        topic: "phoenix".to_string(),
        event: "heartbeat".to_string(),
        payload: json!({}),
        reference: Some(seq.to_string()),
    }
}

/// Extract a change event from an incoming channel message, if it is one.
fn parse_event(collection: Collection, message: &ChannelMessage) -> Option<ChangeEvent> {
    if message.event != "postgres_changes" {
        return None;
    }

    let data = message.payload.get("data")?;
    let op = data
        .get("type")
        .and_then(Value::as_str)
        .and_then(ChangeOp::from_wire)?;

    let record = data.get("record").filter(|r| r.is_object()).cloned();
    let old_id = data
        .get("old_record")
        .and_then(|r| r.get("id"))
        .and_then(Value::as_str)
        .map(String::from);

    Some(ChangeEvent {
        collection,
        op,
        record,
        old_id,
    })
}

/// Spawn the channel task for a subscription.
pub(crate) fn spawn_subscription(
    config: CloudConfig,
    collection: Collection,
    handler: ChangeHandler,
) -> SubscriptionHandle {
    let task = tokio::spawn(run_channel(config, collection, handler));
    SubscriptionHandle::from_task(collection, task)
}

/// Dial, listen, and re-dial forever; aborted via the handle.
async fn run_channel(config: CloudConfig, collection: Collection, handler: ChangeHandler) {
    loop {
        if let Err(e) = connect_and_listen(&config, collection, &handler).await {
            tracing::warn!(collection = %collection, error = %e, "realtime channel dropped");
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

async fn connect_and_listen(
    config: &CloudConfig,
    collection: Collection,
    handler: &ChangeHandler,
) -> Result<()> {
    let (stream, _) = connect_async(config.realtime_url())
        .await
        .map_err(|e| CloudError::WebSocket(e.to_string()))?;
    let (mut write, mut read) = stream.split();

    let join = serde_json::to_string(&join_message(collection))
        .map_err(|e| CloudError::Payload(e.to_string()))?;
    write
        .send(Message::Text(join))
        .await
        .map_err(|e| CloudError::WebSocket(e.to_string()))?;

    tracing::info!(collection = %collection, "realtime channel joined");

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await; // first tick is immediate
    let mut seq: u64 = 1;

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                seq += 1;
                let ping = serde_json::to_string(&heartbeat_message(seq))
                    .map_err(|e| CloudError::Payload(e.to_string()))?;
                write
                    .send(Message::Text(ping))
                    .await
                    .map_err(|e| CloudError::WebSocket(e.to_string()))?;
            }
            incoming = read.next() => {
                match incoming {
                    None => {
                        return Err(CloudError::WebSocket("channel closed".to_string()));
                    }
                    Some(Err(e)) => {
                        return Err(CloudError::WebSocket(e.to_string()));
                    }
                    Some(Ok(Message::Text(text))) => {
                        if let Ok(message) = serde_json::from_str::<ChannelMessage>(&text) {
                            if let Some(event) = parse_event(collection, &message) {
                                handler(event);
                            }
                        }
                    }
                    Some(Ok(_)) => {} // binary/ping/pong frames are protocol noise
                }
            }
        }
    }
}
