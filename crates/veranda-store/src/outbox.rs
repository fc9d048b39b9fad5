//! Pending-sync outbox markers.
//!
//! Every local mutation that must be mirrored to the cloud leaves one marker
//! per `(collection, id)` in the outbox column family. The drainer in the
//! sync crate reads the markers, performs the remote call, and removes them
//! on success; a failed attempt reschedules the marker with capped
//! exponential backoff. Markers are persisted, so pending mirrors survive a
//! process restart.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use veranda_core::Collection;

/// The remote operation a marker stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingOp {
    /// Mirror the current record image as an upsert.
    Upsert,
    /// Mirror a delete by record id.
    Delete,
}

/// One persisted pending-sync marker.
///
/// The marker deliberately does not embed the record payload: the drainer
/// reads the current image at push time, so the remote always receives a
/// complete, up-to-date record and rapid successive edits coalesce into one
/// push.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEntry {
    /// Collection the record belongs to.
    pub collection: Collection,
    /// The record id.
    pub record_id: String,
    /// Remote operation to perform.
    pub op: PendingOp,
    /// Number of failed attempts so far.
    pub attempts: u32,
    /// When the marker was first queued.
    pub queued_at: DateTime<Utc>,
    /// Earliest time the next attempt may run.
    pub next_attempt_at: DateTime<Utc>,
}

impl OutboxEntry {
    /// Create a fresh marker, due immediately.
    #[must_use]
    pub fn new(collection: Collection, record_id: impl Into<String>, op: PendingOp) -> Self {
        let now = Utc::now();
        Self {
            collection,
            record_id: record_id.into(),
            op,
            attempts: 0,
            queued_at: now,
            next_attempt_at: now,
        }
    }

    /// Whether the marker is due for an attempt at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_attempt_at <= now
    }

    /// Record a failed attempt and schedule the next one.
    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        self.attempts += 1;
        self.next_attempt_at = now + backoff(self.attempts);
    }
}

/// Maximum delay between attempts.
const MAX_BACKOFF_SECS: i64 = 60;

/// Exponential backoff for the given attempt count: `2^attempts` seconds,
/// capped at [`MAX_BACKOFF_SECS`].
#[must_use]
pub fn backoff(attempts: u32) -> Duration {
    let exp = attempts.min(6); // 2^6 = 64 > cap, avoids overflow for large counts
    let secs = (1i64 << exp).min(MAX_BACKOFF_SECS);
    Duration::seconds(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_marker_is_due() {
        let entry = OutboxEntry::new(Collection::Rooms, "RM-1", PendingOp::Upsert);
        assert!(entry.is_due(Utc::now()));
        assert_eq!(entry.attempts, 0);
    }

    #[test]
    fn failure_schedules_backoff() {
        let mut entry = OutboxEntry::new(Collection::Rooms, "RM-1", PendingOp::Upsert);
        let now = Utc::now();

        entry.record_failure(now);
        assert_eq!(entry.attempts, 1);
        assert!(!entry.is_due(now));
        assert_eq!(entry.next_attempt_at, now + Duration::seconds(2));

        entry.record_failure(now);
        assert_eq!(entry.next_attempt_at, now + Duration::seconds(4));
    }

    #[test]
    fn backoff_is_capped() {
        assert_eq!(backoff(1), Duration::seconds(2));
        assert_eq!(backoff(5), Duration::seconds(32));
        assert_eq!(backoff(6), Duration::seconds(60));
        assert_eq!(backoff(60), Duration::seconds(60));
    }
}
