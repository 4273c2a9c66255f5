// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The log substrate seam (§4.1, §6.5): everything the Event Bus needs from
//! a Redis-Streams-compatible durable log, abstracted behind a trait so the
//! engine can be driven by either the real Redis client or an in-process
//! fake in tests.

use async_trait::async_trait;
use core_domain::EventId;

/// A single raw entry as read back off the stream: the id the substrate
/// assigned it, and the serialized event body stored under the `event`
/// field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub id: EventId,
    pub event_json: String,
}

#[async_trait]
pub trait LogSubstrate: Send + Sync {
    /// Create the consumer group at the tail of the stream if it does not
    /// already exist, creating the stream itself (`MKSTREAM`) when needed.
    /// Idempotent: already-exists is not an error.
    async fn ensure_group(&self, topic: &str, group: &str) -> Result<(), crate::StorageError>;

    /// Append an event, trimming the stream to approximately `maxlen`
    /// entries (`MAXLEN ~`) when given. Returns the id the substrate
    /// assigned the entry.
    async fn append(
        &self,
        topic: &str,
        event_json: &str,
        maxlen: Option<u64>,
    ) -> Result<EventId, crate::StorageError>;

    /// Read up to `count` new entries for `consumer` within `group`,
    /// blocking for `block_ms` milliseconds if none are immediately
    /// available (`0` means block indefinitely, matching `XREAD BLOCK 0`).
    async fn read_group(
        &self,
        topic: &str,
        group: &str,
        consumer: &str,
        count: usize,
        block_ms: u64,
    ) -> Result<Vec<RawEntry>, crate::StorageError>;

    /// Claim entries still pending for `consumer` in `group` (crash
    /// recovery / redelivery), oldest first.
    async fn read_pending(
        &self,
        topic: &str,
        group: &str,
        consumer: &str,
        count: usize,
    ) -> Result<Vec<RawEntry>, crate::StorageError>;

    /// Acknowledge an entry, removing it from the group's pending list.
    async fn ack(&self, topic: &str, group: &str, id: EventId) -> Result<(), crate::StorageError>;

    /// How many times an entry has been delivered to consumers in `group`
    /// (the pending-entry delivery counter), used to cross-check the
    /// retry count stamped into `EventMeta`.
    async fn delivery_count(
        &self,
        topic: &str,
        group: &str,
        id: EventId,
    ) -> Result<u64, crate::StorageError>;

    /// Read entries in `[from, to]` (inclusive, `None` meaning unbounded),
    /// oldest first, for snapshot/replay.
    async fn range(
        &self,
        topic: &str,
        from: Option<EventId>,
        to: Option<EventId>,
        limit: Option<usize>,
    ) -> Result<Vec<RawEntry>, crate::StorageError>;
}
