// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process stand-in for [`LogSubstrate`], so the Event Bus and Goal
//! Scheduler can be unit tested without a real Redis instance.

use crate::substrate::{LogSubstrate, RawEntry};
use crate::StorageError;
use async_trait::async_trait;
use core_domain::EventId;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Default)]
struct Stream {
    entries: BTreeMap<EventId, String>,
    groups: HashMap<String, Group>,
    seq_at_millis: HashMap<u64, u64>,
}

#[derive(Default)]
struct Group {
    last_delivered: Option<EventId>,
    pending: HashMap<EventId, (String, u64)>,
}

/// A deterministic, single-process log substrate backed by `BTreeMap`s.
/// Ids are minted from a caller-supplied clock tick plus an in-stream
/// sequence counter, mirroring Redis's own `<millis>-<seq>` scheme.
#[derive(Clone, Default)]
pub struct FakeSubstrate {
    streams: Arc<Mutex<HashMap<String, Stream>>>,
    clock_ms: Arc<Mutex<u64>>,
}

impl FakeSubstrate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the fake clock, so appended entries get a fresh `millis`.
    pub fn tick(&self, millis: u64) {
        *self.clock_ms.lock() = millis;
    }

    fn next_id(stream: &mut Stream, millis: u64) -> EventId {
        let seq = stream.seq_at_millis.entry(millis).or_insert(0);
        let id = EventId::new(millis, *seq);
        *seq += 1;
        id
    }
}

#[async_trait]
impl LogSubstrate for FakeSubstrate {
    async fn ensure_group(&self, topic: &str, group: &str) -> Result<(), StorageError> {
        let mut streams = self.streams.lock();
        let stream = streams.entry(topic.to_string()).or_default();
        stream.groups.entry(group.to_string()).or_default();
        Ok(())
    }

    async fn append(
        &self,
        topic: &str,
        event_json: &str,
        maxlen: Option<u64>,
    ) -> Result<EventId, StorageError> {
        let millis = *self.clock_ms.lock();
        let mut streams = self.streams.lock();
        let stream = streams.entry(topic.to_string()).or_default();
        let id = Self::next_id(stream, millis);
        stream.entries.insert(id, event_json.to_string());
        if let Some(cap) = maxlen {
            while stream.entries.len() as u64 > cap {
                if let Some((&oldest, _)) = stream.entries.iter().next() {
                    stream.entries.remove(&oldest);
                } else {
                    break;
                }
            }
        }
        Ok(id)
    }

    async fn read_group(
        &self,
        topic: &str,
        group: &str,
        _consumer: &str,
        count: usize,
        _block_ms: u64,
    ) -> Result<Vec<RawEntry>, StorageError> {
        let mut streams = self.streams.lock();
        let stream = streams.entry(topic.to_string()).or_default();
        let from_exclusive = stream.groups.get(group).and_then(|g| g.last_delivered);
        let mut out = Vec::new();
        let ids: Vec<EventId> = stream
            .entries
            .range(..)
            .map(|(id, _)| *id)
            .filter(|id| from_exclusive.map(|cursor| *id > cursor).unwrap_or(true))
            .take(count)
            .collect();
        for id in &ids {
            let json = stream.entries.get(id).cloned().unwrap_or_default();
            out.push(RawEntry { id: *id, event_json: json.clone() });
            let g = stream.groups.entry(group.to_string()).or_default();
            g.last_delivered = Some(*id);
            let entry = g.pending.entry(*id).or_insert((json, 0));
            entry.1 += 1;
        }
        Ok(out)
    }

    async fn read_pending(
        &self,
        topic: &str,
        group: &str,
        _consumer: &str,
        count: usize,
    ) -> Result<Vec<RawEntry>, StorageError> {
        let mut streams = self.streams.lock();
        let Some(stream) = streams.get_mut(topic) else { return Ok(Vec::new()) };
        let Some(g) = stream.groups.get_mut(group) else { return Ok(Vec::new()) };
        let mut ids: Vec<EventId> = g.pending.keys().copied().collect();
        ids.sort();
        ids.truncate(count);
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some((json, delivery_count)) = g.pending.get_mut(&id) {
                *delivery_count += 1;
                out.push(RawEntry { id, event_json: json.clone() });
            }
        }
        Ok(out)
    }

    async fn ack(&self, topic: &str, group: &str, id: EventId) -> Result<(), StorageError> {
        let mut streams = self.streams.lock();
        if let Some(stream) = streams.get_mut(topic) {
            if let Some(g) = stream.groups.get_mut(group) {
                g.pending.remove(&id);
            }
        }
        Ok(())
    }

    async fn delivery_count(
        &self,
        topic: &str,
        group: &str,
        id: EventId,
    ) -> Result<u64, StorageError> {
        let streams = self.streams.lock();
        Ok(streams
            .get(topic)
            .and_then(|s| s.groups.get(group))
            .and_then(|g| g.pending.get(&id))
            .map(|(_, count)| *count)
            .unwrap_or(0))
    }

    async fn range(
        &self,
        topic: &str,
        from: Option<EventId>,
        to: Option<EventId>,
        limit: Option<usize>,
    ) -> Result<Vec<RawEntry>, StorageError> {
        let streams = self.streams.lock();
        let Some(stream) = streams.get(topic) else { return Ok(Vec::new()) };
        let lower = from.unwrap_or(EventId::new(0, 0));
        let upper = to.unwrap_or(EventId::new(u64::MAX, u64::MAX));
        let iter = stream
            .entries
            .range(lower..=upper)
            .map(|(id, json)| RawEntry { id: *id, event_json: json.clone() });
        Ok(match limit {
            Some(n) => iter.take(n).collect(),
            None => iter.collect(),
        })
    }
}

#[cfg(test)]
#[path = "fake_substrate_tests.rs"]
mod tests;
