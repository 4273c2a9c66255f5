// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Event Bus (§4.1): publish/subscribe over the log substrate, with
//! priority re-sort, token-bucket rate limiting, retry-to-dead-letter,
//! replay, and snapshot/restore.

use crate::error::EventBusError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_adapters::RateLimiter;
use core_domain::{
    event::reserved, Clock, Event, EventId, EventMeta, EventPriority, Snapshot, SnapshotMetadata,
    StreamConfig, Topic, ValidationError,
};
use core_storage::{LogSubstrate, SnapshotStore};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// An async subscriber invoked for every event delivered on a topic it is
/// registered against (§4.1 Subscribe contract). Implementations must be
/// non-blocking; a blocking handler stalls that topic's consumer loop.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &Event) -> Result<(), String>;
}

/// Per-priority weight table for the in-batch stable sort (§4.1 step 4,
/// §6.6 `priority_weights`).
#[derive(Debug, Clone, Copy)]
pub struct PriorityWeights {
    pub high: u8,
    pub medium: u8,
    pub low: u8,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self { high: 3, medium: 2, low: 1 }
    }
}

impl PriorityWeights {
    fn weight(&self, priority: EventPriority) -> u8 {
        match priority {
            EventPriority::High => self.high,
            EventPriority::Medium => self.medium,
            EventPriority::Low => self.low,
        }
    }
}

/// Per-topic stream table plus consumer tuning (§6.6).
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    pub streams: HashMap<String, StreamConfig>,
    pub consumer_group: String,
    pub consumer_name: String,
    pub batch_size: usize,
    pub block_timeout_ms: u64,
    pub dead_letter_stream: String,
    pub max_global_rate: u32,
    pub priority_weights: PriorityWeights,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            streams: HashMap::new(),
            consumer_group: "titan-core".to_string(),
            consumer_name: "consumer-1".to_string(),
            batch_size: 10,
            block_timeout_ms: 5_000,
            dead_letter_stream: reserved::DEFAULT_DLQ.to_string(),
            max_global_rate: 1_000,
            priority_weights: PriorityWeights::default(),
        }
    }
}

/// The 100 ms back-pressure yield a rate-limiter denial takes (§5).
const RATE_LIMIT_YIELD: Duration = Duration::from_millis(100);

/// The 1 s pause a consumer takes after a substrate read error (§4.1
/// Failure semantics).
const SUBSTRATE_BACKOFF: Duration = Duration::from_secs(1);

pub struct EventBus<C: Clock> {
    substrate: Arc<dyn LogSubstrate>,
    snapshot_store: SnapshotStore,
    clock: Arc<C>,
    config: EventBusConfig,
    handlers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
    rate_limiter: RateLimiter<C>,
    seq: AtomicU64,
    parse_errors: AtomicU64,
}

impl<C: Clock> EventBus<C> {
    pub fn new(
        substrate: Arc<dyn LogSubstrate>,
        snapshot_store: SnapshotStore,
        clock: Arc<C>,
        config: EventBusConfig,
    ) -> Self {
        let rate_limiter = RateLimiter::new(clock.clone(), config.max_global_rate);
        Self {
            substrate,
            snapshot_store,
            clock,
            config,
            handlers: RwLock::new(HashMap::new()),
            rate_limiter,
            seq: AtomicU64::new(0),
            parse_errors: AtomicU64::new(0),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.clock.epoch_ms() as i64).unwrap_or_else(Utc::now)
    }

    fn next_event_id(&self) -> EventId {
        let millis = self.clock.epoch_ms();
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        EventId::new(millis, seq)
    }

    pub fn parse_error_count(&self) -> u64 {
        self.parse_errors.load(Ordering::Relaxed)
    }

    /// Register `handler` against `topic` (§4.1 Subscribe contract).
    /// Multiple handlers may share a topic; each is invoked, in
    /// registration order, for every delivered event.
    pub fn subscribe(&self, topic: &str, handler: Arc<dyn EventHandler>) {
        self.handlers.write().entry(topic.to_string()).or_default().push(handler);
    }

    /// Validate and append one event (§4.1 Publish contract). Returns the
    /// publisher-assigned `event_id`, not the substrate's raw entry id.
    #[allow(clippy::expect_used)]
    pub async fn publish(
        &self,
        topic: &str,
        event_type: &str,
        payload: BTreeMap<String, Value>,
        priority: EventPriority,
        trace_id: Option<String>,
    ) -> Result<EventId, EventBusError> {
        let parsed_topic = Topic::parse(topic)?;
        let stream_cfg = self
            .config
            .streams
            .get(topic)
            .ok_or_else(|| ValidationError::UnknownTopic(topic.to_string()))?;
        Event::validate_payload(&payload)?;

        let event = Event {
            event_id: self.next_event_id(),
            schema_version: core_domain::event::SCHEMA_VERSION,
            topic: parsed_topic,
            event_type: event_type.to_string(),
            timestamp: self.now(),
            payload,
            meta: EventMeta {
                priority,
                retries: 0,
                trace_id,
                source: None,
            },
        };

        let json = serde_json::to_string(&event).expect("event always serializes");
        self.substrate.append(topic, &json, Some(stream_cfg.maxlen)).await?;
        Ok(event.event_id)
    }

    /// One full pass of the consumer algorithm (§4.1 steps 1-7) for
    /// `topic`, returning the number of entries processed. Exposed
    /// separately from [`Self::run_consumer`] so tests can drive exactly
    /// one batch deterministically.
    pub async fn process_one_batch(&self, topic: &str) -> Result<usize, EventBusError> {
        let group = &self.config.consumer_group;
        self.substrate.ensure_group(topic, group).await?;

        // Reclaim this consumer's own unacked entries first (redelivery),
        // then fill the remainder of the batch with new entries.
        let mut raw = self
            .substrate
            .read_pending(topic, group, &self.config.consumer_name, self.config.batch_size)
            .await?;
        if raw.len() < self.config.batch_size {
            let remaining = self.config.batch_size - raw.len();
            raw.extend(
                self.substrate
                    .read_group(topic, group, &self.config.consumer_name, remaining, self.config.block_timeout_ms)
                    .await?,
            );
        }

        let mut parsed = Vec::with_capacity(raw.len());
        for entry in raw {
            match serde_json::from_str::<Event>(&entry.event_json) {
                Ok(event) => parsed.push((entry.id, event)),
                Err(error) => {
                    tracing::warn!(%error, entry_id = %entry.id, topic, "dropping unparseable event, acknowledging to avoid redelivery");
                    self.parse_errors.fetch_add(1, Ordering::Relaxed);
                    self.substrate.ack(topic, group, entry.id).await?;
                }
            }
        }

        let weights = self.config.priority_weights;
        parsed.sort_by_key(|(_, event)| std::cmp::Reverse(weights.weight(event.meta.priority)));

        let retry_limit = self.config.streams.get(topic).map(|s| s.retry_limit).unwrap_or(u32::MAX);
        let processed = parsed.len();
        for (raw_id, event) in parsed {
            self.acquire_rate_tokens(topic).await;

            let outcome = self.invoke_handlers(topic, &event).await;
            match outcome {
                Ok(()) => {
                    self.substrate.ack(topic, group, raw_id).await?;
                }
                Err(error) => {
                    let delivery_count = self.substrate.delivery_count(topic, group, raw_id).await?;
                    // `meta.retries` starts at 0 on first delivery and increments on
                    // each redelivery, so it trails the raw delivery count by one.
                    let retries = (delivery_count.saturating_sub(1)) as u32;
                    if retries >= retry_limit {
                        self.dead_letter(topic, &event, raw_id, retries, &error).await?;
                        self.substrate.ack(topic, group, raw_id).await?;
                    } else {
                        tracing::debug!(topic, event_id = %event.event_id, %error, delivery_count, "handler failed, awaiting redelivery");
                    }
                }
            }
        }

        Ok(processed)
    }

    async fn acquire_rate_tokens(&self, topic: &str) {
        let topic_rate = self.config.streams.get(topic).map(|s| s.rate_limit).unwrap_or(self.config.max_global_rate);
        while !self.rate_limiter.try_acquire(topic, topic_rate) {
            tokio::time::sleep(RATE_LIMIT_YIELD).await;
        }
    }

    async fn invoke_handlers(&self, topic: &str, event: &Event) -> Result<(), String> {
        let handlers = self.handlers.read().get(topic).cloned().unwrap_or_default();
        for handler in handlers {
            handler.handle(event).await?;
        }
        Ok(())
    }

    #[allow(clippy::expect_used)]
    async fn dead_letter(
        &self,
        topic: &str,
        event: &Event,
        raw_id: EventId,
        retries: u32,
        error: &str,
    ) -> Result<(), EventBusError> {
        let mut payload = BTreeMap::new();
        payload.insert("original_topic".to_string(), Value::String(topic.to_string()));
        payload.insert("original_message_id".to_string(), Value::String(raw_id.to_string()));
        payload.insert(
            "original_event".to_string(),
            serde_json::to_value(event).expect("event always serializes"),
        );
        payload.insert("error".to_string(), Value::String(error.to_string()));
        payload.insert("retries".to_string(), Value::from(retries));
        payload.insert("failed_at".to_string(), Value::String(self.now().to_rfc3339()));

        let dlq_event = Event {
            event_id: self.next_event_id(),
            schema_version: core_domain::event::SCHEMA_VERSION,
            topic: Topic::new_unchecked(&self.config.dead_letter_stream),
            event_type: "dead_letter".to_string(),
            timestamp: self.now(),
            payload,
            meta: EventMeta::default(),
        };
        let json = serde_json::to_string(&dlq_event).expect("event always serializes");
        self.substrate
            .append(&self.config.dead_letter_stream, &json, None)
            .await
            .map_err(|source| {
                tracing::error!(event_id = %event.event_id, %error, "dead-letter append failed, this entry is lost");
                EventBusError::DeadLetter { event_id: event.event_id.to_string(), source }
            })?;
        Ok(())
    }

    /// Run the consumer loop for `topic` until cancelled. Substrate errors
    /// pause for one second and retry; parse and handler errors are
    /// handled per-entry inside [`Self::process_one_batch`].
    pub async fn run_consumer(&self, topic: &str) {
        loop {
            if let Err(error) = self.process_one_batch(topic).await {
                tracing::error!(topic, %error, "consumer batch failed, backing off");
                tokio::time::sleep(SUBSTRATE_BACKOFF).await;
            }
        }
    }

    /// `replay(topic, from?, to?, limit)` (§4.1): bounded range read,
    /// parsed in log order. Idempotent and side-effect-free.
    pub async fn replay(
        &self,
        topic: &str,
        from: Option<EventId>,
        to: Option<EventId>,
        limit: Option<usize>,
    ) -> Result<Vec<Event>, EventBusError> {
        let raw = self.substrate.range(topic, from, to, limit).await?;
        Ok(raw
            .into_iter()
            .filter_map(|entry| match serde_json::from_str::<Event>(&entry.event_json) {
                Ok(event) => Some(event),
                Err(error) => {
                    tracing::warn!(%error, topic, "skipping unparseable event during replay");
                    None
                }
            })
            .collect())
    }

    /// Gzip a `[start, end]` window of `topic` to the snapshot store.
    pub async fn create_snapshot(
        &self,
        topic: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<SnapshotMetadata, EventBusError> {
        let from = EventId::new(start.timestamp_millis().max(0) as u64, 0);
        let to = EventId::new(end.timestamp_millis().max(0) as u64, u64::MAX);
        let raw = self.substrate.range(topic, Some(from), Some(to), None).await?;
        let events: Vec<(EventId, Event)> = raw
            .into_iter()
            .filter_map(|entry| serde_json::from_str::<Event>(&entry.event_json).ok().map(|event| (entry.id, event)))
            .collect();

        let metadata = SnapshotMetadata {
            snapshot_id: SnapshotMetadata::make_id(topic, start, end),
            topic: topic.to_string(),
            start_time: start,
            end_time: end,
            event_count: events.len(),
            created_at: self.now(),
        };
        let snapshot = Snapshot { metadata: metadata.clone(), events };
        self.snapshot_store.write(&snapshot).await.map_err(EventBusError::Publish)?;
        Ok(metadata)
    }

    /// Decompress `snapshot_id` and re-emit its events onto `target_topic`
    /// (or the snapshot's original topic), pacing emission by `speed` when
    /// given (§4.1 Snapshot / restore).
    #[allow(clippy::expect_used)]
    pub async fn replay_from_snapshot(
        &self,
        snapshot_id: &str,
        target_topic: Option<&str>,
        speed: Option<f64>,
    ) -> Result<usize, EventBusError> {
        let snapshot = self.snapshot_store.read(snapshot_id).await.map_err(EventBusError::Publish)?;
        let target = target_topic.unwrap_or(&snapshot.metadata.topic).to_string();

        let mut prev_timestamp: Option<DateTime<Utc>> = None;
        let mut emitted = 0;
        for (_, event) in &snapshot.events {
            if let (Some(prev), Some(speed)) = (prev_timestamp, speed) {
                if speed > 0.0 {
                    let gap = (event.timestamp - prev).num_milliseconds().max(0) as f64 / speed;
                    if gap > 0.0 {
                        tokio::time::sleep(Duration::from_millis(gap as u64)).await;
                    }
                }
            }
            prev_timestamp = Some(event.timestamp);
            let json = serde_json::to_string(event).expect("event always serializes");
            self.substrate.append(&target, &json, None).await?;
            emitted += 1;
        }
        Ok(emitted)
    }

    /// Delete snapshots older than `days` (§4.1 Snapshot / restore).
    pub async fn cleanup_snapshots(&self, days: i64) -> Result<usize, EventBusError> {
        let cutoff = self.now() - chrono::Duration::days(days);
        self.snapshot_store.cleanup(cutoff).await.map_err(EventBusError::Publish)
    }
}

/// Publishes the alert onto `system.v1` as a `plugin_disabled` event (§4.3,
/// §6.3). A stream that isn't configured for `system.v1` only loses the
/// alert, not the breaker transition that already persisted.
#[async_trait]
impl<C: Clock + 'static> crate::breaker::AlertSink for EventBus<C> {
    async fn publish_disabled_alert(&self, plugin: &str, reason: &str, consecutive_failures: u32) {
        let mut payload = BTreeMap::new();
        payload.insert("plugin".to_string(), Value::String(plugin.to_string()));
        payload.insert("reason".to_string(), Value::String(reason.to_string()));
        payload.insert("consecutive_failures".to_string(), Value::from(consecutive_failures));
        if let Err(error) =
            self.publish(reserved::SYSTEM_V1, "plugin_disabled", payload, EventPriority::High, None).await
        {
            tracing::warn!(plugin, %error, "failed to publish plugin_disabled alert");
        }
    }
}

#[cfg(test)]
#[path = "event_bus_tests.rs"]
mod tests;
