// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event envelope, topic naming, and per-stream configuration.

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Hard ceiling on a serialized payload, per §3.
pub const MAX_PAYLOAD_BYTES: usize = 32 * 1024;

/// Lexicographically-sortable id assigned by the log substrate at append
/// time (mirrors a Redis stream entry id: `<millis>-<seq>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId {
    millis: u64,
    seq: u64,
}

impl EventId {
    pub fn new(millis: u64, seq: u64) -> Self {
        Self { millis, seq }
    }

    pub fn millis(&self) -> u64 {
        self.millis
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.millis, self.seq)
    }
}

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventIdParseError {
    #[error("malformed event id {0:?}, expected `<millis>-<seq>`")]
    Malformed(String),
}

impl FromStr for EventId {
    type Err = EventIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (millis, seq) = s
            .split_once('-')
            .ok_or_else(|| EventIdParseError::Malformed(s.to_string()))?;
        let millis: u64 = millis
            .parse()
            .map_err(|_| EventIdParseError::Malformed(s.to_string()))?;
        let seq: u64 = seq
            .parse()
            .map_err(|_| EventIdParseError::Malformed(s.to_string()))?;
        Ok(Self { millis, seq })
    }
}

impl Serialize for EventId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A versioned, validated topic name (`<name>.v<N>`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    pub fn parse(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        if !topic_pattern().is_match(&s) {
            return Err(ValidationError::UnversionedTopic(s));
        }
        Ok(Self(s))
    }

    /// Construct without validation; reserved for compiled-in constants.
    pub fn new_unchecked(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[allow(clippy::expect_used)]
fn topic_pattern() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^.+\.v\d+$").expect("static pattern is valid"))
}

/// Reserved topic namespace defaults (§6.2).
pub mod reserved {
    pub const SYSTEM_V1: &str = "system.v1";
    pub const CHAT_V1: &str = "chat.v1";
    pub const FS_V1: &str = "fs.v1";
    pub const MEMORY_V1: &str = "memory.v1";
    pub const PLUGIN_V1: &str = "plugin.v1";
    /// Default dead-letter stream. Named `errors.v1` (rather than the
    /// colloquial `errors.dlq`) so it satisfies the same `.v<N>` topic
    /// invariant as every other stream; see DESIGN.md.
    pub const DEFAULT_DLQ: &str = "errors.v1";
}

/// Delivery priority; weight used for in-batch stable sort (§4.1 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventPriority {
    Low,
    Medium,
    High,
}

impl Default for EventPriority {
    fn default() -> Self {
        Self::Medium
    }
}

impl EventPriority {
    /// Default weight table; overridable via `priority_weights` config (§6.6).
    pub fn default_weight(self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }
}

crate::simple_display! {
    EventPriority {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

/// Per-event metadata (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMeta {
    #[serde(default)]
    pub priority: EventPriority,
    #[serde(default)]
    pub retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Default for EventMeta {
    fn default() -> Self {
        Self {
            priority: EventPriority::default(),
            retries: 0,
            trace_id: None,
            source: None,
        }
    }
}

/// Current event schema version (§3).
pub const SCHEMA_VERSION: u32 = 1;

/// The unit of communication flowing through the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: EventId,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub topic: Topic,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub payload: BTreeMap<String, Value>,
    pub meta: EventMeta,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl Event {
    /// Validate the invariants a publisher must uphold before handing the
    /// event to the substrate: versioned topic, payload size ceiling.
    pub fn validate_payload(payload: &BTreeMap<String, Value>) -> Result<(), ValidationError> {
        let size = serde_json::to_vec(payload).map(|v| v.len()).unwrap_or(usize::MAX);
        if size > MAX_PAYLOAD_BYTES {
            return Err(ValidationError::PayloadTooLarge {
                actual: size,
                limit: MAX_PAYLOAD_BYTES,
            });
        }
        Ok(())
    }

    /// Produce a new event with `meta.retries` incremented; per §3 this is
    /// the only way retries ever change (never mutated in place).
    pub fn with_incremented_retries(&self) -> Self {
        let mut next = self.clone();
        next.meta.retries += 1;
        next
    }
}

/// Per-topic configuration (§3, §6.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub name: Topic,
    /// Approximate `MAXLEN` trim bound.
    pub maxlen: u64,
    /// Messages/sec permitted for this topic's bucket.
    pub rate_limit: u32,
    /// Max `meta.retries` before an event is dead-lettered.
    pub retry_limit: u32,
}

impl StreamConfig {
    pub fn new(name: Topic, maxlen: u64, rate_limit: u32, retry_limit: u32) -> Self {
        Self {
            name,
            maxlen,
            rate_limit,
            retry_limit,
        }
    }
}

/// Correlation id for a `plugin.v1/execute` ↔ `plugin.result` round trip
/// (§6.3). Randomly generated; no ordering requirement, so it reuses the
/// prefixed-nanoid scheme the rest of the workspace uses for opaque ids.
crate::define_id! {
    /// Correlates a goal step's plugin invocation with its async result.
    pub struct CorrelationId("corr");
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
