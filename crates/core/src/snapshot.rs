// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot data model (§3). The gzip/file I/O lives in `core-storage`;
//! this module only defines the shapes that get serialized.

use crate::event::{Event, EventId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Header describing a snapshot, returned from `create_snapshot` and
/// listed by `list_snapshots` without decompressing the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub snapshot_id: String,
    pub topic: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub event_count: usize,
    pub created_at: DateTime<Utc>,
}

impl SnapshotMetadata {
    /// `<topic>_<startUTC>_<endUTC>`, deterministic per §3.
    pub fn make_id(topic: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
        format!(
            "{topic}_{}_{}",
            start.format("%Y%m%dT%H%M%SZ"),
            end.format("%Y%m%dT%H%M%SZ")
        )
    }
}

/// The gzip-compressed JSON document body: `{metadata, events[]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub metadata: SnapshotMetadata,
    pub events: Vec<(EventId, Event)>,
}
