// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validation errors shared by every crate that accepts data from the
//! outside world (publish calls, plugin/goal descriptors, HTTP bodies).

use thiserror::Error;

/// Rejected input: a malformed topic, an oversized payload, a descriptor
/// that fails its own schema rules.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("topic {0:?} is not versioned (expected `<name>.v<N>`)")]
    UnversionedTopic(String),
    #[error("topic {0:?} is not configured")]
    UnknownTopic(String),
    #[error("payload is {actual} bytes, exceeds the {limit} byte limit")]
    PayloadTooLarge { actual: usize, limit: usize },
    #[error("plugin name {0:?} does not match ^[a-z][a-z0-9_-]*$")]
    InvalidPluginName(String),
    #[error("plugin version {0:?} is not a valid semver")]
    InvalidPluginVersion(String),
    #[error("goal {0:?} specifies neither `schedule` nor `triggers`")]
    GoalHasNoTrigger(String),
    #[error("schedule expression {0:?} is not recognized")]
    InvalidSchedule(String),
    #[error("step {0:?}: {1}")]
    InvalidStep(String, String),
}

/// Umbrella error kind used where call sites need one type across the
/// validation/config-loading boundary; subsystem crates define their own
/// richer enums (see `core-storage`, `core-adapters`, `core-engine`).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
