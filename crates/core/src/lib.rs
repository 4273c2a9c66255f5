// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain types shared by every subsystem of the core runtime: events,
//! topics, plugin and goal descriptors, health/instance state, and the
//! small id/clock/macro plumbing the rest of the workspace builds on.

#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

pub mod clock;
pub mod error;
pub mod event;
pub mod goal;
pub mod id;
#[macro_use]
pub mod macros;
pub mod plugin;
pub mod snapshot;
pub mod template;

pub use clock::{Clock, FakeClock, SystemClock};
pub use error::{CoreError, ValidationError};
pub use event::{
    CorrelationId, Event, EventId, EventMeta, EventPriority, StreamConfig, Topic, MAX_PAYLOAD_BYTES,
};
pub use goal::{
    GoalConfig, GoalInstance, GoalState, GoalStep, GoalStepResult, GoalTrigger, RetryPolicy,
    StepType,
};
pub use plugin::{
    BreakerState, PluginConfig, PluginHealth, PluginPermissions, PluginResources, PluginTrigger,
};
pub use snapshot::{Snapshot, SnapshotMetadata};
