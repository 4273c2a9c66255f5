// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable persistence: the Redis-Streams-compatible log substrate, the
//! breaker's health hashes, the goal scheduler's instance store, and the
//! gzip snapshot archive (§6.5).

pub mod breaker_store;
pub mod error;
pub mod goal_store;
pub mod redis_substrate;
pub mod snapshot_store;
pub mod substrate;

#[cfg(any(test, feature = "test-support"))]
pub mod fake_substrate;

pub use breaker_store::{BreakerStore, RedisBreakerStore};
pub use error::StorageError;
pub use goal_store::{GoalStore, RedisGoalStore};
pub use redis_substrate::RedisSubstrate;
pub use snapshot_store::SnapshotStore;
pub use substrate::{LogSubstrate, RawEntry};

#[cfg(any(test, feature = "test-support"))]
pub use fake_substrate::FakeSubstrate;

#[cfg(any(test, feature = "test-support"))]
pub use breaker_store::fake::FakeBreakerStore;

#[cfg(any(test, feature = "test-support"))]
pub use goal_store::fake::FakeGoalStore;
