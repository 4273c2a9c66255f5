// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable side-state for the Goal Scheduler (§6.5): one hash per
//! instance keyed `goal:<instance_id>`, a due-time sorted set `goal_queue`
//! mapping `instance_id → next_run_ts`, and one set per goal
//! `goal_instances:<goal_id>` of known instance ids.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_domain::{GoalInstance, GoalState};
use redis::AsyncCommands;

/// TTL applied to a terminal instance record (§3, §6.5).
pub const INSTANCE_TTL_SECS: i64 = 7 * 24 * 60 * 60;

const QUEUE_KEY: &str = "goal_queue";

fn instance_key(instance_id: &str) -> String {
    format!("goal:{instance_id}")
}

fn goal_instances_key(goal_id: &str) -> String {
    format!("goal_instances:{goal_id}")
}

#[async_trait]
pub trait GoalStore: Send + Sync {
    /// Persist `instance`. Only `PENDING` instances stay in (or rejoin)
    /// the due-time queue at `next_run_ts`; `IN_PROGRESS`, `PAUSED`, and
    /// terminal instances are all removed from it, and a terminal
    /// instance's record TTL is set to [`INSTANCE_TTL_SECS`].
    async fn save_instance(&self, instance: &GoalInstance) -> Result<(), crate::StorageError>;

    async fn load_instance(&self, instance_id: &str) -> Result<Option<GoalInstance>, crate::StorageError>;

    /// Instances whose `next_run_ts <= now`, oldest-due first, capped at
    /// `limit`.
    async fn due_instances(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<String>, crate::StorageError>;

    /// Remove an instance from the due-time queue without touching its
    /// record (used when pausing).
    async fn remove_from_queue(&self, instance_id: &str) -> Result<(), crate::StorageError>;

    /// All known instance ids for `goal_id`, most-recently-created last.
    async fn list_instance_ids(&self, goal_id: &str) -> Result<Vec<String>, crate::StorageError>;
}

/// Redis-backed [`GoalStore`].
#[derive(Clone)]
pub struct RedisGoalStore {
    conn: redis::aio::ConnectionManager,
}

impl RedisGoalStore {
    pub fn new(conn: redis::aio::ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl GoalStore for RedisGoalStore {
    async fn save_instance(&self, instance: &GoalInstance) -> Result<(), crate::StorageError> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(instance)?;
        let key = instance_key(&instance.instance_id);
        let _: () = conn.set(&key, json).await?;
        let _: () = conn.sadd(goal_instances_key(&instance.goal_id), &instance.instance_id).await?;

        if matches!(instance.state, GoalState::Pending) {
            let score = instance.next_run_ts.timestamp();
            let _: () = conn.zadd(QUEUE_KEY, &instance.instance_id, score).await?;
        } else {
            let _: () = conn.zrem(QUEUE_KEY, &instance.instance_id).await?;
            if instance.state.is_terminal() {
                let _: () = conn.expire(&key, INSTANCE_TTL_SECS).await?;
            }
        }
        Ok(())
    }

    async fn load_instance(&self, instance_id: &str) -> Result<Option<GoalInstance>, crate::StorageError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(instance_key(instance_id)).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn due_instances(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<String>, crate::StorageError> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn
            .zrangebyscore_limit(QUEUE_KEY, i64::MIN, now.timestamp(), 0, limit as isize)
            .await?;
        Ok(ids)
    }

    async fn remove_from_queue(&self, instance_id: &str) -> Result<(), crate::StorageError> {
        let mut conn = self.conn.clone();
        let _: () = conn.zrem(QUEUE_KEY, instance_id).await?;
        Ok(())
    }

    async fn list_instance_ids(&self, goal_id: &str) -> Result<Vec<String>, crate::StorageError> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn.smembers(goal_instances_key(goal_id)).await?;
        Ok(ids)
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::{BTreeMap, HashMap, HashSet};
    use std::sync::Arc;

    /// In-process [`GoalStore`] for unit tests: a map of records plus a
    /// `BTreeMap<(score, id), ()>` standing in for the Redis sorted set so
    /// due-time ordering is deterministic.
    #[derive(Clone, Default)]
    pub struct FakeGoalStore {
        records: Arc<Mutex<HashMap<String, GoalInstance>>>,
        queue: Arc<Mutex<BTreeMap<(i64, String), ()>>>,
        by_goal: Arc<Mutex<HashMap<String, HashSet<String>>>>,
    }

    impl FakeGoalStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl GoalStore for FakeGoalStore {
        async fn save_instance(&self, instance: &GoalInstance) -> Result<(), crate::StorageError> {
            let id = instance.instance_id.clone();
            self.records.lock().insert(id.clone(), instance.clone());
            self.by_goal
                .lock()
                .entry(instance.goal_id.clone())
                .or_default()
                .insert(id.clone());

            let mut queue = self.queue.lock();
            queue.retain(|(_, qid), _| qid != &id);
            if matches!(instance.state, GoalState::Pending) {
                queue.insert((instance.next_run_ts.timestamp(), id), ());
            }
            Ok(())
        }

        async fn load_instance(&self, instance_id: &str) -> Result<Option<GoalInstance>, crate::StorageError> {
            Ok(self.records.lock().get(instance_id).cloned())
        }

        async fn due_instances(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<String>, crate::StorageError> {
            let now_ts = now.timestamp();
            Ok(self
                .queue
                .lock()
                .iter()
                .filter(|((ts, _), _)| *ts <= now_ts)
                .take(limit)
                .map(|((_, id), _)| id.clone())
                .collect())
        }

        async fn remove_from_queue(&self, instance_id: &str) -> Result<(), crate::StorageError> {
            self.queue.lock().retain(|(_, id), _| id != instance_id);
            Ok(())
        }

        async fn list_instance_ids(&self, goal_id: &str) -> Result<Vec<String>, crate::StorageError> {
            Ok(self
                .by_goal
                .lock()
                .get(goal_id)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeGoalStore;
    use super::*;
    use chrono::Duration;
    use core_domain::GoalInstance;

    #[tokio::test]
    async fn terminal_instances_leave_the_due_time_queue() {
        let store = FakeGoalStore::new();
        let now = Utc::now();
        let mut instance = GoalInstance::pending("g1".into(), now - Duration::seconds(1), now);
        store.save_instance(&instance).await.unwrap();
        assert_eq!(store.due_instances(now, 10).await.unwrap(), vec![instance.instance_id.clone()]);

        instance.state = GoalState::Succeeded;
        store.save_instance(&instance).await.unwrap();
        assert!(store.due_instances(now, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn in_progress_and_paused_instances_leave_the_due_time_queue() {
        let store = FakeGoalStore::new();
        let now = Utc::now();
        let mut instance = GoalInstance::pending("g1".into(), now - Duration::seconds(1), now);
        store.save_instance(&instance).await.unwrap();

        instance.state = GoalState::InProgress;
        store.save_instance(&instance).await.unwrap();
        assert!(store.due_instances(now, 10).await.unwrap().is_empty());

        instance.state = GoalState::Paused;
        store.save_instance(&instance).await.unwrap();
        assert!(store.due_instances(now, 10).await.unwrap().is_empty());

        instance.state = GoalState::Pending;
        store.save_instance(&instance).await.unwrap();
        assert_eq!(store.due_instances(now, 10).await.unwrap(), vec![instance.instance_id]);
    }

    #[tokio::test]
    async fn due_instances_respects_the_now_cutoff() {
        let store = FakeGoalStore::new();
        let now = Utc::now();
        let future = GoalInstance::pending("g1".into(), now + Duration::seconds(60), now);
        store.save_instance(&future).await.unwrap();
        assert!(store.due_instances(now, 10).await.unwrap().is_empty());
        assert_eq!(
            store.due_instances(now + Duration::seconds(61), 10).await.unwrap(),
            vec![future.instance_id]
        );
    }

    #[tokio::test]
    async fn list_instance_ids_tracks_every_save() {
        let store = FakeGoalStore::new();
        let now = Utc::now();
        let a = GoalInstance::pending("g1".into(), now, now);
        let b = GoalInstance::pending("g1".into(), now, now);
        store.save_instance(&a).await.unwrap();
        store.save_instance(&b).await.unwrap();
        let mut ids = store.list_instance_ids("g1").await.unwrap();
        ids.sort();
        let mut expected = vec![a.instance_id, b.instance_id];
        expected.sort();
        assert_eq!(ids, expected);
    }
}
