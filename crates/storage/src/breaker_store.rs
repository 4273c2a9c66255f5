// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable side-state for the Circuit Breaker (§6.5): one record per
//! plugin, keyed `plugin:health:<name>`, TTL 7 days after last update.

use async_trait::async_trait;
use core_domain::PluginHealth;
use redis::AsyncCommands;

/// TTL applied to a breaker health record after every write (§6.5).
pub const BREAKER_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[async_trait]
pub trait BreakerStore: Send + Sync {
    /// Load the persisted health record for `plugin`, if one exists.
    async fn load(&self, plugin: &str) -> Result<Option<PluginHealth>, crate::StorageError>;

    /// Persist `health`, refreshing the TTL. Per §9 "write-then-mutate":
    /// callers must await this before exposing the new in-memory state.
    async fn save(&self, plugin: &str, health: &PluginHealth) -> Result<(), crate::StorageError>;
}

fn key(plugin: &str) -> String {
    format!("plugin:health:{plugin}")
}

/// Redis-backed [`BreakerStore`], storing each record as a JSON blob under
/// its key with a refreshed TTL on every save.
#[derive(Clone)]
pub struct RedisBreakerStore {
    conn: redis::aio::ConnectionManager,
}

impl RedisBreakerStore {
    pub fn new(conn: redis::aio::ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl BreakerStore for RedisBreakerStore {
    async fn load(&self, plugin: &str) -> Result<Option<PluginHealth>, crate::StorageError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key(plugin)).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, plugin: &str, health: &PluginHealth) -> Result<(), crate::StorageError> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(health)?;
        let _: () = conn.set_ex(key(plugin), json, BREAKER_TTL_SECS as u64).await?;
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// In-process [`BreakerStore`] for unit tests.
    #[derive(Clone, Default)]
    pub struct FakeBreakerStore {
        records: Arc<Mutex<HashMap<String, PluginHealth>>>,
    }

    impl FakeBreakerStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl BreakerStore for FakeBreakerStore {
        async fn load(&self, plugin: &str) -> Result<Option<PluginHealth>, crate::StorageError> {
            Ok(self.records.lock().get(plugin).cloned())
        }

        async fn save(&self, plugin: &str, health: &PluginHealth) -> Result<(), crate::StorageError> {
            self.records.lock().insert(plugin.to_string(), health.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeBreakerStore;
    use super::*;
    use core_domain::PluginHealth;

    #[tokio::test]
    async fn round_trips_through_save_and_load() {
        let store = FakeBreakerStore::new();
        assert!(store.load("p").await.unwrap().is_none());

        let mut health = PluginHealth::new_active();
        health.consecutive_failures = 3;
        store.save("p", &health).await.unwrap();

        let loaded = store.load("p").await.unwrap().unwrap();
        assert_eq!(loaded.consecutive_failures, 3);
    }
}
