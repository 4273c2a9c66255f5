// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Circuit Breaker (§4.3): a durable consecutive-failure counter per
//! plugin, guarding the Plugin Manager's worker pool.

use crate::error::BreakerError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_domain::plugin::{DEFAULT_FAILURE_HISTORY, DEFAULT_FAILURE_THRESHOLD, DEFAULT_RESET_TIMEOUT_SECS};
use core_domain::{BreakerState, Clock, PluginHealth};
use core_storage::BreakerStore;
use std::sync::Arc;

/// Fire-and-forget sink for the `system.v1 / plugin_disabled` alert a
/// DISABLED transition emits (§4.3, §6.3). Implemented by [`crate::event_bus::EventBus`].
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn publish_disabled_alert(&self, plugin: &str, reason: &str, consecutive_failures: u32);
}

/// A sink that drops every alert; useful where no bus is wired (tests,
/// standalone breaker tooling).
pub struct NullAlertSink;

#[async_trait]
impl AlertSink for NullAlertSink {
    async fn publish_disabled_alert(&self, _plugin: &str, _reason: &str, _consecutive_failures: u32) {}
}

#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub reset_timeout_secs: i64,
    pub failure_history: usize,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            reset_timeout_secs: DEFAULT_RESET_TIMEOUT_SECS,
            failure_history: DEFAULT_FAILURE_HISTORY,
        }
    }
}

pub struct CircuitBreaker<C: Clock> {
    store: Arc<dyn BreakerStore>,
    alerts: Arc<dyn AlertSink>,
    clock: Arc<C>,
    config: BreakerConfig,
}

impl<C: Clock> CircuitBreaker<C> {
    pub fn new(store: Arc<dyn BreakerStore>, alerts: Arc<dyn AlertSink>, clock: Arc<C>, config: BreakerConfig) -> Self {
        Self { store, alerts, clock, config }
    }

    fn now(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.clock.epoch_ms() as i64).unwrap_or_else(Utc::now)
    }

    /// Load the persisted record, or seed a fresh ACTIVE one on first
    /// discovery (§3 "created on first discovery").
    async fn load_or_create(&self, plugin: &str) -> Result<PluginHealth, BreakerError> {
        match self.store.load(plugin).await? {
            Some(health) => Ok(health),
            None => {
                let health = PluginHealth::new_active();
                self.store.save(plugin, &health).await?;
                Ok(health)
            }
        }
    }

    /// Seed persisted health for every discovered plugin up front
    /// (§4.5 Plugin Manager start).
    pub async fn discover(&self, plugin_names: &[String]) -> Result<(), BreakerError> {
        for name in plugin_names {
            self.load_or_create(name).await?;
        }
        Ok(())
    }

    /// The full persisted record, for the admin detail endpoint (§6.1).
    pub async fn health(&self, plugin: &str) -> Result<PluginHealth, BreakerError> {
        self.load_or_create(plugin).await
    }

    /// True iff `plugin` may execute now: ACTIVE, or PAUSED/DISABLED whose
    /// cooldown has elapsed (§4.3 Contract to caller).
    pub async fn is_healthy(&self, plugin: &str) -> Result<bool, BreakerError> {
        let health = self.load_or_create(plugin).await?;
        Ok(match health.state {
            BreakerState::Active => true,
            BreakerState::Disabled | BreakerState::Paused => {
                health.disabled_until.map(|until| self.now() >= until).unwrap_or(true)
            }
        })
    }

    /// Reset the consecutive-failure counter and, if the cooldown has
    /// elapsed, transition back to ACTIVE (§4.3 transition table).
    pub async fn record_success(&self, plugin: &str) -> Result<(), BreakerError> {
        let mut health = self.load_or_create(plugin).await?;
        health.total_executions += 1;
        health.consecutive_failures = 0;
        health.last_success = Some(self.now());
        health.state = BreakerState::Active;
        health.disabled_until = None;
        self.store.save(plugin, &health).await?;
        Ok(())
    }

    /// Bump the consecutive-failure counter; past `failure_threshold`,
    /// transition ACTIVE → DISABLED and emit the alert event (§4.3).
    pub async fn record_failure(&self, plugin: &str, error: &str) -> Result<(), BreakerError> {
        let mut health = self.load_or_create(plugin).await?;
        let now = self.now();
        health.total_executions += 1;
        health.total_failures += 1;
        health.consecutive_failures += 1;
        health.last_failure = Some(now);
        health.push_failure_reason(error.to_string(), self.config.failure_history);

        let just_disabled = health.state == BreakerState::Active && health.consecutive_failures >= self.config.failure_threshold;
        if just_disabled {
            health.state = BreakerState::Disabled;
            health.disabled_until = Some(now + chrono::Duration::seconds(self.config.reset_timeout_secs));
        }
        self.store.save(plugin, &health).await?;

        if just_disabled {
            self.alerts
                .publish_disabled_alert(plugin, "consecutive failure threshold exceeded", health.consecutive_failures)
                .await;
        }
        Ok(())
    }

    /// Operator reset: force ACTIVE regardless of current state (§4.3).
    pub async fn reset(&self, plugin: &str) -> Result<(), BreakerError> {
        let mut health = self.load_or_create(plugin).await?;
        health.state = BreakerState::Active;
        health.consecutive_failures = 0;
        health.disabled_until = None;
        self.store.save(plugin, &health).await?;
        Ok(())
    }

    /// Operator pause for `minutes`, regardless of current state (§4.3).
    pub async fn pause(&self, plugin: &str, minutes: i64) -> Result<(), BreakerError> {
        let mut health = self.load_or_create(plugin).await?;
        health.state = BreakerState::Paused;
        health.disabled_until = Some(self.now() + chrono::Duration::minutes(minutes));
        self.store.save(plugin, &health).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "breaker_tests.rs"]
mod tests;
