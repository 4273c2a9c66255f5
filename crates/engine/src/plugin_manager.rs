// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Plugin Manager (§4.5): composes discovery, trigger-matching
//! dispatch, a bounded work queue, a fixed worker pool, breaker-gated
//! sandbox invocation, and the manual/hot-reload operator surface.

use crate::breaker::CircuitBreaker;
use crate::error::PluginManagerError;
use crate::event_bus::{EventBus, EventHandler};
use async_trait::async_trait;
use core_adapters::{ContainerWatchdog, PluginResult, PluginTask, Sandbox};
use core_descriptors::PluginLoader;
use core_domain::{Clock, Event};
use parking_lot::Mutex as SyncMutex;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

/// Tuning knobs from §6.6 (`max_concurrent_plugins`, `task_queue_size`).
#[derive(Debug, Clone)]
pub struct PluginManagerConfig {
    pub plugins_dir: PathBuf,
    pub worker_pool_size: usize,
    pub task_queue_size: usize,
    /// Bound on the final drain when [`PluginManager::stop`] is called (§5).
    pub shutdown_grace: Duration,
}

impl Default for PluginManagerConfig {
    fn default() -> Self {
        Self {
            plugins_dir: PathBuf::from("plugins"),
            worker_pool_size: 5,
            task_queue_size: 100,
            shutdown_grace: Duration::from_secs(30),
        }
    }
}

/// One matched dispatch, enqueued by the bus handler and drained by a
/// worker (§4.5 dispatch handler / worker pool).
struct DispatchTask {
    plugin_name: String,
    event: Event,
}

pub struct PluginManager<C: Clock> {
    loader: RwLock<PluginLoader>,
    breaker: Arc<CircuitBreaker<C>>,
    sandbox: Arc<dyn Sandbox>,
    watchdog: Arc<ContainerWatchdog>,
    config: PluginManagerConfig,
    sender: mpsc::Sender<DispatchTask>,
    receiver: Arc<AsyncMutex<mpsc::Receiver<DispatchTask>>>,
    subscribed_topics: SyncMutex<HashSet<String>>,
    workers: SyncMutex<Vec<JoinHandle<()>>>,
}

impl<C: Clock + 'static> PluginManager<C> {
    pub fn new(
        breaker: Arc<CircuitBreaker<C>>,
        sandbox: Arc<dyn Sandbox>,
        watchdog: Arc<ContainerWatchdog>,
        config: PluginManagerConfig,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.task_queue_size);
        Self {
            loader: RwLock::new(PluginLoader::new(config.plugins_dir.clone())),
            breaker,
            sandbox,
            watchdog,
            config,
            sender,
            receiver: Arc::new(AsyncMutex::new(receiver)),
            subscribed_topics: SyncMutex::new(HashSet::new()),
            workers: SyncMutex::new(Vec::new()),
        }
    }

    /// Discover plugins, seed the breaker, sweep orphans, subscribe a
    /// dispatcher for every declared trigger topic, and spin up the
    /// worker pool (§4.5 Start).
    pub async fn start(self: &Arc<Self>, bus: &EventBus<C>) -> Result<(), PluginManagerError> {
        self.loader.write().reload()?;
        let names: Vec<String> = self.loader.read().all().map(|d| d.config.name.clone()).collect();
        self.breaker.discover(&names).await?;
        self.prepare_images().await?;

        self.watchdog.cleanup_exited().await;
        self.watchdog.cleanup_expired(chrono::Utc::now()).await;

        self.subscribe_new_topics(bus);
        self.spawn_workers();
        Ok(())
    }

    /// Build and tag the per-plugin image for every discovered plugin that
    /// declares `requirements`, so `execute` launches the built image
    /// instead of the bare `plugin.image` on every invocation (§4.2).
    async fn prepare_images(&self) -> Result<(), PluginManagerError> {
        let pending: Vec<core_domain::PluginConfig> = self
            .loader
            .read()
            .all()
            .filter(|d| !d.config.requirements.is_empty())
            .map(|d| d.config.clone())
            .collect();

        for mut config in pending {
            let plugin_dir = self.config.plugins_dir.join(&config.name);
            self.sandbox.prepare_image(&mut config, &plugin_dir).await?;
            self.loader.write().set_image(&config.name, config.image);
        }
        Ok(())
    }

    /// Re-scan the plugin directory, rebuild the trigger index, and
    /// subscribe any topic not seen before (§4.5 Hot reload). An
    /// in-flight reload never drops the old index until the new one is
    /// fully parsed and validated (the loader's own contract).
    pub fn reload(self: &Arc<Self>, bus: &EventBus<C>) -> Result<(), PluginManagerError> {
        self.loader.write().reload()?;
        self.subscribe_new_topics(bus);
        Ok(())
    }

    fn subscribe_new_topics(self: &Arc<Self>, bus: &EventBus<C>) {
        let topics: HashSet<String> = self
            .loader
            .read()
            .all()
            .flat_map(|d| d.config.triggers.iter().map(|t| t.topic.clone()))
            .collect();

        let mut subscribed = self.subscribed_topics.lock();
        for topic in topics {
            if subscribed.insert(topic.clone()) {
                bus.subscribe(&topic, self.clone() as Arc<dyn EventHandler>);
            }
        }
    }

    fn spawn_workers(self: &Arc<Self>) {
        let mut workers = self.workers.lock();
        for _ in 0..self.config.worker_pool_size {
            let manager = self.clone();
            workers.push(tokio::spawn(async move { manager.worker_loop().await }));
        }
    }

    async fn worker_loop(self: Arc<Self>) {
        loop {
            let task = {
                let mut rx = self.receiver.lock().await;
                rx.recv().await
            };
            let Some(task) = task else {
                break;
            };

            match self.breaker.is_healthy(&task.plugin_name).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(plugin = task.plugin_name, "dispatch skipped, plugin disabled");
                    continue;
                }
                Err(error) => {
                    tracing::warn!(plugin = task.plugin_name, %error, "breaker lookup failed, skipping dispatch");
                    continue;
                }
            }

            self.run_one(&task).await;
        }
    }

    async fn run_one(&self, task: &DispatchTask) {
        // A plugin that vanished between enqueue and dequeue (hot reload
        // raced a dispatch) simply has nothing to run against.
        let Some(config) = self.plugin_config(&task.plugin_name) else {
            tracing::debug!(plugin = task.plugin_name, "dispatch skipped, plugin no longer known");
            return;
        };
        let plugin_dir = self.config.plugins_dir.join(&task.plugin_name);
        let event_value = serde_json::to_value(&task.event).unwrap_or(Value::Null);
        let sandbox_task = PluginTask { event_id: task.event.event_id.to_string(), event: event_value };

        let result = self.sandbox.execute(&config, &plugin_dir, &sandbox_task).await;
        let outcome = if result.success {
            self.breaker.record_success(&task.plugin_name).await
        } else {
            self.breaker
                .record_failure(&task.plugin_name, result.error.as_deref().unwrap_or("unknown failure"))
                .await
        };
        if let Err(error) = outcome {
            tracing::warn!(plugin = task.plugin_name, %error, "failed to persist breaker state after dispatch");
        }
    }

    /// Trigger a named plugin with a synthetic event, bypassing the
    /// queue entirely (§4.5 Manual operations).
    pub async fn trigger(&self, plugin_name: &str, event_data: Value) -> Result<PluginResult, PluginManagerError> {
        let healthy = self.breaker.is_healthy(plugin_name).await?;
        if !healthy {
            return Err(PluginManagerError::Disabled(plugin_name.to_string()));
        }
        let config = self
            .loader
            .read()
            .get(plugin_name)
            .map(|d| d.config.clone())
            .ok_or_else(|| PluginManagerError::NotFound(plugin_name.to_string()))?;

        let plugin_dir = self.config.plugins_dir.join(plugin_name);
        let task = PluginTask { event_id: core_domain::CorrelationId::new().to_string(), event: event_data };
        let result = self.sandbox.execute(&config, &plugin_dir, &task).await;
        if result.success {
            self.breaker.record_success(plugin_name).await?;
        } else {
            self.breaker
                .record_failure(plugin_name, result.error.as_deref().unwrap_or("unknown failure"))
                .await?;
        }
        Ok(result)
    }

    pub async fn reset(&self, plugin_name: &str) -> Result<(), PluginManagerError> {
        self.breaker.reset(plugin_name).await.map_err(Into::into)
    }

    pub async fn pause(&self, plugin_name: &str, minutes: i64) -> Result<(), PluginManagerError> {
        self.breaker.pause(plugin_name, minutes).await.map_err(Into::into)
    }

    pub async fn force_cleanup_containers(&self) -> usize {
        self.watchdog.force_cleanup_all().await
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.loader.read().all().map(|d| d.config.name.clone()).collect()
    }

    pub fn plugin_config(&self, name: &str) -> Option<core_domain::PluginConfig> {
        self.loader.read().get(name).map(|d| d.config.clone())
    }

    /// Cancel workers, await drain within the configured grace, stop the
    /// watchdog's owner loop (the caller's responsibility), and sweep
    /// once more (§4.5 Stop).
    pub async fn stop(&self) {
        // Dropping the sender's clones via channel close would require
        // ownership we no longer have once workers hold their own
        // reference through the shared receiver; workers observe
        // shutdown through `recv()` returning `None` once every sender
        // is dropped, so the manager's own handle closing is sufficient
        // when callers drop the `Arc<PluginManager>` last.
        let handles = std::mem::take(&mut *self.workers.lock());
        let drain = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(self.config.shutdown_grace, drain).await.is_err() {
            tracing::warn!("plugin manager workers did not drain within the shutdown grace period");
        }
        self.watchdog.force_cleanup_all().await;
    }
}

#[async_trait]
impl<C: Clock + 'static> EventHandler for PluginManager<C> {
    /// The bus-registered dispatcher (§4.5): every matching plugin is
    /// enqueued; a full queue drops that one dispatch and is logged, but
    /// the event is reported as failed so the substrate keeps it pending
    /// for redelivery (§5 Backpressure).
    async fn handle(&self, event: &Event) -> Result<(), String> {
        let matches: Vec<String> = {
            let loader = self.loader.read();
            loader
                .matching(event.topic.as_str(), &event.event_type, &event.payload)
                .map(|d| d.config.name.clone())
                .collect()
        };

        let mut dropped = 0;
        for plugin_name in matches {
            let task = DispatchTask { plugin_name: plugin_name.clone(), event: event.clone() };
            if self.sender.try_send(task).is_err() {
                tracing::warn!(plugin = plugin_name, event_id = %event.event_id, "task queue full, dropping dispatch");
                dropped += 1;
            }
        }

        if dropped > 0 {
            return Err(format!("{dropped} plugin dispatch(es) dropped, queue full"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "plugin_manager_tests.rs"]
mod tests;
