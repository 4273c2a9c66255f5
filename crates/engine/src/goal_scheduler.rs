// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Goal Scheduler (§4.6): loads YAML workflow definitions, drives
//! periodic and event-triggered instances through a due-time index,
//! executes steps sequentially with template-rendered parameters, and
//! retries with exponential backoff.
//!
//! Plugin steps are resolved through the [`StepExecutor`] seam (§9 Open
//! Questions): [`BusStepExecutor`] is the canonical, production wiring —
//! it publishes `plugin.v1 / execute` and awaits a correlated
//! `plugin.v1 / result` — while [`sim::SimulatedStepExecutor`] is an
//! in-process test double for Goal Scheduler unit tests that don't want
//! to stand up a Plugin Manager.

use crate::error::GoalSchedulerError;
use crate::event_bus::{EventBus, EventHandler};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_descriptors::{GoalIndex, GoalLoader};
use core_domain::event::reserved;
use core_domain::template::{self, TemplateContext};
use core_domain::{
    Clock, CorrelationId, Event, EventId, EventMeta, EventPriority, GoalConfig, GoalInstance,
    GoalState, GoalStep, GoalStepResult, StepType, Topic,
};
use core_storage::GoalStore;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::JoinSet;

/// Tuning knobs from §6.6 (`goals_dir`, `loop_interval_sec`,
/// `default_timeout_sec`, `max_concurrent_goals`).
#[derive(Debug, Clone)]
pub struct GoalSchedulerConfig {
    pub goals_dir: PathBuf,
    pub loop_interval_sec: u64,
    /// Fallback applied when a goal config predates the `timeout_sec`
    /// default (kept for descriptors loaded before this field existed).
    pub default_timeout_sec: u64,
    pub max_concurrent_goals: usize,
    /// Bound on the final drain when [`GoalScheduler::shutdown`] is
    /// called (§5 Cancellation and timeouts).
    pub shutdown_grace: Duration,
}

impl Default for GoalSchedulerConfig {
    fn default() -> Self {
        Self {
            goals_dir: PathBuf::from("goals"),
            loop_interval_sec: 10,
            default_timeout_sec: 300,
            max_concurrent_goals: 10,
            shutdown_grace: Duration::from_secs(30),
        }
    }
}

/// Resolves a `plugin` step's execution (§9 Open Questions, resolved in
/// DESIGN.md). Exists as its own seam so production wiring (bus
/// round-trip) and unit tests (synchronous double) share one call site.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    async fn execute_plugin(
        &self,
        plugin: &str,
        params: BTreeMap<String, Value>,
        timeout: Duration,
    ) -> Result<GoalStepResult, GoalSchedulerError>;
}

struct PluginResultPayload {
    success: bool,
    result: Option<Value>,
    error: Option<String>,
}

/// The canonical [`StepExecutor`]: publishes `plugin.v1 / execute` and
/// waits for a `plugin.v1 / result` event correlated by `correlation_id`
/// (§4.6 Step dispatch, §6.3, §9 Correlation for plugin-result).
pub struct BusStepExecutor<C: Clock> {
    bus: Arc<EventBus<C>>,
    pending: AsyncMutex<HashMap<String, oneshot::Sender<PluginResultPayload>>>,
}

impl<C: Clock + 'static> BusStepExecutor<C> {
    pub fn new(bus: Arc<EventBus<C>>) -> Arc<Self> {
        Arc::new(Self { bus, pending: AsyncMutex::new(HashMap::new()) })
    }

    /// Subscribe for correlated results on `plugin.v1` (§6.3). Must be
    /// called once before any goal publishes a `plugin` step.
    pub fn install(self: &Arc<Self>) {
        self.bus.subscribe(reserved::PLUGIN_V1, self.clone() as Arc<dyn EventHandler>);
    }
}

#[async_trait]
impl<C: Clock + 'static> EventHandler for BusStepExecutor<C> {
    async fn handle(&self, event: &Event) -> Result<(), String> {
        if event.event_type != "result" {
            return Ok(());
        }
        let Some(Value::String(correlation_id)) = event.payload.get("correlation_id") else {
            tracing::warn!("plugin.result event missing correlation_id, dropping");
            return Ok(());
        };

        let sender = self.pending.lock().await.remove(correlation_id);
        let Some(sender) = sender else {
            // Already timed out and garbage-collected, or not ours.
            return Ok(());
        };
        let payload = PluginResultPayload {
            success: event.payload.get("success").and_then(Value::as_bool).unwrap_or(false),
            result: event.payload.get("result").cloned(),
            error: event.payload.get("error").and_then(Value::as_str).map(str::to_string),
        };
        let _ = sender.send(payload);
        Ok(())
    }
}

#[async_trait]
impl<C: Clock + 'static> StepExecutor for BusStepExecutor<C> {
    async fn execute_plugin(
        &self,
        plugin: &str,
        params: BTreeMap<String, Value>,
        timeout: Duration,
    ) -> Result<GoalStepResult, GoalSchedulerError> {
        let correlation_id = CorrelationId::new().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(correlation_id.clone(), tx);

        let mut payload = BTreeMap::new();
        payload.insert("plugin".to_string(), Value::String(plugin.to_string()));
        payload.insert("params".to_string(), serde_json::to_value(&params).unwrap_or(Value::Null));
        payload.insert("correlation_id".to_string(), Value::String(correlation_id.clone()));
        payload.insert("timeout".to_string(), Value::from(timeout.as_secs()));

        self.bus
            .publish(reserved::PLUGIN_V1, "execute", payload, EventPriority::default(), None)
            .await
            .map_err(GoalSchedulerError::Bus)?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(payload)) => {
                Ok(GoalStepResult::Plugin { success: payload.success, result: payload.result, error: payload.error })
            }
            Ok(Err(_)) => Err(GoalSchedulerError::StepTimeout(plugin.to_string())),
            Err(_) => {
                // Garbage-collect the unresolved correlation (§9).
                self.pending.lock().await.remove(&correlation_id);
                Err(GoalSchedulerError::StepTimeout(plugin.to_string()))
            }
        }
    }
}

/// In-process [`StepExecutor`] doubles for tests that don't want to wire
/// a full bus round-trip (§9 Open Questions, resolved in DESIGN.md).
#[cfg(any(test, feature = "test-support"))]
pub mod sim {
    use super::*;
    use parking_lot::Mutex;

    type Responder = Box<dyn Fn() -> Result<Value, String> + Send + Sync>;

    /// A canned-response [`StepExecutor`]: register a responder per
    /// plugin name, then drive goal executions synchronously without a
    /// Plugin Manager in the loop.
    #[derive(Default)]
    pub struct SimulatedStepExecutor {
        responders: Mutex<HashMap<String, Responder>>,
    }

    impl SimulatedStepExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn always_succeeds(&self, plugin: &str, value: Value) {
            self.responders.lock().insert(plugin.to_string(), Box::new(move || Ok(value.clone())));
        }

        pub fn always_fails(&self, plugin: &str, error: impl Into<String>) {
            let error = error.into();
            self.responders.lock().insert(plugin.to_string(), Box::new(move || Err(error.clone())));
        }
    }

    #[async_trait]
    impl StepExecutor for SimulatedStepExecutor {
        async fn execute_plugin(
            &self,
            plugin: &str,
            _params: BTreeMap<String, Value>,
            _timeout: Duration,
        ) -> Result<GoalStepResult, GoalSchedulerError> {
            let outcome = match self.responders.lock().get(plugin) {
                Some(responder) => responder(),
                None => Err(format!("no simulated response registered for plugin {plugin:?}")),
            };
            Ok(match outcome {
                Ok(value) => GoalStepResult::Plugin { success: true, result: Some(value), error: None },
                Err(error) => GoalStepResult::Plugin { success: false, result: None, error: Some(error) },
            })
        }
    }
}

fn synthetic_trigger_event(payload: BTreeMap<String, Value>, now: DateTime<Utc>, epoch_ms: u64) -> Event {
    Event {
        event_id: EventId::new(epoch_ms, 0),
        schema_version: core_domain::event::SCHEMA_VERSION,
        topic: Topic::new_unchecked("manual.v1"),
        event_type: "manual_trigger".to_string(),
        timestamp: now,
        payload,
        meta: EventMeta::default(),
    }
}

pub struct GoalScheduler<C: Clock> {
    loader: GoalLoader,
    index: RwLock<GoalIndex>,
    store: Arc<dyn GoalStore>,
    bus: Arc<EventBus<C>>,
    step_executor: Arc<dyn StepExecutor>,
    clock: Arc<C>,
    config: GoalSchedulerConfig,
    tasks: AsyncMutex<JoinSet<()>>,
}

impl<C: Clock + 'static> GoalScheduler<C> {
    pub fn new(
        store: Arc<dyn GoalStore>,
        bus: Arc<EventBus<C>>,
        step_executor: Arc<dyn StepExecutor>,
        clock: Arc<C>,
        config: GoalSchedulerConfig,
    ) -> Self {
        Self {
            loader: GoalLoader::new(config.goals_dir.clone()),
            index: RwLock::new(GoalIndex::default()),
            store,
            bus,
            step_executor,
            clock,
            config,
            tasks: AsyncMutex::new(JoinSet::new()),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.clock.epoch_ms() as i64).unwrap_or_else(Utc::now)
    }

    /// Re-scan the goals directory and atomically replace the in-memory
    /// index (§4.6 Loader, §6.1 `POST /goals/reload`).
    pub fn reload(&self) -> Result<(), GoalSchedulerError> {
        let index = self.loader.load()?;
        *self.index.write() = index;
        Ok(())
    }

    pub fn goal(&self, goal_id: &str) -> Option<GoalConfig> {
        self.index.read().get(goal_id).cloned()
    }

    pub fn goals(&self) -> Vec<GoalConfig> {
        self.index.read().all().cloned().collect()
    }

    /// Seed a fresh PENDING instance for every enabled periodic goal with
    /// no live (PENDING or IN_PROGRESS) instance (§4.6 Initialization).
    pub async fn initialize_periodic_goals(&self) -> Result<(), GoalSchedulerError> {
        let goals: Vec<GoalConfig> = self.index.read().periodic().cloned().collect();
        for goal in goals {
            if self.has_live_instance(&goal.id).await? {
                continue;
            }
            self.schedule_next_periodic(&goal).await?;
        }
        Ok(())
    }

    async fn has_live_instance(&self, goal_id: &str) -> Result<bool, GoalSchedulerError> {
        for instance_id in self.store.list_instance_ids(goal_id).await? {
            if let Some(instance) = self.store.load_instance(&instance_id).await? {
                if matches!(instance.state, GoalState::Pending | GoalState::InProgress) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    async fn schedule_next_periodic(&self, goal: &GoalConfig) -> Result<(), GoalSchedulerError> {
        let Some(schedule) = &goal.schedule else {
            return Ok(());
        };
        let now = self.now();
        let next_run = core_descriptors::next_run_after(schedule, now)?;
        let instance = GoalInstance::pending(goal.id.clone(), next_run, now);
        self.store.save_instance(&instance).await?;
        Ok(())
    }

    /// Load the index, seed periodic goals, and subscribe an
    /// event-trigger handler for every topic any goal declares (§4.6
    /// Initialization, Event-triggered goals).
    pub async fn start(self: &Arc<Self>) -> Result<(), GoalSchedulerError> {
        self.reload()?;
        self.initialize_periodic_goals().await?;

        let topics: HashSet<String> =
            self.index.read().all().flat_map(|g| g.triggers.iter().map(|t| t.topic.clone())).collect();
        for topic in topics {
            self.bus.subscribe(&topic, self.clone() as Arc<dyn EventHandler>);
        }
        Ok(())
    }

    /// Manually trigger `goal_id`, bypassing schedule/trigger matching
    /// (§6.1 `POST /goals/run`). Supplied `params` become the instance's
    /// synthetic `trigger_event`, resolvable as `{{ trigger.* }}`.
    pub async fn run_goal(
        &self,
        goal_id: &str,
        params: Option<BTreeMap<String, Value>>,
    ) -> Result<String, GoalSchedulerError> {
        let goal = self.goal(goal_id).ok_or_else(|| GoalSchedulerError::NotFound(goal_id.to_string()))?;
        let now = self.now();
        let mut instance = GoalInstance::pending(goal.id.clone(), now, now);
        if let Some(params) = params {
            instance.trigger_event = Some(synthetic_trigger_event(params, now, self.clock.epoch_ms()));
        }
        self.store.save_instance(&instance).await?;
        Ok(instance.instance_id)
    }

    /// Remove an instance from the due-time index (§4.6 Pause/resume).
    pub async fn pause_instance(&self, instance_id: &str) -> Result<(), GoalSchedulerError> {
        let mut instance = self.load_instance(instance_id).await?;
        instance.state = GoalState::Paused;
        self.store.save_instance(&instance).await?;
        Ok(())
    }

    /// Re-insert an instance into the due-time index at `now` (§4.6
    /// Pause/resume).
    pub async fn resume_instance(&self, instance_id: &str) -> Result<(), GoalSchedulerError> {
        let mut instance = self.load_instance(instance_id).await?;
        instance.state = GoalState::Pending;
        instance.next_run_ts = self.now();
        self.store.save_instance(&instance).await?;
        Ok(())
    }

    async fn load_instance(&self, instance_id: &str) -> Result<GoalInstance, GoalSchedulerError> {
        self.store
            .load_instance(instance_id)
            .await?
            .ok_or_else(|| GoalSchedulerError::NoSuchInstance(instance_id.to_string()))
    }

    pub async fn instance(&self, instance_id: &str) -> Result<GoalInstance, GoalSchedulerError> {
        self.load_instance(instance_id).await
    }

    /// All known instances for `goal_id`, oldest first (§6.1 `GET
    /// /goals/{id}`).
    pub async fn instances_for(&self, goal_id: &str) -> Result<Vec<GoalInstance>, GoalSchedulerError> {
        let mut out = Vec::new();
        for id in self.store.list_instance_ids(goal_id).await? {
            if let Some(instance) = self.store.load_instance(&id).await? {
                out.push(instance);
            }
        }
        out.sort_by_key(|i| i.created_at);
        Ok(out)
    }

    /// One pass of the main loop (§4.6): reap finished executor tasks,
    /// then spawn one per due instance up to the remaining concurrency
    /// budget. Returns the number of instances spawned this pass.
    pub async fn tick(self: &Arc<Self>) -> Result<usize, GoalSchedulerError> {
        let mut tasks = self.tasks.lock().await;
        while tasks.try_join_next().is_some() {}

        let capacity = self.config.max_concurrent_goals.saturating_sub(tasks.len());
        if capacity == 0 {
            return Ok(0);
        }
        let due = self.store.due_instances(self.now(), capacity).await?;
        for instance_id in &due {
            let scheduler = self.clone();
            let instance_id = instance_id.clone();
            tasks.spawn(async move {
                if let Err(error) = scheduler.execute_instance(&instance_id).await {
                    tracing::warn!(instance_id, %error, "goal instance execution failed");
                }
            });
        }
        Ok(due.len())
    }

    /// Run [`Self::tick`] every `loop_interval_sec` until cancelled.
    pub async fn run(self: &Arc<Self>) {
        let interval = Duration::from_secs(self.config.loop_interval_sec);
        loop {
            if let Err(error) = self.tick().await {
                tracing::error!(%error, "goal scheduler tick failed");
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Await in-flight executor tasks up to the configured grace. Any
    /// instance still running when the grace elapses is left in its last
    /// persisted state, safe to resume on the next `tick` (§5
    /// Cancellation and timeouts).
    pub async fn shutdown(&self) {
        let mut tasks = self.tasks.lock().await;
        let drain = async {
            while tasks.join_next().await.is_some() {}
        };
        if tokio::time::timeout(self.config.shutdown_grace, drain).await.is_err() {
            tracing::warn!("goal scheduler tasks did not drain within the shutdown grace period");
        }
    }

    /// Execute one instance end to end (§4.6 Executor for one instance).
    async fn execute_instance(&self, instance_id: &str) -> Result<(), GoalSchedulerError> {
        let mut instance = self.load_instance(instance_id).await?;
        let Some(goal) = self.goal(&instance.goal_id) else {
            instance.state = GoalState::Failed;
            instance.last_error = Some(format!("goal {:?} is no longer known", instance.goal_id));
            instance.completed_at = Some(self.now());
            self.store.save_instance(&instance).await?;
            return Ok(());
        };

        instance.state = GoalState::InProgress;
        instance.started_at = Some(self.now());
        self.store.save_instance(&instance).await?;

        let mut ctx = TemplateContext::new();
        ctx.trigger = instance
            .trigger_event
            .as_ref()
            .and_then(|event| serde_json::to_value(event).ok())
            .unwrap_or(Value::Null);

        let outcome = self.run_steps(&goal, &mut instance, &mut ctx).await;

        match outcome {
            Ok(()) => {
                instance.state = GoalState::Succeeded;
                instance.completed_at = Some(self.now());
            }
            Err(last_error) => {
                instance.last_error = Some(last_error);
                if instance.fail_count < goal.retry.attempts {
                    instance.fail_count += 1;
                    let backoff = goal.retry.backoff_sec * instance.fail_count as u64;
                    instance.next_run_ts = self.now() + chrono::Duration::seconds(backoff as i64);
                    instance.state = GoalState::Pending;
                } else {
                    instance.state = GoalState::Failed;
                    instance.completed_at = Some(self.now());
                }
            }
        }
        self.store.save_instance(&instance).await?;

        if instance.state.is_terminal() && goal.is_periodic() {
            self.schedule_next_periodic(&goal).await?;
        }
        Ok(())
    }

    /// Render and dispatch steps `current_step..len`, persisting after
    /// each one so step N+1 only ever starts once step N's result is
    /// durable (§5 Ordering guarantees, per-goal-instance).
    async fn run_steps(
        &self,
        goal: &GoalConfig,
        instance: &mut GoalInstance,
        ctx: &mut TemplateContext,
    ) -> Result<(), String> {
        for i in instance.current_step..goal.steps.len() {
            let step = &goal.steps[i];
            let rendered_params = template::render_dict(&step.params, ctx);
            let deadline = Duration::from_secs(step.timeout_sec.min(goal.timeout_sec));

            let result = match tokio::time::timeout(deadline, self.dispatch_step(step, &rendered_params, ctx)).await {
                Ok(Ok(result)) => result,
                Ok(Err(error)) => return Err(format!("step {:?} failed: {error}", step.id)),
                Err(_) => return Err(format!("step {:?} timed out after {}s", step.id, deadline.as_secs())),
            };
            if let GoalStepResult::Plugin { success: false, error, .. } = &result {
                return Err(format!(
                    "step {:?} plugin reported failure: {}",
                    step.id,
                    error.as_deref().unwrap_or("no error detail")
                ));
            }

            ctx.prev = serde_json::json!({ "result": serde_json::to_value(&result).unwrap_or(Value::Null) });
            instance.step_results.insert(step.id.clone(), result);
            instance.current_step = i + 1;
            self.store.save_instance(instance).await.map_err(|error| error.to_string())?;
        }
        Ok(())
    }

    /// Dispatch one step by its kind (§4.6 Step dispatch).
    async fn dispatch_step(
        &self,
        step: &GoalStep,
        params: &BTreeMap<String, Value>,
        ctx: &TemplateContext,
    ) -> Result<GoalStepResult, GoalSchedulerError> {
        match step.step_type {
            StepType::Plugin => {
                let plugin = step.plugin.clone().ok_or_else(|| {
                    GoalSchedulerError::Validation(core_domain::ValidationError::InvalidStep(
                        step.id.clone(),
                        "plugin step requires `plugin`".to_string(),
                    ))
                })?;
                let timeout = Duration::from_secs(step.timeout_sec);
                self.step_executor.execute_plugin(&plugin, params.clone(), timeout).await
            }
            StepType::BusEvent => {
                let topic = step.topic.clone().ok_or_else(|| {
                    GoalSchedulerError::Validation(core_domain::ValidationError::InvalidStep(
                        step.id.clone(),
                        "bus_event step requires `topic`".to_string(),
                    ))
                })?;
                let event_type = step.event_type.clone().unwrap_or_else(|| "published".to_string());
                let payload = match &step.payload_template {
                    Some(template_map) => template::render_dict(template_map, ctx),
                    None => params.clone(),
                };
                self.bus
                    .publish(&topic, &event_type, payload.clone(), EventPriority::default(), None)
                    .await?;
                Ok(GoalStepResult::Published { status: "published".to_string(), topic, event_type, payload })
            }
            StepType::Internal => Ok(GoalStepResult::Internal {
                status: "completed".to_string(),
                step_id: step.id.clone(),
                params: params.clone(),
            }),
        }
    }
}

#[async_trait]
impl<C: Clock + 'static> EventHandler for GoalScheduler<C> {
    /// Construct a PENDING instance for every enabled goal whose trigger
    /// matches `event` (§4.6 Event-triggered goals, §4.5-style filter
    /// matching).
    async fn handle(&self, event: &Event) -> Result<(), String> {
        let matches: Vec<GoalConfig> = self.index.read().matching(event).cloned().collect();
        let now = self.now();
        for goal in matches {
            let mut instance = GoalInstance::pending(goal.id.clone(), now, now);
            instance.trigger_event = Some(event.clone());
            self.store.save_instance(&instance).await.map_err(|error| error.to_string())?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "goal_scheduler_tests.rs"]
mod tests;
