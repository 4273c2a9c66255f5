// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `RuntimeConfig` (§4.8): three layers, lowest precedence first —
//! compiled-in defaults, an optional YAML file (`CORE_CONFIG` or
//! `--config`), then `CORE_`-prefixed environment variables. Each
//! subsystem constructor below receives only the narrow slice of this
//! struct it needs; nothing reads `RuntimeConfig` itself at call sites
//! outside `main`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use core_adapters::SandboxConfig;
use core_domain::{StreamConfig, Topic};
use core_engine::event_bus::{EventBusConfig, PriorityWeights};
use core_engine::{BreakerConfig, GoalSchedulerConfig, PluginManagerConfig};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, #[source] source: std::io::Error },
    #[error("failed to parse config file {path} as YAML: {source}")]
    Parse { path: PathBuf, #[source] source: serde_yaml::Error },
    #[error("{0}")]
    Env(String),
}

/// One `streams[]` entry in YAML, promoted to a [`StreamConfig`] once its
/// topic name is validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StreamEntry {
    name: String,
    maxlen: u64,
    rate_limit: u32,
    retry_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct RawPriorityWeights {
    high: u8,
    medium: u8,
    low: u8,
}

impl Default for RawPriorityWeights {
    fn default() -> Self {
        let defaults = PriorityWeights::default();
        Self { high: defaults.high, medium: defaults.medium, low: defaults.low }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct RawBusConfig {
    substrate_url: String,
    streams: Vec<StreamEntry>,
    consumer_group: String,
    batch_size: usize,
    block_timeout_ms: u64,
    dead_letter_stream: String,
    max_global_rate: u32,
    priority_weights: RawPriorityWeights,
}

impl Default for RawBusConfig {
    fn default() -> Self {
        let defaults = EventBusConfig::default();
        Self {
            substrate_url: "redis://127.0.0.1:6379".to_string(),
            streams: Vec::new(),
            consumer_group: defaults.consumer_group,
            batch_size: defaults.batch_size,
            block_timeout_ms: defaults.block_timeout_ms,
            dead_letter_stream: defaults.dead_letter_stream,
            max_global_rate: defaults.max_global_rate,
            priority_weights: RawPriorityWeights::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct RawSandboxConfig {
    runtime: String,
    default_cpu: String,
    default_memory: String,
    timeout_sec: u64,
    tmp_size: String,
    work_dir: String,
    drop_capabilities: Vec<String>,
    read_only: bool,
    no_new_privileges: bool,
    network_mode: String,
}

impl Default for RawSandboxConfig {
    fn default() -> Self {
        let defaults = SandboxConfig::default();
        Self {
            runtime: defaults.runtime,
            default_cpu: "500m".to_string(),
            default_memory: "256Mi".to_string(),
            timeout_sec: 30,
            tmp_size: defaults.tmp_size,
            work_dir: defaults.work_dir,
            drop_capabilities: defaults.drop_capabilities,
            read_only: defaults.read_only,
            no_new_privileges: defaults.no_new_privileges,
            network_mode: defaults.network_mode,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct RawPluginManagerConfig {
    plugins_dir: PathBuf,
    max_concurrent_plugins: usize,
    task_queue_size: usize,
}

impl Default for RawPluginManagerConfig {
    fn default() -> Self {
        let defaults = PluginManagerConfig::default();
        Self {
            plugins_dir: defaults.plugins_dir,
            max_concurrent_plugins: defaults.worker_pool_size,
            task_queue_size: defaults.task_queue_size,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct RawGoalSchedulerConfig {
    goals_dir: PathBuf,
    loop_interval_sec: u64,
    default_timeout_sec: u64,
    max_concurrent_goals: usize,
}

impl Default for RawGoalSchedulerConfig {
    fn default() -> Self {
        let defaults = GoalSchedulerConfig::default();
        Self {
            goals_dir: defaults.goals_dir,
            loop_interval_sec: defaults.loop_interval_sec,
            default_timeout_sec: defaults.default_timeout_sec,
            max_concurrent_goals: defaults.max_concurrent_goals,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct RawHttpConfig {
    plugin_manager_addr: String,
    goal_scheduler_addr: String,
}

impl Default for RawHttpConfig {
    fn default() -> Self {
        Self {
            plugin_manager_addr: "0.0.0.0:8081".to_string(),
            goal_scheduler_addr: "0.0.0.0:8082".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct RawLogConfig {
    level: String,
    format: String,
}

impl Default for RawLogConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct RawConfig {
    bus: RawBusConfig,
    sandbox: RawSandboxConfig,
    plugin_manager: RawPluginManagerConfig,
    goal_scheduler: RawGoalSchedulerConfig,
    http: RawHttpConfig,
    log: RawLogConfig,
    snapshot_root: PathBuf,
    /// Shared admin bearer token; empty disables auth (local dev only).
    auth_token: String,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            bus: RawBusConfig::default(),
            sandbox: RawSandboxConfig::default(),
            plugin_manager: RawPluginManagerConfig::default(),
            goal_scheduler: RawGoalSchedulerConfig::default(),
            http: RawHttpConfig::default(),
            log: RawLogConfig::default(),
            snapshot_root: PathBuf::from("snapshots"),
            auth_token: String::new(),
        }
    }
}

/// The fully assembled, subsystem-sliceable configuration (§4.8, §6.6).
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub substrate_url: String,
    pub bus: EventBusConfig,
    pub sandbox: SandboxConfig,
    pub default_plugin_cpu: String,
    pub default_plugin_memory: String,
    pub default_plugin_timeout_sec: u64,
    pub plugin_manager: PluginManagerConfig,
    pub goal_scheduler: GoalSchedulerConfig,
    pub breaker: BreakerConfig,
    pub http_plugin_manager_addr: String,
    pub http_goal_scheduler_addr: String,
    pub log_level: String,
    pub log_format: String,
    pub snapshot_root: PathBuf,
    pub auth_token: Option<String>,
}

/// Load the three layers, in precedence order (§4.8).
pub fn load(config_path: Option<PathBuf>) -> Result<RuntimeConfig, ConfigError> {
    let mut raw = RawConfig::default();

    let path = config_path.or_else(|| std::env::var("CORE_CONFIG").ok().map(PathBuf::from));
    if let Some(path) = path {
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read { path: path.clone(), source })?;
        raw = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse { path, source })?;
    }

    apply_env_overlay(&mut raw)?;
    assemble(raw)
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(format!("CORE_{key}")).ok()
}

fn apply_env_overlay(raw: &mut RawConfig) -> Result<(), ConfigError> {
    if let Some(v) = env_var("REDIS_URL") {
        raw.bus.substrate_url = v;
    }
    if let Some(v) = env_var("CONSUMER_GROUP") {
        raw.bus.consumer_group = v;
    }
    if let Some(v) = env_var("MAX_GLOBAL_RATE") {
        raw.bus.max_global_rate = parse_env_u32("MAX_GLOBAL_RATE", &v)?;
    }
    if let Some(v) = env_var("DEAD_LETTER_STREAM") {
        raw.bus.dead_letter_stream = v;
    }
    if let Some(v) = env_var("SANDBOX_RUNTIME") {
        raw.sandbox.runtime = v;
    }
    if let Some(v) = env_var("SANDBOX_NETWORK_MODE") {
        raw.sandbox.network_mode = v;
    }
    if let Some(v) = env_var("PLUGINS_DIR") {
        raw.plugin_manager.plugins_dir = PathBuf::from(v);
    }
    if let Some(v) = env_var("TASK_QUEUE_SIZE") {
        raw.plugin_manager.task_queue_size = parse_env_usize("TASK_QUEUE_SIZE", &v)?;
    }
    if let Some(v) = env_var("MAX_CONCURRENT_PLUGINS") {
        raw.plugin_manager.max_concurrent_plugins = parse_env_usize("MAX_CONCURRENT_PLUGINS", &v)?;
    }
    if let Some(v) = env_var("GOALS_DIR") {
        raw.goal_scheduler.goals_dir = PathBuf::from(v);
    }
    if let Some(v) = env_var("LOOP_INTERVAL_SEC") {
        raw.goal_scheduler.loop_interval_sec = parse_env_u64("LOOP_INTERVAL_SEC", &v)?;
    }
    if let Some(v) = env_var("MAX_CONCURRENT_GOALS") {
        raw.goal_scheduler.max_concurrent_goals = parse_env_usize("MAX_CONCURRENT_GOALS", &v)?;
    }
    if let Some(v) = env_var("HTTP_PLUGIN_MANAGER_ADDR") {
        raw.http.plugin_manager_addr = v;
    }
    if let Some(v) = env_var("HTTP_GOAL_SCHEDULER_ADDR") {
        raw.http.goal_scheduler_addr = v;
    }
    if let Some(v) = env_var("LOG_LEVEL") {
        raw.log.level = v;
    }
    if let Some(v) = env_var("LOG_FORMAT") {
        raw.log.format = v;
    }
    if let Some(v) = env_var("SNAPSHOT_ROOT") {
        raw.snapshot_root = PathBuf::from(v);
    }
    if let Some(v) = env_var("AUTH_TOKEN") {
        raw.auth_token = v;
    }
    Ok(())
}

fn parse_env_u32(key: &str, v: &str) -> Result<u32, ConfigError> {
    v.parse().map_err(|_| ConfigError::Env(format!("CORE_{key} must be an integer, got {v:?}")))
}

fn parse_env_u64(key: &str, v: &str) -> Result<u64, ConfigError> {
    v.parse().map_err(|_| ConfigError::Env(format!("CORE_{key} must be an integer, got {v:?}")))
}

fn parse_env_usize(key: &str, v: &str) -> Result<usize, ConfigError> {
    v.parse().map_err(|_| ConfigError::Env(format!("CORE_{key} must be an integer, got {v:?}")))
}

fn assemble(raw: RawConfig) -> Result<RuntimeConfig, ConfigError> {
    let mut streams: HashMap<String, StreamConfig> = HashMap::new();
    for entry in raw.bus.streams {
        let topic = Topic::parse(&entry.name)
            .map_err(|e| ConfigError::Env(format!("invalid stream name {:?}: {e}", entry.name)))?;
        streams.insert(entry.name, StreamConfig::new(topic, entry.maxlen, entry.rate_limit, entry.retry_limit));
    }
    for default_topic in [
        core_domain::event::reserved::SYSTEM_V1,
        core_domain::event::reserved::CHAT_V1,
        core_domain::event::reserved::FS_V1,
        core_domain::event::reserved::MEMORY_V1,
        core_domain::event::reserved::PLUGIN_V1,
    ] {
        streams.entry(default_topic.to_string()).or_insert_with(|| {
            StreamConfig::new(Topic::new_unchecked(default_topic), 10_000, 100, 3)
        });
    }
    streams.entry(raw.bus.dead_letter_stream.clone()).or_insert_with(|| {
        StreamConfig::new(Topic::new_unchecked(raw.bus.dead_letter_stream.clone()), 100_000, 1_000, 0)
    });

    let bus = EventBusConfig {
        streams,
        consumer_group: raw.bus.consumer_group,
        consumer_name: format!("consumer-{}", std::process::id()),
        batch_size: raw.bus.batch_size,
        block_timeout_ms: raw.bus.block_timeout_ms,
        dead_letter_stream: raw.bus.dead_letter_stream,
        max_global_rate: raw.bus.max_global_rate,
        priority_weights: PriorityWeights {
            high: raw.bus.priority_weights.high,
            medium: raw.bus.priority_weights.medium,
            low: raw.bus.priority_weights.low,
        },
    };

    let sandbox = SandboxConfig {
        runtime: raw.sandbox.runtime,
        network_mode: raw.sandbox.network_mode,
        read_only: raw.sandbox.read_only,
        tmp_size: raw.sandbox.tmp_size,
        work_dir: raw.sandbox.work_dir,
        drop_capabilities: raw.sandbox.drop_capabilities,
        no_new_privileges: raw.sandbox.no_new_privileges,
    };

    let plugin_manager = PluginManagerConfig {
        plugins_dir: raw.plugin_manager.plugins_dir,
        worker_pool_size: raw.plugin_manager.max_concurrent_plugins,
        task_queue_size: raw.plugin_manager.task_queue_size,
        shutdown_grace: Duration::from_secs(30),
    };

    let goal_scheduler = GoalSchedulerConfig {
        goals_dir: raw.goal_scheduler.goals_dir,
        loop_interval_sec: raw.goal_scheduler.loop_interval_sec,
        default_timeout_sec: raw.goal_scheduler.default_timeout_sec,
        max_concurrent_goals: raw.goal_scheduler.max_concurrent_goals,
        shutdown_grace: Duration::from_secs(30),
    };

    Ok(RuntimeConfig {
        substrate_url: raw.bus.substrate_url,
        bus,
        sandbox,
        default_plugin_cpu: raw.sandbox.default_cpu,
        default_plugin_memory: raw.sandbox.default_memory,
        default_plugin_timeout_sec: raw.sandbox.timeout_sec,
        plugin_manager,
        goal_scheduler,
        breaker: BreakerConfig::default(),
        http_plugin_manager_addr: raw.http.plugin_manager_addr,
        http_goal_scheduler_addr: raw.http.goal_scheduler_addr,
        log_level: raw.log.level,
        log_format: raw.log.format,
        snapshot_root: raw.snapshot_root,
        auth_token: Some(raw.auth_token).filter(|s| !s.is_empty()),
    })
}
