// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::breaker::{BreakerConfig, NullAlertSink};
use crate::event_bus::EventBusConfig;
use core_adapters::FakeSandbox;
use core_domain::{EventPriority, FakeClock, StreamConfig, Topic};
use core_storage::{FakeBreakerStore, FakeSubstrate, SnapshotStore};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::time::Duration as StdDuration;

fn write_plugin(dir: &std::path::Path, name: &str, topic: &str) {
    let yaml = format!(
        "name: {name}\nversion: \"1.0.0\"\ntriggers:\n  - topic: {topic}\n    event_type: message\nentrypoint: main.py\nimage: base:latest\n"
    );
    fs::write(dir.join(format!("{name}.yaml")), yaml).unwrap();
}

fn manager(
    plugins_dir: std::path::PathBuf,
    queue_size: usize,
) -> (Arc<PluginManager<FakeClock>>, Arc<FakeSandbox>, Arc<FakeClock>) {
    let clock = Arc::new(FakeClock::new());
    let breaker = Arc::new(CircuitBreaker::new(
        Arc::new(FakeBreakerStore::new()),
        Arc::new(NullAlertSink),
        clock.clone(),
        BreakerConfig::default(),
    ));
    let sandbox = FakeSandbox::wrapped();
    let watchdog = Arc::new(ContainerWatchdog::new("docker-not-installed", 3600));
    let config = PluginManagerConfig { plugins_dir, worker_pool_size: 2, task_queue_size: queue_size, ..Default::default() };
    (Arc::new(PluginManager::new(breaker, sandbox.clone(), watchdog, config)), sandbox, clock)
}

fn bus() -> EventBus<FakeClock> {
    let mut streams = HashMap::new();
    streams.insert("chat.v1".to_string(), StreamConfig::new(Topic::parse("chat.v1").unwrap(), 1_000, 1_000, 3));
    let config = EventBusConfig { streams, ..EventBusConfig::default() };
    let dir = tempfile::tempdir().unwrap();
    EventBus::new(Arc::new(FakeSubstrate::new()), SnapshotStore::new(dir.path()), Arc::new(FakeClock::new()), config)
}

fn sample_event(topic: &str, event_type: &str) -> Event {
    Event {
        event_id: core_domain::EventId::new(1, 0),
        schema_version: 1,
        topic: Topic::parse(topic).unwrap(),
        event_type: event_type.to_string(),
        timestamp: chrono::Utc::now(),
        payload: BTreeMap::new(),
        meta: core_domain::EventMeta::default(),
    }
}

#[tokio::test]
async fn matching_dispatch_runs_the_sandbox_and_records_success() {
    let dir = tempfile::tempdir().unwrap();
    write_plugin(dir.path(), "echo", "chat.v1");
    let (manager, sandbox, _clock) = manager(dir.path().to_path_buf(), 10);
    manager.loader.write().reload().unwrap();
    manager.breaker.discover(&["echo".to_string()]).await.unwrap();
    manager.spawn_workers();

    let event = sample_event("chat.v1", "message");
    manager.handle(&event).await.unwrap();

    tokio::time::sleep(StdDuration::from_millis(50)).await;
    assert_eq!(sandbox.invocations().len(), 1);
    assert!(manager.breaker.is_healthy("echo").await.unwrap());
}

#[tokio::test]
async fn non_matching_event_dispatches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_plugin(dir.path(), "echo", "chat.v1");
    let (manager, sandbox, _clock) = manager(dir.path().to_path_buf(), 10);
    manager.loader.write().reload().unwrap();
    manager.spawn_workers();

    let event = sample_event("chat.v1", "other_type");
    manager.handle(&event).await.unwrap();

    tokio::time::sleep(StdDuration::from_millis(20)).await;
    assert!(sandbox.invocations().is_empty());
}

#[tokio::test]
async fn a_disabled_plugin_is_never_invoked() {
    let dir = tempfile::tempdir().unwrap();
    write_plugin(dir.path(), "echo", "chat.v1");
    let (manager, sandbox, _clock) = manager(dir.path().to_path_buf(), 10);
    manager.loader.write().reload().unwrap();
    manager.breaker.pause("echo", 10).await.unwrap();
    manager.spawn_workers();

    let event = sample_event("chat.v1", "message");
    manager.handle(&event).await.unwrap();

    tokio::time::sleep(StdDuration::from_millis(50)).await;
    assert!(sandbox.invocations().is_empty());
}

#[tokio::test]
async fn a_full_queue_drops_the_dispatch_and_fails_the_handler() {
    let dir = tempfile::tempdir().unwrap();
    write_plugin(dir.path(), "echo", "chat.v1");
    // No workers started: the queue never drains.
    let (manager, _sandbox, _clock) = manager(dir.path().to_path_buf(), 1);
    manager.loader.write().reload().unwrap();

    let event = sample_event("chat.v1", "message");
    manager.handle(&event).await.unwrap();
    let result = manager.handle(&event).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn hot_reload_picks_up_newly_added_plugins() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, _sandbox, _clock) = manager(dir.path().to_path_buf(), 10);
    manager.loader.write().reload().unwrap();
    assert!(manager.plugin_names().is_empty());

    write_plugin(dir.path(), "echo", "chat.v1");
    let b = bus();
    manager.reload(&b).unwrap();
    assert_eq!(manager.plugin_names(), vec!["echo".to_string()]);
}

#[tokio::test]
async fn start_subscribes_the_bus_and_dispatches_through_process_one_batch() {
    let dir = tempfile::tempdir().unwrap();
    write_plugin(dir.path(), "echo", "chat.v1");
    let (manager, sandbox, _clock) = manager(dir.path().to_path_buf(), 10);
    let b = bus();
    manager.start(&b).await.unwrap();

    b.publish("chat.v1", "message", BTreeMap::new(), EventPriority::Medium, None).await.unwrap();
    b.process_one_batch("chat.v1").await.unwrap();

    tokio::time::sleep(StdDuration::from_millis(50)).await;
    assert_eq!(sandbox.invocations().len(), 1);
}

#[tokio::test]
async fn trigger_bypasses_the_queue_and_is_breaker_gated() {
    let dir = tempfile::tempdir().unwrap();
    write_plugin(dir.path(), "echo", "chat.v1");
    let (manager, sandbox, _clock) = manager(dir.path().to_path_buf(), 10);
    manager.loader.write().reload().unwrap();

    let result = manager.trigger("echo", serde_json::json!({"hello": "world"})).await.unwrap();
    assert!(result.success);
    assert_eq!(sandbox.invocations().len(), 1);

    let missing = manager.trigger("nope", serde_json::json!({})).await;
    assert!(matches!(missing, Err(PluginManagerError::NotFound(_))));

    manager.breaker.pause("echo", 10).await.unwrap();
    let disabled = manager.trigger("echo", serde_json::json!({})).await;
    assert!(matches!(disabled, Err(PluginManagerError::Disabled(_))));
}

#[tokio::test]
async fn reset_and_pause_delegate_to_the_breaker() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, _sandbox, _clock) = manager(dir.path().to_path_buf(), 10);

    manager.pause("echo", 5).await.unwrap();
    assert!(!manager.breaker.is_healthy("echo").await.unwrap());

    manager.reset("echo").await.unwrap();
    assert!(manager.breaker.is_healthy("echo").await.unwrap());
}
