// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::sim::SimulatedStepExecutor;
use super::*;
use core_domain::{EventId, EventMeta, FakeClock, Topic};
use core_storage::{FakeGoalStore, FakeSubstrate, GoalStore, SnapshotStore};
use std::fs;

const PERIODIC_ECHO_YAML: &str = r#"
id: nightly_echo
name: Nightly echo
schedule: "@every 60s"
retry:
  attempts: 2
  backoff_sec: 5
steps:
  - id: step1
    type: plugin
    plugin: echo
    params:
      message: "hello"
  - id: step2
    type: internal
    params:
      previous: "{{ prev.result.result }}"
"#;

const ALWAYS_FAILS_YAML: &str = r#"
id: flaky
name: Always fails
schedule: "@every 60s"
retry:
  attempts: 1
  backoff_sec: 5
steps:
  - id: step1
    type: plugin
    plugin: broken
"#;

const TRIGGERED_YAML: &str = r#"
id: on_job_created
name: React to job creation
triggers:
  - topic: jobs.v1
    event_type: created
steps:
  - id: notify
    type: internal
    params: {}
"#;

/// The same conversion [`GoalScheduler::now`] uses internally, so tests can
/// seed due times on the `FakeClock`'s own timeline instead of the system
/// clock's.
fn clock_now(clock: &FakeClock) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(clock.epoch_ms() as i64).unwrap_or_else(Utc::now)
}

fn bus(clock: Arc<FakeClock>) -> Arc<EventBus<FakeClock>> {
    let dir = tempfile::tempdir().unwrap();
    Arc::new(EventBus::new(Arc::new(FakeSubstrate::new()), SnapshotStore::new(dir.path()), clock, EventBusConfig::default()))
}

fn scheduler_with(
    yaml_files: &[(&str, &str)],
) -> (Arc<GoalScheduler<FakeClock>>, Arc<FakeGoalStore>, Arc<FakeClock>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in yaml_files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    let executor = Arc::new(SimulatedStepExecutor::new());
    executor.always_succeeds("echo", serde_json::Value::String("ok".to_string()));
    executor.always_fails("broken", "plugin exploded");

    let clock = Arc::new(FakeClock::new());
    let store = Arc::new(FakeGoalStore::new());
    let config = GoalSchedulerConfig { goals_dir: dir.path().to_path_buf(), ..GoalSchedulerConfig::default() };
    let scheduler =
        Arc::new(GoalScheduler::new(store.clone(), bus(clock.clone()), executor, clock.clone(), config));
    (scheduler, store, clock, dir)
}

fn sample_event(topic: &str) -> Event {
    Event {
        event_id: EventId::new(0, 0),
        schema_version: 1,
        topic: Topic::parse(topic).unwrap(),
        event_type: "created".to_string(),
        timestamp: chrono::Utc::now(),
        payload: BTreeMap::new(),
        meta: EventMeta::default(),
    }
}

#[tokio::test]
async fn periodic_goal_succeeds_and_reschedules_a_fresh_pending_instance() {
    let (scheduler, store, clock, _dir) = scheduler_with(&[("nightly.yaml", PERIODIC_ECHO_YAML)]);
    scheduler.reload().unwrap();

    // Seed a due-now instance directly; `start()`'s own seeding schedules
    // the first run a full interval out, which a `FakeClock` never reaches.
    let now = clock_now(&clock);
    let seed = GoalInstance::pending("nightly_echo".to_string(), now - chrono::Duration::seconds(1), now);
    store.save_instance(&seed).await.unwrap();

    let spawned = scheduler.tick().await.unwrap();
    assert_eq!(spawned, 1);
    scheduler.shutdown().await;

    let instances = scheduler.instances_for("nightly_echo").await.unwrap();
    assert_eq!(instances.len(), 2, "the original run plus a fresh rescheduled instance");

    let completed = instances.iter().find(|i| i.state == GoalState::Succeeded).unwrap();
    assert_eq!(completed.current_step, 2);
    let previous = match completed.step_results.get("step2").unwrap() {
        GoalStepResult::Internal { params, .. } => params.get("previous").cloned(),
        _ => None,
    };
    assert_eq!(previous, Some(serde_json::Value::String("ok".to_string())));

    let rescheduled = instances.iter().find(|i| i.state == GoalState::Pending).unwrap();
    assert!(rescheduled.next_run_ts > completed.completed_at.unwrap() - chrono::Duration::seconds(1));
}

#[tokio::test]
async fn retries_exhaust_to_failed_after_the_configured_attempts() {
    let (scheduler, store, clock, _dir) = scheduler_with(&[("flaky.yaml", ALWAYS_FAILS_YAML)]);
    scheduler.reload().unwrap();

    let now = clock_now(&clock);
    let seed = GoalInstance::pending("flaky".to_string(), now - chrono::Duration::seconds(1), now);
    store.save_instance(&seed).await.unwrap();

    // attempt 1: fail_count 0 -> 1, rescheduled PENDING.
    scheduler.tick().await.unwrap();
    scheduler.shutdown().await;
    let instances = scheduler.instances_for("flaky").await.unwrap();
    let instance = instances.into_iter().next().unwrap();
    assert_eq!(instance.state, GoalState::Pending);
    assert_eq!(instance.fail_count, 1);

    // Force it due again and run out the remaining attempt.
    let mut due_now = instance.clone();
    due_now.next_run_ts = clock_now(&clock) - chrono::Duration::seconds(1);
    store.save_instance(&due_now).await.unwrap();
    scheduler.tick().await.unwrap();
    scheduler.shutdown().await;

    let instances = scheduler.instances_for("flaky").await.unwrap();
    let final_instance = instances.into_iter().find(|i| i.instance_id == due_now.instance_id).unwrap();
    assert_eq!(final_instance.state, GoalState::Failed);
    assert_eq!(final_instance.fail_count, 1);
    assert!(final_instance.last_error.unwrap().contains("plugin exploded"));
}

#[tokio::test]
async fn event_triggered_goal_creates_a_pending_instance_carrying_the_trigger_event() {
    let (scheduler, _store, _clock, _dir) = scheduler_with(&[("triggered.yaml", TRIGGERED_YAML)]);
    scheduler.start().await.unwrap();

    let event = sample_event("jobs.v1");
    scheduler.handle(&event).await.unwrap();

    let instances = scheduler.instances_for("on_job_created").await.unwrap();
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].state, GoalState::Pending);
    assert_eq!(instances[0].trigger_event.as_ref().unwrap().event_id, event.event_id);
}

#[tokio::test]
async fn pause_then_resume_round_trips_through_the_due_time_queue() {
    let (scheduler, _store, _clock, _dir) = scheduler_with(&[("nightly.yaml", PERIODIC_ECHO_YAML)]);
    scheduler.start().await.unwrap();

    let instances = scheduler.instances_for("nightly_echo").await.unwrap();
    let instance_id = instances[0].instance_id.clone();

    scheduler.pause_instance(&instance_id).await.unwrap();
    let paused = scheduler.instance(&instance_id).await.unwrap();
    assert_eq!(paused.state, GoalState::Paused);
    assert_eq!(scheduler.tick().await.unwrap(), 0, "a paused instance is not dispatched");

    scheduler.resume_instance(&instance_id).await.unwrap();
    let resumed = scheduler.instance(&instance_id).await.unwrap();
    assert_eq!(resumed.state, GoalState::Pending);
    assert_eq!(scheduler.tick().await.unwrap(), 1, "resuming re-enters the due-time queue");
    scheduler.shutdown().await;
}

#[tokio::test]
async fn manual_run_carries_supplied_params_as_the_trigger_event() {
    let (scheduler, _store, _clock, _dir) = scheduler_with(&[("nightly.yaml", PERIODIC_ECHO_YAML)]);
    scheduler.reload().unwrap();

    let mut params = BTreeMap::new();
    params.insert("reason".to_string(), serde_json::Value::String("manual kickoff".to_string()));
    let instance_id = scheduler.run_goal("nightly_echo", Some(params)).await.unwrap();

    let instance = scheduler.instance(&instance_id).await.unwrap();
    let trigger = instance.trigger_event.unwrap();
    assert_eq!(trigger.payload.get("reason").and_then(|v| v.as_str()), Some("manual kickoff"));
}
