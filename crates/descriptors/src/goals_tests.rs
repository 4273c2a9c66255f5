// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use core_domain::{EventId, EventMeta, Topic};
use std::fs;

const PERIODIC_YAML: &str = r#"
id: nightly_cleanup
name: Nightly cleanup
schedule: "@every 86400s"
steps:
  - id: run
    type: plugin
    plugin: echo
"#;

const TRIGGERED_YAML: &str = r#"
id: on_job_created
name: React to job creation
triggers:
  - topic: jobs.v1
    event_type: created
steps:
  - id: notify
    type: bus_event
    topic: notifications
"#;

const NO_TRIGGER_YAML: &str = r#"
id: broken
name: Missing both schedule and triggers
steps:
  - id: run
    type: plugin
    plugin: echo
"#;

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

#[test]
fn load_indexes_goals_found_in_nested_subdirectories() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("nested");
    fs::create_dir(&nested).unwrap();
    fs::write(nested.join("nightly.yaml"), PERIODIC_YAML).unwrap();

    let index = GoalLoader::new(dir.path()).load().unwrap();

    assert_eq!(index.len(), 1);
    assert!(index.get("nightly_cleanup").is_some());
}

#[test]
fn load_rejects_a_goal_without_schedule_or_triggers() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("broken.yaml"), NO_TRIGGER_YAML).unwrap();

    let err = GoalLoader::new(dir.path()).load().unwrap_err();
    assert!(matches!(err, DescriptorError::Validation(_)));
}

#[test]
fn periodic_returns_only_enabled_schedule_driven_goals() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("nightly.yaml"), PERIODIC_YAML).unwrap();
    fs::write(dir.path().join("triggered.yaml"), TRIGGERED_YAML).unwrap();

    let index = GoalLoader::new(dir.path()).load().unwrap();
    let periodic: Vec<_> = index.periodic().collect();

    assert_eq!(periodic.len(), 1);
    assert_eq!(periodic[0].id, "nightly_cleanup");
}

#[test]
fn matching_finds_goals_whose_triggers_match_the_event() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("triggered.yaml"), TRIGGERED_YAML).unwrap();

    let index = GoalLoader::new(dir.path()).load().unwrap();
    let event = sample_event("jobs.v1");

    let hits: Vec<_> = index.matching(&event).collect();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "on_job_created");

    let miss_event = sample_event("other.v1");
    assert_eq!(index.matching(&miss_event).count(), 0);
}
