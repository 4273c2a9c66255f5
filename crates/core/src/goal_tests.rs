// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn sample_goal() -> GoalConfig {
    GoalConfig {
        id: "g1".to_string(),
        name: "Goal One".to_string(),
        schedule: Some("@every 60s".to_string()),
        triggers: vec![],
        steps: vec![GoalStep {
            id: "noop".to_string(),
            step_type: StepType::Internal,
            plugin: None,
            topic: None,
            event_type: None,
            payload_template: None,
            params: BTreeMap::new(),
            timeout_sec: 30,
        }],
        retry: RetryPolicy::default(),
        timeout_sec: 300,
        enabled: true,
    }
}

#[test]
fn goal_without_schedule_or_triggers_is_rejected() {
    let mut goal = sample_goal();
    goal.schedule = None;
    assert!(goal.validate().is_err());
}

#[test]
fn goal_with_only_triggers_is_accepted() {
    let mut goal = sample_goal();
    goal.schedule = None;
    goal.triggers.push(GoalTrigger {
        topic: "chat.v1".to_string(),
        event_type: None,
        filter: None,
    });
    assert!(goal.validate().is_ok());
}

#[test]
fn plugin_step_without_plugin_name_is_rejected() {
    let mut goal = sample_goal();
    goal.steps[0].step_type = StepType::Plugin;
    assert!(goal.validate().is_err());
    goal.steps[0].plugin = Some("echo".to_string());
    assert!(goal.validate().is_ok());
}

#[test]
fn bus_event_step_without_topic_is_rejected() {
    let mut goal = sample_goal();
    goal.steps[0].step_type = StepType::BusEvent;
    assert!(goal.validate().is_err());
}

#[test]
fn instance_id_embeds_goal_id_and_unix_timestamp() {
    let now = Utc::now();
    let id = GoalInstance::new_id("g1", now);
    let parts: Vec<&str> = id.rsplitn(3, '_').collect();
    assert_eq!(parts[2], "g1");
    assert_eq!(parts[1], now.timestamp().to_string());
    assert_eq!(parts[0].len(), 8);
}

#[test]
fn terminal_states_are_succeeded_and_failed_only() {
    assert!(GoalState::Succeeded.is_terminal());
    assert!(GoalState::Failed.is_terminal());
    assert!(!GoalState::Pending.is_terminal());
    assert!(!GoalState::InProgress.is_terminal());
    assert!(!GoalState::Paused.is_terminal());
}
