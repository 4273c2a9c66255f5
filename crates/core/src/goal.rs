// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Goal descriptors and the runtime instances the Goal Scheduler drives
//! through them.

use crate::error::ValidationError;
use crate::event::Event;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One step's declared kind (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Plugin,
    BusEvent,
    Internal,
}

crate::simple_display! {
    StepType {
        Plugin => "plugin",
        BusEvent => "bus_event",
        Internal => "internal",
    }
}

/// One step inside a [`GoalConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalStep {
    pub id: String,
    #[serde(rename = "type")]
    pub step_type: StepType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_template: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
    #[serde(default = "default_step_timeout")]
    pub timeout_sec: u64,
}

fn default_step_timeout() -> u64 {
    30
}

impl GoalStep {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.step_type {
            StepType::Plugin if self.plugin.is_none() => Err(ValidationError::InvalidStep(
                self.id.clone(),
                "plugin step requires `plugin`".to_string(),
            )),
            StepType::BusEvent if self.topic.is_none() => Err(ValidationError::InvalidStep(
                self.id.clone(),
                "bus_event step requires `topic`".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Retry policy on goal-instance failure (§3, §4.6 step 6).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default = "default_backoff")]
    pub backoff_sec: u64,
}

fn default_attempts() -> u32 {
    3
}

fn default_backoff() -> u64 {
    30
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            backoff_sec: default_backoff(),
        }
    }
}

/// Event-trigger clause for event-triggered goals (§4.6, mirrors §4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalTrigger {
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<BTreeMap<String, Value>>,
}

impl GoalTrigger {
    pub fn matches(&self, event: &Event) -> bool {
        if self.topic != event.topic.as_str() {
            return false;
        }
        if let Some(et) = &self.event_type {
            if et != &event.event_type {
                return false;
            }
        }
        if let Some(filter) = &self.filter {
            return filter.iter().all(|(k, v)| event.payload.get(k) == Some(v));
        }
        true
    }
}

/// A workflow definition loaded from a YAML descriptor (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalConfig {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(default)]
    pub triggers: Vec<GoalTrigger>,
    pub steps: Vec<GoalStep>,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default = "default_goal_timeout")]
    pub timeout_sec: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_goal_timeout() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

impl GoalConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schedule.is_none() && self.triggers.is_empty() {
            return Err(ValidationError::GoalHasNoTrigger(self.id.clone()));
        }
        for step in &self.steps {
            step.validate()?;
        }
        Ok(())
    }

    pub fn is_periodic(&self) -> bool {
        self.schedule.is_some()
    }
}

/// Lifecycle state of a [`GoalInstance`] (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GoalState {
    Pending,
    InProgress,
    Succeeded,
    Failed,
    Paused,
}

crate::simple_display! {
    GoalState {
        Pending => "PENDING",
        InProgress => "IN_PROGRESS",
        Succeeded => "SUCCEEDED",
        Failed => "FAILED",
        Paused => "PAUSED",
    }
}

impl GoalState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// The result persisted for one executed step (§4.6 step 4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GoalStepResult {
    Plugin {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Published {
        status: String,
        topic: String,
        event_type: String,
        payload: BTreeMap<String, Value>,
    },
    Internal {
        status: String,
        step_id: String,
        params: BTreeMap<String, Value>,
    },
}

/// Retained for 7 days after reaching a terminal state (§3, §6.5).
pub const INSTANCE_RETENTION: chrono::Duration = chrono::Duration::days(7);

/// One scheduled/running incarnation of a [`GoalConfig`] (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalInstance {
    pub instance_id: String,
    pub goal_id: String,
    pub state: GoalState,
    #[serde(default)]
    pub current_step: usize,
    pub next_run_ts: DateTime<Utc>,
    #[serde(default)]
    pub fail_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_event: Option<Event>,
    #[serde(default)]
    pub step_results: BTreeMap<String, GoalStepResult>,
}

impl GoalInstance {
    /// `<goal_id>_<unix_ts>_<random8>`, matching the original implementation's
    /// instance id scheme (§3).
    pub fn new_id(goal_id: &str, now: DateTime<Utc>) -> String {
        let suffix = &uuid::Uuid::new_v4().simple().to_string()[..8];
        format!("{goal_id}_{}_{suffix}", now.timestamp())
    }

    pub fn pending(goal_id: String, next_run_ts: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let instance_id = Self::new_id(&goal_id, now);
        Self {
            instance_id,
            goal_id,
            state: GoalState::Pending,
            current_step: 0,
            next_run_ts,
            fail_count: 0,
            last_error: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            trigger_event: None,
            step_results: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
#[path = "goal_tests.rs"]
mod tests;
