// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Goal Scheduler admin surface bodies (§6.1).

use chrono::{DateTime, Utc};
use core_domain::{GoalConfig, GoalState};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoalSummary {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub is_periodic: bool,
    pub schedule: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoalListResponse {
    pub goals: Vec<GoalSummary>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceSummary {
    pub instance_id: String,
    pub state: GoalState,
    pub current_step: usize,
    pub next_run_ts: DateTime<Utc>,
    pub fail_count: u32,
    pub last_error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// `GET /goals/{id}` — config plus last ≤ 10 instances and the next due
/// time if periodic (§6.1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoalDetailResponse {
    pub config: GoalConfig,
    pub instances: Vec<InstanceSummary>,
    pub next_run: Option<DateTime<Utc>>,
}

/// `POST /goals/run` body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoalRunRequest {
    pub goal_id: String,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoalRunResponse {
    pub instance_id: String,
}
