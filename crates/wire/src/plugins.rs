// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plugin Manager admin surface bodies (§6.1).

use core_domain::{BreakerState, PluginConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One row of `GET /plugins`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginSummary {
    pub name: String,
    pub version: String,
    pub state: BreakerState,
    pub consecutive_failures: u32,
    pub total_executions: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginListResponse {
    pub plugins: Vec<PluginSummary>,
    pub total: usize,
}

/// `GET /plugins/{name}` — config plus health detail, last ≤ 5 failure
/// reasons (§6.1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginDetailResponse {
    pub config: PluginConfig,
    pub state: BreakerState,
    pub consecutive_failures: u32,
    pub total_failures: u64,
    pub total_executions: u64,
    pub disabled_until: Option<chrono::DateTime<chrono::Utc>>,
    pub recent_failure_reasons: Vec<String>,
}

/// `POST /plugins/{name}/execute` body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginExecuteRequest {
    pub plugin: String,
    #[serde(default)]
    pub event_data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginExecuteResponse {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `POST /plugins/{name}/pause` body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginPauseRequest {
    pub minutes: u64,
}
