// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plugin descriptors and the health state the Circuit Breaker persists
//! for each one.

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};

/// One `{topic, event_type?, filter?}` trigger clause (§4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginTrigger {
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<BTreeMap<String, Value>>,
}

impl PluginTrigger {
    /// A plugin matches an event if the topic matches, the event_type is
    /// absent or equal, and every filter field equals the corresponding
    /// payload field (§4.5).
    pub fn matches(&self, topic: &str, event_type: &str, payload: &BTreeMap<String, Value>) -> bool {
        if self.topic != topic {
            return false;
        }
        if let Some(et) = &self.event_type {
            if et != event_type {
                return false;
            }
        }
        if let Some(filter) = &self.filter {
            return filter.iter().all(|(k, v)| payload.get(k) == Some(v));
        }
        true
    }
}

/// CPU/memory resource request, Kubernetes-style units (§4.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginResources {
    /// e.g. `"500m"` (millicores) or `"1"` (whole core).
    #[serde(default = "default_cpu")]
    pub cpu: String,
    /// e.g. `"256Mi"`, `"1Gi"`.
    #[serde(default = "default_memory")]
    pub memory: String,
}

fn default_cpu() -> String {
    "500m".to_string()
}

fn default_memory() -> String {
    "256Mi".to_string()
}

impl Default for PluginResources {
    fn default() -> Self {
        Self {
            cpu: default_cpu(),
            memory: default_memory(),
        }
    }
}

/// Filesystem and execution permissions granted to a plugin's sandbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PluginFsPermissions {
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
}

impl PluginFsPermissions {
    /// `deny` takes precedence over `allow`; default is deny (§3).
    pub fn is_path_allowed(&self, path: &str) -> bool {
        if self.deny.iter().any(|d| path.starts_with(d.as_str())) {
            return false;
        }
        self.allow.iter().any(|a| path.starts_with(a.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PluginPermissions {
    #[serde(default)]
    pub fs: PluginFsPermissions,
    #[serde(default)]
    pub network: bool,
    #[serde(default)]
    pub commands: Vec<String>,
}

/// A per-plugin descriptor loaded from disk (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginConfig {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub triggers: Vec<PluginTrigger>,
    pub entrypoint: String,
    pub image: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub resources: PluginResources,
    #[serde(default)]
    pub permissions: PluginPermissions,
    #[serde(default = "default_timeout_sec")]
    pub timeout_sec: u64,
}

fn default_timeout_sec() -> u64 {
    30
}

#[allow(clippy::expect_used)]
fn name_pattern() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^[a-z][a-z0-9_-]*$").expect("static pattern is valid"))
}

#[allow(clippy::expect_used)]
fn version_pattern() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r"^\d+\.\d+\.\d+(-\w+)?$").expect("static pattern is valid")
    })
}

impl PluginConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !name_pattern().is_match(&self.name) {
            return Err(ValidationError::InvalidPluginName(self.name.clone()));
        }
        if !version_pattern().is_match(&self.version) {
            return Err(ValidationError::InvalidPluginVersion(self.version.clone()));
        }
        Ok(())
    }

    /// The tagged image used once a per-plugin build has run (§4.2).
    pub fn built_image_tag(&self) -> String {
        format!("core-plugin-{}:{}", self.name, self.version)
    }
}

/// Circuit Breaker state (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BreakerState {
    Active,
    Disabled,
    Paused,
}

crate::simple_display! {
    BreakerState {
        Active => "ACTIVE",
        Disabled => "DISABLED",
        Paused => "PAUSED",
    }
}

/// Default breaker tuning (§4.3).
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_RESET_TIMEOUT_SECS: i64 = 300;
pub const DEFAULT_FAILURE_HISTORY: usize = 10;

/// Persisted per-plugin health record (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginHealth {
    pub state: BreakerState,
    #[serde(default)]
    pub consecutive_failures: u32,
    #[serde(default)]
    pub total_failures: u64,
    #[serde(default)]
    pub total_executions: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_success: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_failure: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub failure_reasons: VecDeque<String>,
}

impl PluginHealth {
    pub fn new_active() -> Self {
        Self {
            state: BreakerState::Active,
            consecutive_failures: 0,
            total_failures: 0,
            total_executions: 0,
            last_success: None,
            last_failure: None,
            disabled_until: None,
            failure_reasons: VecDeque::new(),
        }
    }

    /// Push a failure reason, evicting the oldest once `max_history` is
    /// exceeded (§4.3, bounded ring of ≤ N recent errors).
    pub fn push_failure_reason(&mut self, reason: String, max_history: usize) {
        self.failure_reasons.push_back(reason);
        while self.failure_reasons.len() > max_history {
            self.failure_reasons.pop_front();
        }
    }

    /// Last ≤5 reasons, newest last, for HTTP detail responses (§6.1).
    pub fn recent_failure_reasons(&self, limit: usize) -> Vec<String> {
        self.failure_reasons
            .iter()
            .rev()
            .take(limit)
            .rev()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[path = "plugin_tests.rs"]
mod tests;
