// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process `Sandbox` double (`test-support`): lets Plugin Manager and
//! Goal Scheduler tests run without a container runtime available.

use crate::sandbox::{PluginResult, PluginTask, Sandbox};
use async_trait::async_trait;
use core_domain::PluginConfig;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

/// Canned outcomes, consumed in FIFO order; once exhausted, every
/// invocation succeeds with an empty result.
#[derive(Default)]
pub struct FakeSandbox {
    scripted: Mutex<VecDeque<PluginResult>>,
    invocations: Mutex<Vec<(String, String)>>,
}

impl FakeSandbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wrapped() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Queue the next `execute` call's result.
    pub fn push_result(&self, result: PluginResult) {
        self.scripted.lock().push_back(result);
    }

    /// `(plugin_name, event_id)` pairs for every call made so far.
    pub fn invocations(&self) -> Vec<(String, String)> {
        self.invocations.lock().clone()
    }
}

#[async_trait]
impl Sandbox for FakeSandbox {
    async fn execute(
        &self,
        plugin: &PluginConfig,
        _plugin_dir: &Path,
        task: &PluginTask,
    ) -> PluginResult {
        self.invocations
            .lock()
            .push((plugin.name.clone(), task.event_id.clone()));
        self.scripted.lock().pop_front().unwrap_or(PluginResult {
            plugin_name: plugin.name.clone(),
            event_id: task.event_id.clone(),
            success: true,
            stdout: None,
            stderr: None,
            exit_code: 0,
            duration_ms: 0.0,
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_scripted_results_in_order() {
        let sandbox = FakeSandbox::new();
        sandbox.push_result(PluginResult {
            plugin_name: "echo".to_string(),
            event_id: "1".to_string(),
            success: false,
            stdout: None,
            stderr: None,
            exit_code: 1,
            duration_ms: 0.0,
            error: Some("boom".to_string()),
        });

        let plugin = PluginConfig {
            name: "echo".to_string(),
            version: "1.0.0".to_string(),
            triggers: vec![],
            entrypoint: "main.py".to_string(),
            image: "core-plugin-base:latest".to_string(),
            requirements: vec![],
            resources: Default::default(),
            permissions: Default::default(),
            timeout_sec: 5,
        };
        let task = PluginTask {
            event_id: "1".to_string(),
            event: serde_json::json!({}),
        };

        let result = sandbox.execute(&plugin, Path::new("/plugins/echo"), &task).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("boom"));

        let second = sandbox.execute(&plugin, Path::new("/plugins/echo"), &task).await;
        assert!(second.success);

        assert_eq!(sandbox.invocations().len(), 2);
    }
}
