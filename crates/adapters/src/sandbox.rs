// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Sandbox Executor (§4.2): one plugin invocation, one ephemeral
//! container, isolated by network/filesystem/capability defaults and a
//! wall-clock timeout.

use crate::error::SandboxError;
use async_trait::async_trait;
use core_domain::PluginConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// The label every container this sandbox launches carries, so the
/// Watchdog (§4.4) can find and reap orphans regardless of which plugin
/// or invocation created them.
pub const LABEL_FILTER: &str = "core.plugin";

/// One plugin invocation request (mirrors the original `PluginTask`).
#[derive(Debug, Clone)]
pub struct PluginTask {
    pub event_id: String,
    pub event: Value,
}

/// The structured outcome of one invocation; never an `Err` — launch and
/// wait failures are folded into `success=false` + `error` (§4.2).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginResult {
    pub plugin_name: String,
    pub event_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default)]
    pub exit_code: i32,
    #[serde(default)]
    pub duration_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Container-runtime defaults (§6.6 sandbox section).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SandboxConfig {
    pub runtime: String,
    pub network_mode: String,
    pub read_only: bool,
    pub tmp_size: String,
    pub work_dir: String,
    pub drop_capabilities: Vec<String>,
    pub no_new_privileges: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            runtime: "docker".to_string(),
            network_mode: "none".to_string(),
            read_only: true,
            tmp_size: "64Mi".to_string(),
            work_dir: "/app".to_string(),
            drop_capabilities: vec!["ALL".to_string()],
            no_new_privileges: true,
        }
    }
}

#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Execute `task` against `plugin` with its code mounted read-only
    /// from `plugin_dir`. Always returns a result, even on launch failure
    /// or timeout.
    async fn execute(
        &self,
        plugin: &PluginConfig,
        plugin_dir: &Path,
        task: &PluginTask,
    ) -> PluginResult;

    /// Build and tag a per-plugin image from `requirements` before the
    /// first execution (§4.2 Image preparation). Rewrites `plugin.image`
    /// to the tagged name on success; a no-op when `requirements` is
    /// empty. The default implementation does nothing, for test doubles
    /// that never build real images.
    async fn prepare_image(
        &self,
        _plugin: &mut PluginConfig,
        _plugin_dir: &Path,
    ) -> Result<(), SandboxError> {
        Ok(())
    }
}

/// Runs plugins in Docker/Podman containers via the runtime's CLI,
/// matching the docker-CLI-over-`tokio::process::Command` pattern the
/// daemon's agent adapters use for container lifecycle.
pub struct ContainerSandbox {
    config: SandboxConfig,
}

impl ContainerSandbox {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    fn container_name(&self, plugin: &PluginConfig, task: &PluginTask) -> String {
        let short_id: String = task.event_id.chars().take(8).collect();
        format!("core-plugin-{}-{}", plugin.name, short_id)
    }

    /// Build the full `docker run` argument list (§4.2).
    fn build_args(
        &self,
        container_name: &str,
        plugin: &PluginConfig,
        plugin_dir: &Path,
        task: &PluginTask,
    ) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "run".into(),
            "--rm".into(),
            "--name".into(),
            container_name.into(),
            "--network".into(),
            self.config.network_mode.clone(),
        ];
        if self.config.read_only {
            args.push("--read-only".into());
        }
        if self.config.no_new_privileges {
            args.push("--security-opt".into());
            args.push("no-new-privileges".into());
        }
        args.push("--cpus".into());
        args.push(convert_cpu_units(&plugin.resources.cpu));
        args.push("--memory".into());
        args.push(convert_memory_units(&plugin.resources.memory));
        args.push("--tmpfs".into());
        args.push(format!("/tmp:size={}", convert_memory_units(&self.config.tmp_size)));
        args.push("--workdir".into());
        args.push(self.config.work_dir.clone());
        for cap in &self.config.drop_capabilities {
            args.push("--cap-drop".into());
            args.push(cap.clone());
        }
        args.push("--label".into());
        args.push("core.plugin=true".into());
        args.push("--label".into());
        args.push(format!("core.plugin.name={}", plugin.name));
        args.push("--label".into());
        args.push(format!("core.event.id={}", task.event_id));
        args.push("-v".into());
        args.push(format!("{}:{}:ro", plugin_dir.display(), self.config.work_dir));
        for mount in allowed_mount_args(plugin) {
            args.push("-v".into());
            args.push(mount);
        }
        let event_data = serde_json::to_string(&task.event).unwrap_or_else(|_| "{}".to_string());
        args.push("-e".into());
        args.push(format!("PLUGIN_NAME={}", plugin.name));
        args.push("-e".into());
        args.push(format!("PLUGIN_VERSION={}", plugin.version));
        args.push("-e".into());
        args.push(format!("EVENT_ID={}", task.event_id));
        args.push("-e".into());
        args.push(format!("EVENT_DATA={event_data}"));
        args.push(plugin.image.clone());
        args.extend(plugin.entrypoint.split_whitespace().map(str::to_string));
        args
    }
}

#[async_trait]
impl Sandbox for ContainerSandbox {
    /// Build a per-plugin tagged image when `requirements` is non-empty,
    /// generating a minimal Dockerfile layering `pip install` on top of
    /// `plugin.image` (§4.2 Image preparation).
    async fn prepare_image(
        &self,
        plugin: &mut PluginConfig,
        plugin_dir: &Path,
    ) -> Result<(), SandboxError> {
        if plugin.requirements.is_empty() {
            return Ok(());
        }

        let dockerfile = format!(
            "FROM {}\nWORKDIR {}\nCOPY requirements.txt .\nRUN pip install --no-cache-dir -r requirements.txt\n",
            plugin.image, self.config.work_dir,
        );
        let requirements = plugin.requirements.join("\n");
        tokio::fs::write(plugin_dir.join("requirements.txt"), requirements).await?;
        let dockerfile_path = plugin_dir.join("Dockerfile.generated");
        tokio::fs::write(&dockerfile_path, dockerfile).await?;

        let tag = plugin.built_image_tag();
        let output = Command::new(&self.config.runtime)
            .args([
                "build",
                "-t",
                &tag,
                "-f",
                &dockerfile_path.display().to_string(),
                &plugin_dir.display().to_string(),
            ])
            .output()
            .await?;

        if !output.status.success() {
            return Err(SandboxError::RuntimeFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        plugin.image = tag;
        Ok(())
    }

    async fn execute(
        &self,
        plugin: &PluginConfig,
        plugin_dir: &Path,
        task: &PluginTask,
    ) -> PluginResult {
        let start = Instant::now();
        let container_name = self.container_name(plugin, task);
        let args = self.build_args(&container_name, plugin, plugin_dir, task);

        let outcome = tokio::time::timeout(
            Duration::from_secs(plugin.timeout_sec),
            Command::new(&self.config.runtime).args(&args).output(),
        )
        .await;

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(Ok(output)) => PluginResult {
                plugin_name: plugin.name.clone(),
                event_id: task.event_id.clone(),
                success: output.status.success(),
                stdout: Some(String::from_utf8_lossy(&output.stdout).to_string()),
                stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
                exit_code: output.status.code().unwrap_or(-1),
                duration_ms,
                error: None,
            },
            Ok(Err(e)) => PluginResult {
                plugin_name: plugin.name.clone(),
                event_id: task.event_id.clone(),
                success: false,
                stdout: None,
                stderr: None,
                exit_code: -1,
                duration_ms,
                error: Some(e.to_string()),
            },
            Err(_) => {
                let _ = Command::new(&self.config.runtime)
                    .args(["kill", &container_name])
                    .output()
                    .await;
                let _ = Command::new(&self.config.runtime)
                    .args(["rm", "-f", &container_name])
                    .output()
                    .await;
                PluginResult {
                    plugin_name: plugin.name.clone(),
                    event_id: task.event_id.clone(),
                    success: false,
                    stdout: None,
                    stderr: None,
                    exit_code: -1,
                    duration_ms,
                    error: Some(format!("Timeout after {}s", plugin.timeout_sec)),
                }
            }
        }
    }
}

/// Kubernetes-style millicores (`"500m"`) to Docker's fractional-core
/// string; anything else (already a whole-core number) passes through.
pub fn convert_cpu_units(cpu: &str) -> String {
    if let Some(digits) = cpu.strip_suffix('m') {
        if let Ok(millicores) = digits.parse::<f64>() {
            return format!("{}", millicores / 1000.0);
        }
    }
    cpu.to_string()
}

/// Kubernetes-style `Mi`/`Gi`/`Ki` to Docker's lowercase `m`/`g`/`k`
/// suffixes; anything else passes through unchanged.
pub fn convert_memory_units(memory: &str) -> String {
    if let Some(digits) = memory.strip_suffix("Mi") {
        format!("{digits}m")
    } else if let Some(digits) = memory.strip_suffix("Gi") {
        format!("{digits}g")
    } else if let Some(digits) = memory.strip_suffix("Ki") {
        format!("{digits}k")
    } else {
        memory.to_string()
    }
}

/// Read-only bind mounts for every existing host path implied by
/// `permissions.fs.allow`, deduplicated, glob suffixes stripped.
fn allowed_mount_args(plugin: &PluginConfig) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    let mut mounts = Vec::new();
    for pattern in &plugin.permissions.fs.allow {
        let base = pattern
            .trim_end_matches("/**/*")
            .trim_end_matches("/**")
            .trim_end_matches("/*");
        if seen.insert(base.to_string()) && Path::new(base).exists() {
            mounts.push(format!("{base}:{base}:ro"));
        }
    }
    mounts
}

#[cfg(test)]
#[path = "sandbox_tests.rs"]
mod tests;
