// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container Watchdog (§4.4): a periodic reaper for exited or over-TTL
//! containers carrying the sandbox's label.

use crate::sandbox::LABEL_FILTER;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::process::Command;

#[derive(Debug, Clone, PartialEq)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
    pub state: String,
    pub plugin_name: Option<String>,
    pub event_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// `GET /containers/stats` payload (§6.1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerStats {
    pub total: usize,
    pub running: usize,
    pub exited: usize,
    pub by_plugin: BTreeMap<String, usize>,
    pub oldest_age_seconds: u64,
}

/// Minimal shape of one `docker ps --format json` line.
#[derive(Debug, Deserialize)]
struct DockerPsEntry {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Names")]
    names: String,
    #[serde(rename = "State")]
    state: String,
    #[serde(rename = "CreatedAt")]
    created_at: Option<String>,
    #[serde(rename = "Labels", default)]
    labels: String,
}

pub struct ContainerWatchdog {
    runtime: String,
    container_ttl_secs: i64,
}

impl ContainerWatchdog {
    pub fn new(runtime: impl Into<String>, container_ttl_secs: i64) -> Self {
        Self {
            runtime: runtime.into(),
            container_ttl_secs,
        }
    }

    /// Remove every exited container carrying the label (§4.4 step 1).
    pub async fn cleanup_exited(&self) -> usize {
        let exited: Vec<String> = self
            .list(&["-aq", "-f", &format!("label={LABEL_FILTER}"), "-f", "status=exited"])
            .await
            .lines()
            .map(str::to_string)
            .filter(|l| !l.is_empty())
            .collect();
        if exited.is_empty() {
            return 0;
        }
        let mut rm_args = vec!["rm".to_string(), "-f".to_string()];
        rm_args.extend(exited.iter().cloned());
        let _ = self.run(&rm_args).await;
        exited.len()
    }

    /// Kill and remove any labelled container older than the TTL (§4.4
    /// step 2).
    pub async fn cleanup_expired(&self, now: DateTime<Utc>) -> usize {
        let containers = self.list_plugin_containers().await;
        let mut expired = 0;
        for container in containers {
            let Some(created_at) = container.created_at else {
                continue;
            };
            let age = now - created_at;
            if age.num_seconds() > self.container_ttl_secs {
                tracing::warn!(
                    container_id = %container.id,
                    plugin = ?container.plugin_name,
                    age_secs = age.num_seconds(),
                    ttl_secs = self.container_ttl_secs,
                    "container exceeded ttl, terminating"
                );
                let _ = self.run(&["kill".to_string(), container.id.clone()]).await;
                let _ = self.run(&["rm".to_string(), "-f".to_string(), container.id.clone()]).await;
                expired += 1;
            }
        }
        expired
    }

    /// Force-remove every labelled container regardless of state or age.
    pub async fn force_cleanup_all(&self) -> usize {
        let ids: Vec<String> = self
            .list(&["-aq", "-f", &format!("label={LABEL_FILTER}")])
            .await
            .lines()
            .map(str::to_string)
            .filter(|l| !l.is_empty())
            .collect();
        if ids.is_empty() {
            return 0;
        }
        let mut rm_args = vec!["rm".to_string(), "-f".to_string()];
        rm_args.extend(ids.iter().cloned());
        let _ = self.run(&rm_args).await;
        ids.len()
    }

    pub async fn list_plugin_containers(&self) -> Vec<ContainerInfo> {
        let output = self
            .list(&["-a", "--format", "json", "-f", &format!("label={LABEL_FILTER}")])
            .await;
        output
            .lines()
            .filter(|l| !l.is_empty())
            .filter_map(|line| serde_json::from_str::<DockerPsEntry>(line).ok())
            .map(|entry| parse_container(entry))
            .collect()
    }

    pub async fn stats(&self) -> ContainerStats {
        let containers = self.list_plugin_containers().await;
        let now = Utc::now();
        let mut stats = ContainerStats {
            total: containers.len(),
            running: 0,
            exited: 0,
            by_plugin: BTreeMap::new(),
            oldest_age_seconds: 0,
        };
        for container in &containers {
            match container.state.as_str() {
                "running" => stats.running += 1,
                "exited" => stats.exited += 1,
                _ => {}
            }
            let plugin = container.plugin_name.clone().unwrap_or_else(|| "unknown".to_string());
            *stats.by_plugin.entry(plugin).or_insert(0) += 1;
            if let Some(created_at) = container.created_at {
                let age = (now - created_at).num_seconds().max(0) as u64;
                stats.oldest_age_seconds = stats.oldest_age_seconds.max(age);
            }
        }
        stats
    }

    async fn list(&self, args: &[&str]) -> String {
        let mut ps_args = vec!["ps".to_string()];
        ps_args.extend(args.iter().map(|a| a.to_string()));
        self.run(&ps_args).await
    }

    async fn run(&self, args: &[String]) -> String {
        let output = Command::new(&self.runtime).args(args).output().await;
        match output {
            Ok(out) if out.status.success() => {
                String::from_utf8_lossy(&out.stdout).trim().to_string()
            }
            Ok(out) => {
                let stderr = String::from_utf8_lossy(&out.stderr);
                if !stderr.contains("No such container") {
                    tracing::warn!(args = ?args, error = %stderr.trim(), "container runtime command failed");
                }
                String::new()
            }
            Err(e) => {
                tracing::warn!(args = ?args, error = %e, "failed to exec container runtime");
                String::new()
            }
        }
    }
}

fn parse_container(entry: DockerPsEntry) -> ContainerInfo {
    let labels: BTreeMap<String, String> = entry
        .labels
        .split(',')
        .filter_map(|kv| kv.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ContainerInfo {
        id: entry.id,
        name: entry.names,
        state: entry.state,
        plugin_name: labels.get("core.plugin.name").cloned(),
        event_id: labels.get("core.event.id").cloned(),
        created_at: entry.created_at.and_then(|s| parse_docker_created_at(&s)),
    }
}

/// Docker's `CreatedAt` looks like `2024-01-02 10:00:00 +0000 UTC`.
fn parse_docker_created_at(raw: &str) -> Option<DateTime<Utc>> {
    let head = raw.split(" +").next().unwrap_or(raw);
    chrono::NaiveDateTime::parse_from_str(head, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
#[path = "watchdog_tests.rs"]
mod tests;
