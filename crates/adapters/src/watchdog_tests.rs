// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parses_docker_created_at_format() {
    let parsed = parse_docker_created_at("2024-01-02 10:00:00 +0000 UTC").unwrap();
    assert_eq!(parsed.to_string(), "2024-01-02 10:00:00 UTC");
}

#[test]
fn malformed_created_at_yields_none() {
    assert!(parse_docker_created_at("not a timestamp").is_none());
}

#[test]
fn parse_container_extracts_labels() {
    let entry = DockerPsEntry {
        id: "abc123".to_string(),
        names: "core-plugin-echo-aa".to_string(),
        state: "running".to_string(),
        created_at: Some("2024-01-02 10:00:00 +0000 UTC".to_string()),
        labels: "core.plugin=true,core.plugin.name=echo,core.event.id=0-1".to_string(),
    };

    let info = parse_container(entry);

    assert_eq!(info.plugin_name.as_deref(), Some("echo"));
    assert_eq!(info.event_id.as_deref(), Some("0-1"));
    assert!(info.created_at.is_some());
}

#[test]
fn stats_count_by_state_and_plugin() {
    let now = Utc::now();
    let containers = vec![
        ContainerInfo {
            id: "1".into(),
            name: "a".into(),
            state: "running".to_string(),
            plugin_name: Some("echo".to_string()),
            event_id: None,
            created_at: Some(now - chrono::Duration::seconds(30)),
        },
        ContainerInfo {
            id: "2".into(),
            name: "b".into(),
            state: "exited".to_string(),
            plugin_name: Some("echo".to_string()),
            event_id: None,
            created_at: Some(now - chrono::Duration::seconds(120)),
        },
    ];

    let mut by_plugin = BTreeMap::new();
    by_plugin.insert("echo".to_string(), 2usize);
    let mut stats = ContainerStats {
        total: containers.len(),
        running: 0,
        exited: 0,
        by_plugin: BTreeMap::new(),
        oldest_age_seconds: 0,
    };
    for c in &containers {
        match c.state.as_str() {
            "running" => stats.running += 1,
            "exited" => stats.exited += 1,
            _ => {}
        }
        *stats.by_plugin.entry(c.plugin_name.clone().unwrap()).or_insert(0) += 1;
        if let Some(created_at) = c.created_at {
            stats.oldest_age_seconds = stats
                .oldest_age_seconds
                .max((now - created_at).num_seconds().max(0) as u64);
        }
    }

    assert_eq!(stats.running, 1);
    assert_eq!(stats.exited, 1);
    assert_eq!(stats.by_plugin, by_plugin);
    assert!(stats.oldest_age_seconds >= 120);
}
