// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn sample_config() -> PluginConfig {
    PluginConfig {
        name: "echo".to_string(),
        version: "1.0.0".to_string(),
        triggers: vec![PluginTrigger {
            topic: "chat.v1".to_string(),
            event_type: Some("message".to_string()),
            filter: None,
        }],
        entrypoint: "python main.py".to_string(),
        image: "python:3.12-slim".to_string(),
        requirements: vec![],
        resources: PluginResources::default(),
        permissions: PluginPermissions::default(),
        timeout_sec: 30,
    }
}

#[test]
fn name_pattern_rejects_uppercase_and_leading_digit() {
    let mut cfg = sample_config();
    cfg.name = "Echo".to_string();
    assert!(cfg.validate().is_err());
    cfg.name = "1echo".to_string();
    assert!(cfg.validate().is_err());
    cfg.name = "echo-v2".to_string();
    assert!(cfg.validate().is_ok());
}

#[test]
fn version_pattern_requires_semver_with_optional_prerelease() {
    let mut cfg = sample_config();
    cfg.version = "1.0".to_string();
    assert!(cfg.validate().is_err());
    cfg.version = "1.0.0-beta".to_string();
    assert!(cfg.validate().is_ok());
}

#[test]
fn trigger_matches_requires_topic_and_event_type() {
    let trigger = PluginTrigger {
        topic: "chat.v1".to_string(),
        event_type: Some("message".to_string()),
        filter: None,
    };
    let payload = BTreeMap::new();
    assert!(trigger.matches("chat.v1", "message", &payload));
    assert!(!trigger.matches("chat.v1", "other", &payload));
    assert!(!trigger.matches("fs.v1", "message", &payload));
}

#[test]
fn trigger_filter_requires_all_fields_equal() {
    let mut filter = BTreeMap::new();
    filter.insert("room".to_string(), Value::String("general".to_string()));
    let trigger = PluginTrigger {
        topic: "chat.v1".to_string(),
        event_type: None,
        filter: Some(filter),
    };
    let mut payload = BTreeMap::new();
    payload.insert("room".to_string(), Value::String("general".to_string()));
    assert!(trigger.matches("chat.v1", "anything", &payload));

    payload.insert("room".to_string(), Value::String("random".to_string()));
    assert!(!trigger.matches("chat.v1", "anything", &payload));
}

#[test]
fn deny_takes_precedence_over_allow() {
    let perms = PluginFsPermissions {
        allow: vec!["/data".to_string()],
        deny: vec!["/data/secret".to_string()],
    };
    assert!(perms.is_path_allowed("/data/public"));
    assert!(!perms.is_path_allowed("/data/secret/keys"));
    assert!(!perms.is_path_allowed("/etc"));
}

#[test]
fn failure_reasons_ring_is_bounded() {
    let mut health = PluginHealth::new_active();
    for i in 0..15 {
        health.push_failure_reason(format!("error-{i}"), 10);
    }
    assert_eq!(health.failure_reasons.len(), 10);
    assert_eq!(health.failure_reasons.front().unwrap(), "error-5");
    assert_eq!(health.failure_reasons.back().unwrap(), "error-14");
}

#[test]
fn recent_failure_reasons_caps_at_requested_limit() {
    let mut health = PluginHealth::new_active();
    for i in 0..10 {
        health.push_failure_reason(format!("error-{i}"), 10);
    }
    let recent = health.recent_failure_reasons(5);
    assert_eq!(recent, vec!["error-5", "error-6", "error-7", "error-8", "error-9"]);
}

#[test]
fn built_image_tag_includes_name_and_version() {
    let cfg = sample_config();
    assert_eq!(cfg.built_image_tag(), "core-plugin-echo:1.0.0");
}
