// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::fs;

const ECHO_YAML: &str = r#"
name: echo
version: "1.0.0"
entrypoint: main.py
image: core-plugin-base:latest
triggers:
  - topic: jobs.created
    event_type: created
"#;

const BAD_NAME_YAML: &str = r#"
name: Echo-Bad
version: "1.0.0"
entrypoint: main.py
image: core-plugin-base:latest
"#;

#[test]
fn reload_indexes_every_descriptor_in_the_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("echo.yaml"), ECHO_YAML).unwrap();

    let mut loader = PluginLoader::new(dir.path());
    loader.reload().unwrap();

    assert_eq!(loader.len(), 1);
    assert_eq!(loader.get("echo").unwrap().config.image, "core-plugin-base:latest");
}

#[test]
fn reload_rejects_the_whole_batch_on_one_invalid_descriptor() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("echo.yaml"), ECHO_YAML).unwrap();
    fs::write(dir.path().join("bad.yaml"), BAD_NAME_YAML).unwrap();

    let mut loader = PluginLoader::new(dir.path());
    let err = loader.reload().unwrap_err();

    assert!(matches!(err, DescriptorError::Validation(_)));
    assert!(loader.is_empty());
}

#[test]
fn missing_directory_yields_an_empty_index() {
    let mut loader = PluginLoader::new("/nonexistent/path/for/test");
    loader.reload().unwrap();
    assert!(loader.is_empty());
}

#[test]
fn matching_filters_by_topic_and_event_type() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("echo.yaml"), ECHO_YAML).unwrap();
    let mut loader = PluginLoader::new(dir.path());
    loader.reload().unwrap();

    let payload = BTreeMap::new();
    assert_eq!(loader.matching("jobs.created", "created", &payload).count(), 1);
    assert_eq!(loader.matching("jobs.created", "deleted", &payload).count(), 0);
    assert_eq!(loader.matching("other.topic", "created", &payload).count(), 0);
}
