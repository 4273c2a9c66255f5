// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Goal directory scanning (§4.6 loader): goal descriptors may be
//! nested in subdirectories, unlike the flat plugin directory.

use crate::error::DescriptorError;
use core_domain::{GoalConfig, GoalTrigger};
use core_domain::Event;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A loaded goal descriptor, paired with the file it came from.
#[derive(Debug, Clone)]
pub struct GoalDescriptor {
    pub config: GoalConfig,
    pub path: PathBuf,
}

/// In-memory index over a goals directory, keyed by `goal_id`.
#[derive(Debug, Clone, Default)]
pub struct GoalIndex {
    by_id: BTreeMap<String, GoalDescriptor>,
}

impl GoalIndex {
    pub fn get(&self, goal_id: &str) -> Option<&GoalConfig> {
        self.by_id.get(goal_id).map(|d| &d.config)
    }

    pub fn all(&self) -> impl Iterator<Item = &GoalConfig> {
        self.by_id.values().map(|d| &d.config)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Enabled periodic goals, the set the scheduler seeds its queue
    /// with on startup (§4.6 `_initialize_scheduled_goals`).
    pub fn periodic(&self) -> impl Iterator<Item = &GoalConfig> {
        self.by_id
            .values()
            .map(|d| &d.config)
            .filter(|g| g.enabled && g.is_periodic())
    }

    /// Enabled goals with at least one trigger matching `event`.
    pub fn matching(&self, event: &Event) -> impl Iterator<Item = &GoalConfig> {
        self.by_id.values().map(|d| &d.config).filter(move |g| {
            g.enabled
                && g.triggers
                    .iter()
                    .any(|t: &GoalTrigger| t.matches(event))
        })
    }
}

/// Loads a [`GoalIndex`] from a directory tree, rebuilding it wholesale
/// on each reload so a bad descriptor never leaves a partial index.
#[derive(Debug, Clone)]
pub struct GoalLoader {
    dir: PathBuf,
}

impl GoalLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn load(&self) -> Result<GoalIndex, DescriptorError> {
        let mut by_id = BTreeMap::new();
        for path in collect_descriptor_files(&self.dir)? {
            let descriptor = load_one(&path)?;
            by_id.insert(descriptor.config.id.clone(), descriptor);
        }
        Ok(GoalIndex { by_id })
    }
}

fn load_one(path: &Path) -> Result<GoalDescriptor, DescriptorError> {
    let content = std::fs::read_to_string(path).map_err(|source| DescriptorError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let config: GoalConfig =
        serde_yaml::from_str(&content).map_err(|source| DescriptorError::Yaml {
            path: path.display().to_string(),
            source,
        })?;
    config.validate()?;
    Ok(GoalDescriptor {
        config,
        path: path.to_path_buf(),
    })
}

fn collect_descriptor_files(dir: &Path) -> Result<Vec<PathBuf>, DescriptorError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let entries = std::fs::read_dir(&current).map_err(|source| DescriptorError::Io {
            path: current.display().to_string(),
            source,
        })?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if is_yaml(&path) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

#[cfg(test)]
#[path = "goals_tests.rs"]
mod tests;
