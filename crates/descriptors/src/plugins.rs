// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plugin directory scanning (§4.5 loader): every `*.yaml`/`*.yml` file
//! directly under the plugin directory is one plugin descriptor.

use crate::error::DescriptorError;
use core_domain::{PluginConfig, PluginTrigger};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A loaded plugin descriptor, paired with the file it came from.
#[derive(Debug, Clone)]
pub struct PluginDescriptor {
    pub config: PluginConfig,
    pub path: PathBuf,
}

/// In-memory index over a plugin directory, rebuilt wholesale on reload
/// so a failed rescan never leaves a half-updated index in place.
#[derive(Debug, Clone, Default)]
pub struct PluginLoader {
    dir: PathBuf,
    by_name: BTreeMap<String, PluginDescriptor>,
}

impl PluginLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            by_name: BTreeMap::new(),
        }
    }

    /// Rescan the plugin directory, replacing the index only if every
    /// descriptor parses and validates.
    pub fn reload(&mut self) -> Result<(), DescriptorError> {
        let mut loaded = BTreeMap::new();
        for path in collect_descriptor_files(&self.dir)? {
            let descriptor = load_one(&path)?;
            loaded.insert(descriptor.config.name.clone(), descriptor);
        }
        self.by_name = loaded;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&PluginDescriptor> {
        self.by_name.get(name)
    }

    /// Rewrite a discovered plugin's image to its built, tagged form once
    /// [`core_adapters::Sandbox::prepare_image`] has run (§4.2). A no-op if
    /// the plugin vanished from the index between discovery and the build.
    pub fn set_image(&mut self, name: &str, image: String) {
        if let Some(descriptor) = self.by_name.get_mut(name) {
            descriptor.config.image = image;
        }
    }

    pub fn all(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Every plugin whose triggers match the given event (§4.5).
    pub fn matching(
        &self,
        topic: &str,
        event_type: &str,
        payload: &BTreeMap<String, Value>,
    ) -> impl Iterator<Item = &PluginDescriptor> {
        self.by_name.values().filter(move |d| {
            d.config
                .triggers
                .iter()
                .any(|t: &PluginTrigger| t.matches(topic, event_type, payload))
        })
    }
}

fn load_one(path: &Path) -> Result<PluginDescriptor, DescriptorError> {
    let content = std::fs::read_to_string(path).map_err(|source| DescriptorError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let config: PluginConfig =
        serde_yaml::from_str(&content).map_err(|source| DescriptorError::Yaml {
            path: path.display().to_string(),
            source,
        })?;
    config.validate()?;
    Ok(PluginDescriptor {
        config,
        path: path.to_path_buf(),
    })
}

/// Plugin descriptors sit directly under the directory, unlike the
/// recursive goal scan (§4.5 vs §4.6).
fn collect_descriptor_files(dir: &Path) -> Result<Vec<PathBuf>, DescriptorError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(dir).map_err(|source| DescriptorError::Io {
        path: dir.display().to_string(),
        source,
    })?;
    let mut files = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if is_yaml(&path) {
            files.push(path);
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
#[path = "plugins_tests.rs"]
mod tests;
