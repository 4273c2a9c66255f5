// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gzip snapshot archive (§3, §6.5): append-only, content-addressed files
//! under a snapshot root. A snapshot is never mutated after creation;
//! `cleanup` deletes by age.

use chrono::{DateTime, Utc};
use core_domain::{Snapshot, SnapshotMetadata};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Filesystem-backed snapshot archive.
#[derive(Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, snapshot_id: &str) -> PathBuf {
        self.root.join(format!("{snapshot_id}.json.gz"))
    }

    /// Write `snapshot` under its deterministic id, gzip-compressed JSON.
    pub async fn write(&self, snapshot: &Snapshot) -> Result<SnapshotMetadata, crate::StorageError> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.path_for(&snapshot.metadata.snapshot_id);
        let json = serde_json::to_vec(snapshot)?;
        let file = std::fs::File::create(&path)?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(&json)?;
        encoder.finish()?;
        Ok(snapshot.metadata.clone())
    }

    /// Decompress and deserialize a previously written snapshot.
    pub async fn read(&self, snapshot_id: &str) -> Result<Snapshot, crate::StorageError> {
        let path = self.path_for(snapshot_id);
        let file = std::fs::File::open(&path)
            .map_err(|_| crate::StorageError::NotFound(snapshot_id.to_string()))?;
        let mut decoder = GzDecoder::new(file);
        let mut json = Vec::new();
        decoder.read_to_end(&mut json)?;
        Ok(serde_json::from_slice(&json)?)
    }

    /// List every snapshot's metadata header without decompressing the
    /// event body, newest-created first.
    pub async fn list(&self) -> Result<Vec<SnapshotMetadata>, crate::StorageError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("gz") {
                continue;
            }
            if let Some(id) = snapshot_id_from_path(&path) {
                if let Ok(snapshot) = self.read(&id).await {
                    out.push(snapshot.metadata);
                }
            }
        }
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    /// Delete every snapshot whose `created_at` is older than `cutoff`.
    pub async fn cleanup(&self, cutoff: DateTime<Utc>) -> Result<usize, crate::StorageError> {
        let mut removed = 0;
        for metadata in self.list().await? {
            if metadata.created_at < cutoff {
                let path = self.path_for(&metadata.snapshot_id);
                if std::fs::remove_file(&path).is_ok() {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

fn snapshot_id_from_path(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    name.strip_suffix(".json.gz").map(str::to_string)
}
