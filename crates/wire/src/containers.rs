// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sandbox container administration bodies (§6.1, §4.4).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `POST /containers/cleanup` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContainerCleanupRequest {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerCleanupResponse {
    pub removed: usize,
}

/// `GET /containers/stats` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerStatsResponse {
    pub total: usize,
    pub running: usize,
    pub exited: usize,
    pub by_plugin: BTreeMap<String, usize>,
    pub oldest_age_seconds: u64,
}
