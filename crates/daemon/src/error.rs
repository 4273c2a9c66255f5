// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level error type for the `core-runtimed` binary. Every subsystem
//! keeps its own `thiserror` enum (§7); this one just gives `main` a
//! single `?`-able return type that prints a readable cause chain.

use crate::config::ConfigError;
use core_engine::{GoalSchedulerError, PluginManagerError};
use core_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
    #[error(transparent)]
    PluginManager(#[from] PluginManagerError),
    #[error(transparent)]
    GoalScheduler(#[from] GoalSchedulerError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
