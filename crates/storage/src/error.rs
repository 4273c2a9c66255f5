// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors raised by the log substrate and the stores built on top of it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("entry {0:?} is missing the `event` field")]
    MissingEventField(String),
    #[error("consumer group {group:?} already exists on {topic:?}")]
    GroupAlreadyExists { topic: String, group: String },
    #[error("no entry found for id {0}")]
    NotFound(String),
}
