// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One `thiserror` enum per subsystem boundary (§7): the Event Bus, the
//! Circuit Breaker, the Plugin Manager, and the Goal Scheduler each
//! surface their own error kind rather than sharing a single umbrella.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventBusError {
    #[error(transparent)]
    Validation(#[from] core_domain::ValidationError),
    #[error("publish failed: {0}")]
    Publish(#[from] core_storage::StorageError),
    #[error("dead-letter append failed for event {event_id}: {source}")]
    DeadLetter {
        event_id: String,
        #[source]
        source: core_storage::StorageError,
    },
}

#[derive(Debug, Error)]
pub enum BreakerError {
    #[error("no health record for plugin {0:?}")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] core_storage::StorageError),
}

#[derive(Debug, Error)]
pub enum PluginManagerError {
    #[error("no such plugin {0:?}")]
    NotFound(String),
    #[error("plugin {0:?} is disabled")]
    Disabled(String),
    #[error("task queue is full")]
    QueueFull,
    #[error(transparent)]
    Breaker(#[from] BreakerError),
    #[error(transparent)]
    Descriptor(#[from] core_descriptors::DescriptorError),
    #[error(transparent)]
    Sandbox(#[from] core_adapters::SandboxError),
}

#[derive(Debug, Error)]
pub enum GoalSchedulerError {
    #[error("no such goal {0:?}")]
    NotFound(String),
    #[error("no such instance {0:?}")]
    NoSuchInstance(String),
    #[error(transparent)]
    Validation(#[from] core_domain::ValidationError),
    #[error(transparent)]
    Storage(#[from] core_storage::StorageError),
    #[error(transparent)]
    Descriptor(#[from] core_descriptors::DescriptorError),
    #[error("step {0:?} timed out")]
    StepTimeout(String),
    #[error(transparent)]
    Bus(#[from] EventBusError),
}
