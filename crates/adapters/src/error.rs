// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors raised launching and supervising sandbox containers (§4.2, §4.4).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to exec container runtime: {0}")]
    Exec(#[from] std::io::Error),
    #[error("container runtime exited non-zero: {0}")]
    RuntimeFailed(String),
    #[error("plugin timed out after {0}s")]
    Timeout(u64),
}
