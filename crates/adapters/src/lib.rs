// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container-runtime adapters: the Sandbox Executor, its rate-limiting
//! neighbor on the Event Bus consumer loop, and the Container Watchdog
//! (§4.2, §4.4).

#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

pub mod error;
pub mod rate_limiter;
pub mod sandbox;
pub mod watchdog;

#[cfg(any(test, feature = "test-support"))]
pub mod fake_sandbox;

pub use error::SandboxError;
pub use rate_limiter::RateLimiter;
pub use sandbox::{ContainerSandbox, PluginResult, PluginTask, Sandbox, SandboxConfig};
pub use watchdog::{ContainerInfo, ContainerStats, ContainerWatchdog};

#[cfg(any(test, feature = "test-support"))]
pub use fake_sandbox::FakeSandbox;
