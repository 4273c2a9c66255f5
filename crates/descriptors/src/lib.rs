// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Descriptor loading: the plugin directory scanner, the goals directory
//! loader, and the `@every <N>s` / cron schedule grammar (§4.5 loader,
//! §4.6 loader, §6.4).

#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

pub mod error;
pub mod goals;
pub mod plugins;
pub mod schedule;

pub use error::DescriptorError;
pub use goals::{GoalIndex, GoalLoader};
pub use plugins::{PluginDescriptor, PluginLoader};
pub use schedule::next_run_after;
