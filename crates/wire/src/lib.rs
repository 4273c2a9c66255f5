// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire types shared between the daemon's HTTP admin surfaces (§6.1) and
//! `corectl`: request/response bodies serialized as JSON over HTTP, plus
//! the small `IntoResponse`-adjacent error shape both sides agree on.

mod common;
mod containers;
mod goals;
mod plugins;

pub use common::{ApiError, ApiErrorKind, HealthResponse};
pub use containers::{ContainerCleanupRequest, ContainerCleanupResponse, ContainerStatsResponse};
pub use goals::{
    GoalDetailResponse, GoalListResponse, GoalRunRequest, GoalRunResponse, GoalSummary,
    InstanceSummary,
};
pub use plugins::{
    PluginDetailResponse, PluginExecuteRequest, PluginExecuteResponse, PluginListResponse,
    PluginPauseRequest, PluginSummary,
};

#[cfg(test)]
mod wire_tests;
