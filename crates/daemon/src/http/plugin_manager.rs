// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plugin Manager admin surface (§6.1).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use core_adapters::ContainerWatchdog;
use core_domain::SystemClock;
use core_engine::{CircuitBreaker, PluginManager};
use core_wire::{
    ContainerCleanupRequest, ContainerCleanupResponse, ContainerStatsResponse, HealthResponse,
    PluginDetailResponse, PluginExecuteRequest, PluginExecuteResponse, PluginListResponse,
    PluginPauseRequest, PluginSummary,
};

use super::auth::BearerAuthLayer;
use super::error::HttpError;

#[derive(Clone)]
pub struct AppState {
    pub plugin_manager: Arc<PluginManager<SystemClock>>,
    pub breaker: Arc<CircuitBreaker<SystemClock>>,
    pub watchdog: Arc<ContainerWatchdog>,
}

pub fn router(state: AppState, auth_token: Option<String>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/plugins", get(list_plugins))
        .route("/plugins/{name}", get(plugin_detail))
        .route("/plugins/{name}/execute", post(execute_plugin))
        .route("/plugins/{name}/reset", post(reset_plugin))
        .route("/plugins/{name}/pause", post(pause_plugin))
        .route("/containers/cleanup", post(cleanup_containers))
        .route("/containers/stats", get(container_stats))
        .layer(BearerAuthLayer::new(auth_token))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".to_string(), service: "plugin-manager".to_string() })
}

async fn list_plugins(State(state): State<AppState>) -> Result<Json<PluginListResponse>, HttpError> {
    let mut plugins = Vec::new();
    for name in state.plugin_manager.plugin_names() {
        let Some(config) = state.plugin_manager.plugin_config(&name) else {
            continue;
        };
        let health = state.breaker.health(&name).await?;
        plugins.push(PluginSummary {
            name,
            version: config.version,
            state: health.state,
            consecutive_failures: health.consecutive_failures,
            total_executions: health.total_executions,
        });
    }
    let total = plugins.len();
    Ok(Json(PluginListResponse { plugins, total }))
}

async fn plugin_detail(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<PluginDetailResponse>, HttpError> {
    let config = state
        .plugin_manager
        .plugin_config(&name)
        .ok_or_else(|| HttpError::new(core_wire::ApiErrorKind::NotFound, format!("no such plugin {name:?}")))?;
    let health = state.breaker.health(&name).await?;
    Ok(Json(PluginDetailResponse {
        config,
        state: health.state,
        consecutive_failures: health.consecutive_failures,
        total_failures: health.total_failures,
        total_executions: health.total_executions,
        disabled_until: health.disabled_until,
        recent_failure_reasons: health.recent_failure_reasons(5),
    }))
}

async fn execute_plugin(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<PluginExecuteRequest>,
) -> Result<Json<PluginExecuteResponse>, HttpError> {
    let result = state.plugin_manager.trigger(&name, body.event_data).await?;
    Ok(Json(PluginExecuteResponse {
        success: result.success,
        stdout: result.stdout.unwrap_or_default(),
        stderr: result.stderr.unwrap_or_default(),
        exit_code: result.exit_code,
        duration_ms: result.duration_ms as u64,
        error: result.error,
    }))
}

async fn reset_plugin(State(state): State<AppState>, Path(name): Path<String>) -> Result<Response, HttpError> {
    state.plugin_manager.reset(&name).await?;
    Ok(axum::http::StatusCode::NO_CONTENT.into_response())
}

async fn pause_plugin(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<PluginPauseRequest>,
) -> Result<Response, HttpError> {
    state.plugin_manager.pause(&name, body.minutes as i64).await?;
    Ok(axum::http::StatusCode::NO_CONTENT.into_response())
}

async fn cleanup_containers(
    State(state): State<AppState>,
    Json(body): Json<ContainerCleanupRequest>,
) -> Json<ContainerCleanupResponse> {
    let removed = if body.force {
        state.plugin_manager.force_cleanup_containers().await
    } else {
        state.watchdog.cleanup_exited().await
    };
    Json(ContainerCleanupResponse { removed })
}

async fn container_stats(State(state): State<AppState>) -> Json<ContainerStatsResponse> {
    let stats = state.watchdog.stats().await;
    Json(ContainerStatsResponse {
        total: stats.total,
        running: stats.running,
        exited: stats.exited,
        by_plugin: stats.by_plugin,
        oldest_age_seconds: stats.oldest_age_seconds,
    })
}
