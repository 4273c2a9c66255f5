// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Goal Scheduler admin surface (§6.1).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use core_domain::SystemClock;
use core_engine::GoalScheduler;
use core_wire::{
    GoalDetailResponse, GoalListResponse, GoalRunRequest, GoalRunResponse, GoalSummary,
    HealthResponse, InstanceSummary,
};

use super::auth::BearerAuthLayer;
use super::error::HttpError;

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<GoalScheduler<SystemClock>>,
}

pub fn router(state: AppState, auth_token: Option<String>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/goals", get(list_goals))
        .route("/goals/{id}", get(goal_detail))
        .route("/goals/run", post(run_goal))
        .route("/goals/reload", post(reload_goals))
        .route("/goals/{instance_id}/pause", post(pause_instance))
        .route("/goals/{instance_id}/resume", post(resume_instance))
        .layer(BearerAuthLayer::new(auth_token))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".to_string(), service: "goal-scheduler".to_string() })
}

async fn list_goals(State(state): State<AppState>) -> Json<GoalListResponse> {
    let goals: Vec<GoalSummary> = state
        .scheduler
        .goals()
        .into_iter()
        .map(|g| GoalSummary {
            id: g.id,
            name: g.name,
            enabled: g.enabled,
            is_periodic: g.schedule.is_some(),
            schedule: g.schedule,
        })
        .collect();
    let total = goals.len();
    Json(GoalListResponse { goals, total })
}

async fn goal_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GoalDetailResponse>, HttpError> {
    let config = state
        .scheduler
        .goal(&id)
        .ok_or_else(|| HttpError::new(core_wire::ApiErrorKind::NotFound, format!("no such goal {id:?}")))?;

    let mut instances = state.scheduler.instances_for(&id).await?;
    instances.reverse();
    instances.truncate(10);
    let next_run = instances
        .iter()
        .find(|i| matches!(i.state, core_domain::GoalState::Pending))
        .map(|i| i.next_run_ts);

    let instances = instances
        .into_iter()
        .map(|i| InstanceSummary {
            instance_id: i.instance_id,
            state: i.state,
            current_step: i.current_step,
            next_run_ts: i.next_run_ts,
            fail_count: i.fail_count,
            last_error: i.last_error,
            started_at: i.started_at,
            completed_at: i.completed_at,
        })
        .collect();

    Ok(Json(GoalDetailResponse { config, instances, next_run }))
}

async fn run_goal(
    State(state): State<AppState>,
    Json(body): Json<GoalRunRequest>,
) -> Result<Json<GoalRunResponse>, HttpError> {
    let params = if body.params.is_empty() { None } else { Some(body.params) };
    let instance_id = state.scheduler.run_goal(&body.goal_id, params).await?;
    Ok(Json(GoalRunResponse { instance_id }))
}

async fn reload_goals(State(state): State<AppState>) -> Result<Response, HttpError> {
    state.scheduler.reload()?;
    Ok(axum::http::StatusCode::NO_CONTENT.into_response())
}

async fn pause_instance(State(state): State<AppState>, Path(instance_id): Path<String>) -> Result<Response, HttpError> {
    state.scheduler.pause_instance(&instance_id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT.into_response())
}

async fn resume_instance(State(state): State<AppState>, Path(instance_id): Path<String>) -> Result<Response, HttpError> {
    state.scheduler.resume_instance(&instance_id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT.into_response())
}
