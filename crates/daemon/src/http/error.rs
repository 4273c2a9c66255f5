// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maps each subsystem's `thiserror` enum onto an HTTP status and a
//! [`core_wire::ApiError`] body (§7 "User-visible failure behavior"),
//! rather than matching ad hoc at each handler.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use core_engine::{BreakerError, GoalSchedulerError, PluginManagerError};
use core_wire::{ApiError, ApiErrorKind};

pub struct HttpError(ApiErrorKind, String);

impl HttpError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self(kind, message.into())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ApiError::new(self.0, self.1))).into_response()
    }
}

impl From<PluginManagerError> for HttpError {
    fn from(err: PluginManagerError) -> Self {
        let kind = match &err {
            PluginManagerError::NotFound(_) => ApiErrorKind::NotFound,
            PluginManagerError::Disabled(_) => ApiErrorKind::Forbidden,
            PluginManagerError::QueueFull => ApiErrorKind::Unavailable,
            PluginManagerError::Breaker(_) => ApiErrorKind::Internal,
            PluginManagerError::Descriptor(_) => ApiErrorKind::Validation,
        };
        Self(kind, err.to_string())
    }
}

impl From<GoalSchedulerError> for HttpError {
    fn from(err: GoalSchedulerError) -> Self {
        let kind = match &err {
            GoalSchedulerError::NotFound(_) | GoalSchedulerError::NoSuchInstance(_) => ApiErrorKind::NotFound,
            GoalSchedulerError::Validation(_) | GoalSchedulerError::Descriptor(_) => ApiErrorKind::Validation,
            GoalSchedulerError::StepTimeout(_) => ApiErrorKind::Unavailable,
            GoalSchedulerError::Storage(_) | GoalSchedulerError::Bus(_) => ApiErrorKind::Internal,
        };
        Self(kind, err.to_string())
    }
}

impl From<BreakerError> for HttpError {
    fn from(err: BreakerError) -> Self {
        let kind = match &err {
            BreakerError::NotFound(_) => ApiErrorKind::NotFound,
            BreakerError::Storage(_) => ApiErrorKind::Internal,
        };
        Self(kind, err.to_string())
    }
}
