// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn api_error_kind_maps_to_the_documented_status_codes() {
    assert_eq!(ApiErrorKind::Unauthorized.status_code(), 401);
    assert_eq!(ApiErrorKind::Forbidden.status_code(), 403);
    assert_eq!(ApiErrorKind::NotFound.status_code(), 404);
    assert_eq!(ApiErrorKind::Validation.status_code(), 422);
    assert_eq!(ApiErrorKind::RateLimited.status_code(), 429);
    assert_eq!(ApiErrorKind::Internal.status_code(), 500);
    assert_eq!(ApiErrorKind::Unavailable.status_code(), 503);
}

#[test]
fn plugin_execute_request_round_trips_through_json() {
    let req = PluginExecuteRequest {
        plugin: "echo".to_string(),
        event_data: serde_json::json!({"a": 1}),
    };
    let json = serde_json::to_string(&req).unwrap();
    let back: PluginExecuteRequest = serde_json::from_str(&json).unwrap();
    assert_eq!(req, back);
}

#[test]
fn goal_run_request_defaults_params_when_absent() {
    let req: GoalRunRequest = serde_json::from_str(r#"{"goal_id": "g1"}"#).unwrap();
    assert_eq!(req.goal_id, "g1");
    assert!(req.params.is_empty());
}
