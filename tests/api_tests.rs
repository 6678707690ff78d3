// SPDX-License-Identifier: MIT

//! Envelope contract tests through the axum router.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;
use common::create_test_app;

async fn post_action(app: Router, payload: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/activities")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    (status, body)
}

fn create_payload() -> Value {
    let now = chrono::Utc::now();
    json!({
        "action": "create",
        "actor": "org",
        "data": {
            "title": "Evening tennis",
            "description": "Doubles, bring a racket",
            "sport": "tennis",
            "location": { "name": "North courts", "city": "Springfield" },
            "schedule": {
                "start_time": (now + chrono::Duration::hours(2)).to_rfc3339(),
                "end_time": (now + chrono::Duration::hours(4)).to_rfc3339(),
                "duration_minutes": 120
            },
            "capacity": { "max_count": 4, "min_count": 2 }
        }
    })
}

#[tokio::test]
async fn health_endpoint_responds() {
    let (app, _) = create_test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unsupported_action_is_validation_error() {
    let (app, _) = create_test_app();
    let (status, body) = post_action(
        app,
        json!({ "action": "frobnicate", "actor": "org", "data": {} }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 4001);
    assert!(body["data"].is_null());
    assert!(body["timestamp"].is_i64());
}

#[tokio::test]
async fn create_and_detail_through_the_envelope() {
    let (app, _) = create_test_app();
    let (status, body) = post_action(app.clone(), create_payload()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    assert_eq!(body["message"], "success");
    let activity_id = body["data"]["activityId"].as_str().unwrap().to_string();

    let (status, body) = post_action(
        app,
        json!({
            "action": "detail",
            "actor": "org",
            "data": { "activityId": activity_id }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    let activity = &body["data"]["activity"];
    assert_eq!(activity["status"], "recruiting");
    assert_eq!(activity["currentCount"], 1);
    assert_eq!(activity["isOrganizer"], true);
}

#[tokio::test]
async fn create_without_required_fields_is_4001() {
    let (app, _) = create_test_app();
    let (status, body) = post_action(
        app,
        json!({ "action": "create", "actor": "org", "data": { "title": "no details" } }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 4001);
}

#[tokio::test]
async fn mutating_action_requires_actor() {
    let (app, _) = create_test_app();
    let (status, body) = post_action(
        app,
        json!({ "action": "join_request", "data": { "activityId": "x" } }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 4001);
}

#[tokio::test]
async fn unknown_actor_is_4004() {
    let (app, _) = create_test_app();
    let (_, body) = post_action(app.clone(), create_payload()).await;
    let activity_id = body["data"]["activityId"].as_str().unwrap().to_string();

    let (status, body) = post_action(
        app,
        json!({
            "action": "join_request",
            "actor": "ghost",
            "data": { "activityId": activity_id }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 4004);
}

#[tokio::test]
async fn missing_activity_is_4005() {
    let (app, _) = create_test_app();
    let (status, body) = post_action(
        app,
        json!({
            "action": "detail",
            "actor": "org",
            "data": { "activityId": "does-not-exist" }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 4005);
}

#[tokio::test]
async fn non_organizer_approval_is_4003() {
    let (app, _) = create_test_app();
    let (_, body) = post_action(app.clone(), create_payload()).await;
    let activity_id = body["data"]["activityId"].as_str().unwrap().to_string();

    let (_, body) = post_action(
        app.clone(),
        json!({
            "action": "join_request",
            "actor": "alice",
            "data": { "activityId": activity_id }
        }),
    )
    .await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["userStatus"], "requested");

    let (status, body) = post_action(
        app,
        json!({
            "action": "approve_request",
            "actor": "bob",
            "data": { "activityId": activity_id, "userId": "alice" }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 4003);
}

#[tokio::test]
async fn duplicate_join_request_is_4002() {
    let (app, _) = create_test_app();
    let (_, body) = post_action(app.clone(), create_payload()).await;
    let activity_id = body["data"]["activityId"].as_str().unwrap().to_string();

    let join = json!({
        "action": "join_request",
        "actor": "alice",
        "data": { "activityId": activity_id }
    });
    let (_, body) = post_action(app.clone(), join.clone()).await;
    assert_eq!(body["code"], 0);

    let (status, body) = post_action(app, join).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 4002);
}

#[tokio::test]
async fn full_workflow_through_the_envelope() {
    let (app, _) = create_test_app();
    let (_, body) = post_action(app.clone(), create_payload()).await;
    let activity_id = body["data"]["activityId"].as_str().unwrap().to_string();

    for (actor, action, extra) in [
        ("alice", "join_request", None),
        ("org", "approve_request", Some("alice")),
        ("alice", "leave_activity", None),
        ("org", "cancel_activity", None),
    ] {
        let mut data = json!({ "activityId": activity_id });
        if let Some(user) = extra {
            data["userId"] = json!(user);
        }
        let (status, body) = post_action(
            app.clone(),
            json!({ "action": action, "actor": actor, "data": data }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{action} failed: {body}");
        assert_eq!(body["code"], 0);
    }

    // Frozen after cancellation
    let (status, body) = post_action(
        app,
        json!({
            "action": "join_request",
            "actor": "bob",
            "data": { "activityId": activity_id }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 4002);
}

#[tokio::test]
async fn list_action_pages_through_the_envelope() {
    let (app, _) = create_test_app();
    for _ in 0..3 {
        let (_, body) = post_action(app.clone(), create_payload()).await;
        assert_eq!(body["code"], 0);
    }

    let (status, body) = post_action(
        app,
        json!({
            "action": "list",
            "actor": "alice",
            "data": { "page": 1, "pageSize": 2 }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["activities"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["hasMore"], true);
}
