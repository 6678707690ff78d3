// SPDX-License-Identifier: MIT

//! The uniform action endpoint.
//!
//! All engine operations share one contract:
//! request `{ action, actor, data }`, response
//! `{ code, message, data, timestamp }`. Success is code 0; failures carry
//! the stable codes from [`crate::error::codes`].

use crate::error::{codes, AppError, Result};
use crate::models::ActivityStatus;
use crate::services::registry::{CreateActivity, ListFilters, Paging};
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/activities", post(handle_action))
}

/// Uniform request envelope.
#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    /// Acting user id; optional only for the anonymous read actions
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(default)]
    pub data: Value,
}

/// Uniform response envelope.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub code: u32,
    pub message: String,
    pub data: Option<Value>,
    pub timestamp: i64,
}

fn ok(data: impl Serialize) -> Result<Json<Envelope>> {
    let data = serde_json::to_value(data).map_err(|e| AppError::Internal(e.into()))?;
    Ok(Json(Envelope {
        code: codes::OK,
        message: "success".to_string(),
        data: Some(data),
        timestamp: chrono::Utc::now().timestamp_millis(),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityIdData {
    activity_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityUserData {
    activity_id: String,
    user_id: String,
}

#[derive(Deserialize)]
struct ListData {
    #[serde(flatten)]
    filters: ListFilters,
    #[serde(flatten)]
    paging: Paging,
}

#[derive(Deserialize)]
struct MyActivitiesData {
    #[serde(default)]
    status: Option<String>,
    #[serde(flatten)]
    paging: Paging,
}

fn parse<T: serde::de::DeserializeOwned>(data: Value) -> Result<T> {
    serde_json::from_value(data).map_err(|e| AppError::Validation(e.to_string()))
}

fn require_actor(actor: &Option<String>) -> Result<&str> {
    actor
        .as_deref()
        .filter(|a| !a.is_empty())
        .ok_or_else(|| AppError::Validation("actor is required".to_string()))
}

/// Optional status filter: absent or "all" means no restriction.
fn parse_status_filter(status: Option<String>) -> Result<Option<ActivityStatus>> {
    match status.as_deref() {
        None | Some("all") => Ok(None),
        Some(s) => serde_json::from_value(Value::String(s.to_string()))
            .map(Some)
            .map_err(|_| AppError::Validation(format!("unknown status: {s}"))),
    }
}

async fn handle_action(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<Envelope>> {
    let actor = request.actor;
    match request.action.as_str() {
        "create" => {
            let actor = require_actor(&actor)?;
            let spec: CreateActivity = parse(request.data)?;
            let activity = state.registry.create(actor, spec).await?;
            ok(serde_json::json!({
                "activityId": activity.id,
                "activity": activity,
            }))
        }
        "detail" => {
            let data: ActivityIdData = parse(request.data)?;
            let detail = state
                .registry
                .detail(actor.as_deref(), &data.activity_id)
                .await?;
            ok(serde_json::json!({ "activity": detail }))
        }
        "list" => {
            let data: ListData = parse(request.data)?;
            let page = state
                .registry
                .list(actor.as_deref(), data.filters, data.paging)
                .await?;
            ok(page)
        }
        "recommend" => {
            let actor = require_actor(&actor)?;
            let paging: Paging = parse(request.data)?;
            let page = state.registry.recommend(actor, paging).await?;
            ok(page)
        }
        "my_activities" => {
            let actor = require_actor(&actor)?;
            let data: MyActivitiesData = parse(request.data)?;
            let status = parse_status_filter(data.status)?;
            let page = state
                .registry
                .my_activities(actor, status, data.paging)
                .await?;
            ok(page)
        }
        "my_joined_activities" => {
            let actor = require_actor(&actor)?;
            let data: MyActivitiesData = parse(request.data)?;
            let status = parse_status_filter(data.status)?;
            let page = state
                .registry
                .my_joined_activities(actor, status, data.paging)
                .await?;
            ok(page)
        }
        "join_request" => {
            let actor = require_actor(&actor)?;
            let data: ActivityIdData = parse(request.data)?;
            let status = state
                .workflow
                .request_join(actor, &data.activity_id)
                .await?;
            ok(serde_json::json!({ "userStatus": status }))
        }
        "approve_request" => {
            let actor = require_actor(&actor)?;
            let data: ActivityUserData = parse(request.data)?;
            state
                .workflow
                .approve(actor, &data.activity_id, &data.user_id)
                .await?;
            ok(serde_json::json!({ "approved": true }))
        }
        "reject_request" => {
            let actor = require_actor(&actor)?;
            let data: ActivityUserData = parse(request.data)?;
            state
                .workflow
                .reject(actor, &data.activity_id, &data.user_id)
                .await?;
            ok(serde_json::json!({ "rejected": true }))
        }
        "leave_activity" => {
            let actor = require_actor(&actor)?;
            let data: ActivityIdData = parse(request.data)?;
            let status = state.workflow.leave(actor, &data.activity_id).await?;
            ok(serde_json::json!({ "userStatus": status }))
        }
        "cancel_activity" => {
            let actor = require_actor(&actor)?;
            let data: ActivityIdData = parse(request.data)?;
            state.workflow.cancel(actor, &data.activity_id).await?;
            ok(serde_json::json!({ "cancelled": true }))
        }
        other => Err(AppError::Validation(format!("unsupported action: {other}"))),
    }
}
