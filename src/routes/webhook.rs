// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook routes for Strava events.

use crate::error::AppError;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Json, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Webhook routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/webhook", get(verify).post(handle_event))
}

/// Strava webhook verification query params.
#[derive(Deserialize)]
struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
}

/// Verification response.
#[derive(Serialize)]
struct VerifyResponse {
    #[serde(rename = "hub.challenge")]
    challenge: String,
}

/// Verify webhook subscription (GET).
async fn verify(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let (Some(mode), Some(challenge), Some(verify_token)) =
        (params.mode, params.challenge, params.verify_token)
    else {
        return AppError::BadRequest("Missing required hub.* parameters".to_string())
            .into_response();
    };

    let token_matches = state
        .config
        .webhook_verify_token
        .as_deref()
        .is_some_and(|expected| bool::from(verify_token.as_bytes().ct_eq(expected.as_bytes())));

    if token_matches {
        tracing::info!(mode = %mode, "Webhook subscription verified");
        (StatusCode::OK, Json(VerifyResponse { challenge })).into_response()
    } else {
        tracing::warn!(mode = %mode, "Webhook verification failed: invalid token");
        (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({ "error": "forbidden" })),
        )
            .into_response()
    }
}

/// Strava webhook event payload.
#[derive(Deserialize, Debug)]
struct WebhookEvent {
    object_type: String, // "activity" or "athlete"
    object_id: i64,
    aspect_type: String, // "create", "update", "delete"
    #[serde(default)]
    owner_id: Option<i64>,
    #[serde(default)]
    subscription_id: Option<i64>,
    #[serde(default)]
    updates: Option<serde_json::Value>,
}

/// Handle incoming webhook events (POST).
///
/// Always answers 200 `{}`: Strava only needs an acknowledgement, and the
/// actual work happens on the sync worker.
async fn handle_event(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
    let ack = (StatusCode::OK, Json(serde_json::json!({})));

    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!(
                error = %e,
                body = %String::from_utf8_lossy(&body),
                "Failed to parse webhook event"
            );
            return ack;
        }
    };

    tracing::info!(
        object_type = %event.object_type,
        object_id = event.object_id,
        aspect_type = %event.aspect_type,
        owner_id = ?event.owner_id,
        subscription_id = ?event.subscription_id,
        updates = ?event.updates,
        "Webhook event received"
    );

    let queued = match (event.object_type.as_str(), event.aspect_type.as_str()) {
        ("activity", "create") | ("activity", "update") => {
            Some(state.tasks.queue_activity(event.object_id))
        }
        ("activity", "delete") => Some(state.tasks.queue_delete(event.object_id)),
        _ => {
            tracing::debug!(
                object_type = %event.object_type,
                aspect_type = %event.aspect_type,
                "Ignoring unhandled event type"
            );
            None
        }
    };

    if let Some(Err(e)) = queued {
        tracing::error!(error = %e, activity_id = event.object_id, "Failed to queue activity");
    }

    ack
}
