// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type shared by the ETL pipeline and the webhook routes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Token exchange with the Strava OAuth endpoint failed.
    #[error("Token exchange failed (HTTP {status}): {body}")]
    Auth { status: u16, body: String },

    /// Non-2xx response from the list or get activity endpoints.
    #[error("Strava API error (HTTP {status}): {body}")]
    Fetch { status: u16, body: String },

    #[error("Activity not found: {0}")]
    NotFound(i64),

    /// A required field was missing while normalizing an activity.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Database write or connection failure.
    #[error("Database error: {0}")]
    Load(String),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the error came from talking to Strava (auth, fetch, transport).
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AppError::Auth { .. }
                | AppError::Fetch { .. }
                | AppError::NotFound(_)
                | AppError::Transport(_)
        )
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Load(err.to_string())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::NotFound(id) => (
                StatusCode::NOT_FOUND,
                "not_found",
                Some(format!("activity {}", id)),
            ),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Auth { status, .. } => (
                StatusCode::BAD_GATEWAY,
                "strava_auth_error",
                Some(format!("HTTP {}", status)),
            ),
            AppError::Fetch { status, .. } => (
                StatusCode::BAD_GATEWAY,
                "strava_error",
                Some(format!("HTTP {}", status)),
            ),
            AppError::Transport(err) => {
                tracing::error!(error = %err, "Strava transport error");
                (StatusCode::BAD_GATEWAY, "strava_error", None)
            }
            AppError::Schema(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "schema_error",
                Some(msg.clone()),
            ),
            AppError::Load(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias used across the crate
pub type Result<T> = std::result::Result<T, AppError>;
