// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::path::PathBuf;

/// Message shown to members when a track operation fails server-side.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong, please try again";

/// Errors from reading, normalizing and replacing track files.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("Failed to parse GPX: {0}")]
    Parse(String),

    #[error("GPX file contains no track points")]
    EmptyTrack,

    #[error("Track file not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("Track file I/O error on {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    #[error("Temp file {} still contended after {attempts} attempts", .path.display())]
    Contention { path: PathBuf, attempts: u32 },

    #[error("Failed to write GPX: {0}")]
    Serialize(String),

    #[error("Track file replaced but stats not saved for route {route_id}: {message}")]
    Persist { route_id: u64, message: String },
}

impl TrackError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        TrackError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Whether the uploaded content itself was bad (as opposed to a server fault).
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, TrackError::Parse(_) | TrackError::EmptyTrack)
    }

    /// Whether the new track file is already in place despite the error.
    pub fn file_replaced(&self) -> bool {
        matches!(self, TrackError::Persist { .. })
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Not allowed: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Upload exceeds the {0} byte limit")]
    PayloadTooLarge(usize),

    #[error("Track error: {0}")]
    Track(#[from] TrackError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
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
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", Some(msg.clone())),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::PayloadTooLarge(limit) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                Some(format!("Uploads are limited to {} bytes", limit)),
            ),
            AppError::Track(err) if err.is_invalid_input() => {
                (StatusCode::BAD_REQUEST, "invalid_gpx", Some(err.to_string()))
            }
            AppError::Track(err) => {
                match err {
                    TrackError::Contention { .. } => {
                        tracing::error!(error = %err, "Track storage contention")
                    }
                    _ => tracing::error!(error = %err, "Track processing failed"),
                }
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "track_error",
                    Some(GENERIC_FAILURE_MESSAGE.to_string()),
                )
            }
            AppError::Database(msg) => {
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

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
