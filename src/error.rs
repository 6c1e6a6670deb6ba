// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::biometrics::BiometricError;
use crate::verification::GateError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    /// Face similarity score, reported when a face did not match.
    pub similarity: Option<f64>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    similarity: Option<f64>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            similarity: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn with_similarity(mut self, score: f64) -> Self {
        self.similarity = Some(score);
        self
    }
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        match &err {
            GateError::Biometric(bio) => match bio {
                BiometricError::LivenessFailed { .. } => Self::bad_request(err.to_string()),
                BiometricError::SimilarityBelowThreshold { score } => {
                    Self::unauthorized(err.to_string()).with_similarity(*score)
                }
                BiometricError::DimensionMismatch { .. } | BiometricError::InvalidEmbedding(_) => {
                    Self::unprocessable(err.to_string())
                }
                BiometricError::CameraUnavailable(_)
                | BiometricError::NoFaceDetected
                | BiometricError::CaptureCancelled => Self::bad_request(err.to_string()),
            },
            GateError::SectionLocked { .. } => Self::conflict(err.to_string()),
            GateError::NotEnrolled => Self::not_found("No face enrolled for this wallet"),
            GateError::PasswordNotSet => Self::not_found("Password not set"),
            GateError::InvalidPassword => Self::unauthorized("Invalid password"),
            GateError::PasswordTooShort(_) => Self::bad_request(err.to_string()),
            GateError::Hashing(_) | GateError::Storage(_) => {
                tracing::error!(error = %err, "Verification storage failure");
                Self::internal("Internal server error")
            }
            GateError::Remote { .. } | GateError::Transport(_) => {
                Self::new(StatusCode::BAD_GATEWAY, err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            similarity: self.similarity,
        });
        (self.status, body).into_response()
    }
}
