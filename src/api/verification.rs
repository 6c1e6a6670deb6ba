// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verification status and face verification endpoints.

use axum::{extract::State, Json};

use super::run_blocking;
use crate::{
    auth::Auth,
    biometrics::{BiometricError, BiometricSample, FaceEmbedding},
    error::ApiError,
    models::{FaceReverifyRequest, FaceVerifyRequest},
    state::AppState,
    verification::{GateError, StatusView, VerifyOutcome},
};

fn sample(embedding: Vec<f64>, liveness_score: f64) -> Result<BiometricSample, ApiError> {
    Ok(BiometricSample {
        embedding: embedding_from(embedding)?,
        liveness_score,
    })
}

fn embedding_from(values: Vec<f64>) -> Result<FaceEmbedding, ApiError> {
    FaceEmbedding::new(values).map_err(|e: BiometricError| ApiError::from(GateError::from(e)))
}

/// Current verification status of the authenticated wallet.
///
/// Creates the record on first access. Elapsed windows are collapsed and
/// persisted before the status is returned.
#[utoipa::path(
    get,
    path = "/v1/auth/status",
    tag = "Verification",
    security(("bearer" = [])),
    responses(
        (status = 200, body = StatusView),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn get_status(
    Auth(wallet): Auth,
    State(state): State<AppState>,
) -> Result<Json<StatusView>, ApiError> {
    let service = state.verification.clone();
    let status = run_blocking(move || service.status(&wallet)).await?;
    Ok(Json(status))
}

/// Initial face verification. Enrolls the face on first use and opens the
/// 60-second password-setup window.
#[utoipa::path(
    post,
    path = "/v1/auth/face-verify",
    request_body = FaceVerifyRequest,
    tag = "Verification",
    security(("bearer" = [])),
    responses(
        (status = 200, body = VerifyOutcome),
        (status = 400, description = "Liveness check failed"),
        (status = 401, description = "Face does not match the enrolled face"),
        (status = 409, description = "Initial verification is not available in the current section"),
        (status = 422, description = "Malformed embedding"),
    )
)]
pub async fn face_verify(
    Auth(wallet): Auth,
    State(state): State<AppState>,
    Json(request): Json<FaceVerifyRequest>,
) -> Result<Json<VerifyOutcome>, ApiError> {
    let sample = sample(request.face_embedding, request.liveness_score)?;
    let service = state.verification.clone();
    let outcome = run_blocking(move || service.face_verify(&wallet, &sample)).await?;
    Ok(Json(outcome))
}

/// Face re-verification before a password reset. Opens the 60-second
/// reset window and replaces the enrolled face.
#[utoipa::path(
    post,
    path = "/v1/auth/face-reverify",
    request_body = FaceReverifyRequest,
    tag = "Verification",
    security(("bearer" = [])),
    responses(
        (status = 200, body = VerifyOutcome),
        (status = 400, description = "Liveness check failed"),
        (status = 401, description = "Face does not match the enrolled face"),
        (status = 404, description = "No face enrolled"),
        (status = 409, description = "Re-verification is not available in the current section"),
        (status = 422, description = "Malformed embedding"),
    )
)]
pub async fn face_reverify(
    Auth(wallet): Auth,
    State(state): State<AppState>,
    Json(request): Json<FaceReverifyRequest>,
) -> Result<Json<VerifyOutcome>, ApiError> {
    let sample = sample(request.current_face_embedding, request.liveness_score)?;
    let replacement = request.new_face_embedding.map(embedding_from).transpose()?;
    let service = state.verification.clone();
    let outcome = run_blocking(move || {
        service.face_reverify(&wallet, &sample, replacement.as_ref())
    })
    .await?;
    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::password::set_password;
    use crate::models::{PasswordRequest, WalletIdentity};
    use crate::state::test_state;
    use crate::verification::GateSection;
    use alloy::primitives::Address;
    use axum::http::StatusCode;

    const FACE: [f64; 4] = [0.12, 0.34, 0.56, 0.78];

    fn wallet() -> WalletIdentity {
        WalletIdentity::from(Address::repeat_byte(0x42))
    }

    fn verify_request(embedding: &[f64], liveness: f64) -> Json<FaceVerifyRequest> {
        Json(FaceVerifyRequest {
            face_embedding: embedding.to_vec(),
            liveness_score: liveness,
        })
    }

    fn reverify_request(embedding: &[f64]) -> Json<FaceReverifyRequest> {
        Json(FaceReverifyRequest {
            current_face_embedding: embedding.to_vec(),
            new_face_embedding: None,
            liveness_score: 0.95,
        })
    }

    #[tokio::test]
    async fn status_starts_at_initial_verification() {
        let (state, _dir) = test_state();
        let Json(status) = get_status(Auth(wallet()), State(state)).await.unwrap();
        assert_eq!(status.section, GateSection::NeedsInitialVerification);
        assert!(!status.has_face_enrolled);
    }

    #[tokio::test]
    async fn first_verification_enrolls_and_opens_window() {
        let (state, _dir) = test_state();
        let Json(outcome) = face_verify(Auth(wallet()), State(state), verify_request(&FACE, 0.95))
            .await
            .unwrap();

        assert!(outcome.enrolled);
        assert_eq!(outcome.status.section, GateSection::CanSetPassword);
        assert!(outcome.status.status.verification_expiry.is_some());
    }

    #[tokio::test]
    async fn low_liveness_is_rejected_without_mutation() {
        let (state, _dir) = test_state();
        let err = face_verify(Auth(wallet()), State(state.clone()), verify_request(&FACE, 0.5))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let Json(status) = get_status(Auth(wallet()), State(state)).await.unwrap();
        assert!(!status.has_face_enrolled);
        assert_eq!(status.section, GateSection::NeedsInitialVerification);
    }

    #[tokio::test]
    async fn empty_embedding_is_unprocessable() {
        let (state, _dir) = test_state();
        let err = face_verify(Auth(wallet()), State(state), verify_request(&[], 0.95))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn reverify_requires_password_first() {
        let (state, _dir) = test_state();
        face_verify(Auth(wallet()), State(state.clone()), verify_request(&FACE, 0.95))
            .await
            .unwrap();

        let err = face_reverify(Auth(wallet()), State(state), reverify_request(&FACE))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn reverify_after_password_opens_reset_window() {
        let (state, _dir) = test_state();
        face_verify(Auth(wallet()), State(state.clone()), verify_request(&FACE, 0.95))
            .await
            .unwrap();
        set_password(
            Auth(wallet()),
            State(state.clone()),
            Json(PasswordRequest {
                password: "correct horse".into(),
            }),
        )
        .await
        .unwrap();

        let stranger = [0.9, -0.4, 1.7, -2.0];
        let err = face_reverify(Auth(wallet()), State(state.clone()), reverify_request(&stranger))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);

        let Json(outcome) = face_reverify(Auth(wallet()), State(state), reverify_request(&FACE))
            .await
            .unwrap();
        assert_eq!(outcome.status.section, GateSection::CanResetPassword);
        assert!(outcome.similarity.unwrap() >= 0.6);
    }
}
