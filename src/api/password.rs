// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password endpoints, gated by the verification windows.

use axum::{extract::State, Json};

use super::run_blocking;
use crate::{
    auth::Auth,
    error::ApiError,
    models::{PasswordCheckResponse, PasswordRequest},
    state::AppState,
    verification::StatusView,
};

/// Set the first password. Only allowed inside the window opened by the
/// initial face verification.
#[utoipa::path(
    post,
    path = "/v1/auth/set-password",
    request_body = PasswordRequest,
    tag = "Password",
    security(("bearer" = [])),
    responses(
        (status = 200, body = StatusView),
        (status = 400, description = "Password too short"),
        (status = 409, description = "Password setup window is not open"),
    )
)]
pub async fn set_password(
    Auth(wallet): Auth,
    State(state): State<AppState>,
    Json(request): Json<PasswordRequest>,
) -> Result<Json<StatusView>, ApiError> {
    let service = state.verification.clone();
    let status = run_blocking(move || service.set_password(&wallet, &request.password)).await?;
    Ok(Json(status))
}

/// Replace the password. Only allowed inside the window opened by face
/// re-verification.
#[utoipa::path(
    post,
    path = "/v1/auth/reset-password",
    request_body = PasswordRequest,
    tag = "Password",
    security(("bearer" = [])),
    responses(
        (status = 200, body = StatusView),
        (status = 400, description = "Password too short"),
        (status = 409, description = "Password reset window is not open"),
    )
)]
pub async fn reset_password(
    Auth(wallet): Auth,
    State(state): State<AppState>,
    Json(request): Json<PasswordRequest>,
) -> Result<Json<StatusView>, ApiError> {
    let service = state.verification.clone();
    let status = run_blocking(move || service.reset_password(&wallet, &request.password)).await?;
    Ok(Json(status))
}

#[utoipa::path(
    post,
    path = "/v1/auth/verify-password",
    request_body = PasswordRequest,
    tag = "Password",
    security(("bearer" = [])),
    responses(
        (status = 200, body = PasswordCheckResponse),
        (status = 401, description = "Invalid password"),
        (status = 404, description = "Password not set"),
    )
)]
pub async fn verify_password(
    Auth(wallet): Auth,
    State(state): State<AppState>,
    Json(request): Json<PasswordRequest>,
) -> Result<Json<PasswordCheckResponse>, ApiError> {
    let service = state.verification.clone();
    run_blocking(move || service.verify_password(&wallet, &request.password)).await?;
    Ok(Json(PasswordCheckResponse { valid: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WalletIdentity;
    use crate::state::test_state;
    use crate::verification::GateSection;
    use alloy::primitives::Address;
    use axum::http::StatusCode;

    fn wallet() -> WalletIdentity {
        WalletIdentity::from(Address::repeat_byte(0x07))
    }

    fn body(password: &str) -> Json<PasswordRequest> {
        Json(PasswordRequest {
            password: password.to_string(),
        })
    }

    async fn open_setup_window(state: &AppState) {
        let service = state.verification.clone();
        let sample = crate::biometrics::BiometricSample {
            embedding: crate::biometrics::FaceEmbedding::new(vec![0.1, 0.2, 0.3]).unwrap(),
            liveness_score: 0.97,
        };
        service.face_verify(&wallet(), &sample).unwrap();
    }

    #[tokio::test]
    async fn set_password_outside_window_conflicts() {
        let (state, _dir) = test_state();
        let err = set_password(Auth(wallet()), State(state), body("hunter22"))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn set_then_verify_password() {
        let (state, _dir) = test_state();
        open_setup_window(&state).await;

        let Json(status) = set_password(Auth(wallet()), State(state.clone()), body("hunter22"))
            .await
            .unwrap();
        assert_eq!(status.section, GateSection::NeedsReVerification);
        assert!(status.status.has_password);

        let Json(check) = verify_password(Auth(wallet()), State(state.clone()), body("hunter22"))
            .await
            .unwrap();
        assert!(check.valid);

        let err = verify_password(Auth(wallet()), State(state), body("hunter23"))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let (state, _dir) = test_state();
        open_setup_window(&state).await;
        let err = set_password(Auth(wallet()), State(state), body("abc"))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn verify_without_password_is_not_found() {
        let (state, _dir) = test_state();
        let err = verify_password(Auth(wallet()), State(state), body("anything"))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Password not set");
    }

    #[tokio::test]
    async fn reset_requires_reverification() {
        let (state, _dir) = test_state();
        open_setup_window(&state).await;
        set_password(Auth(wallet()), State(state.clone()), body("hunter22"))
            .await
            .unwrap();

        let err = reset_password(Auth(wallet()), State(state), body("new-secret"))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }
}
