// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    error::ApiError,
    models::{
        FaceReverifyRequest, FaceVerifyRequest, LoginRequest, LoginResponse,
        PasswordCheckResponse, PasswordRequest,
    },
    state::AppState,
    verification::{GateError, GateSection, StatusView, VerificationStatus, VerifyOutcome},
};

pub mod health;
pub mod password;
pub mod session;
pub mod verification;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/auth/verify", post(session::verify_wallet))
        .route("/auth/status", get(verification::get_status))
        .route("/auth/face-verify", post(verification::face_verify))
        .route("/auth/face-reverify", post(verification::face_reverify))
        .route("/auth/set-password", post(password::set_password))
        .route("/auth/reset-password", post(password::reset_password))
        .route("/auth/verify-password", post(password::verify_password))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Run a verification operation (redb transaction, argon2) on the blocking pool.
pub(crate) async fn run_blocking<T, F>(op: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, GateError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Verification task failed");
            ApiError::internal("Internal server error")
        })?
        .map_err(ApiError::from)
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        session::verify_wallet,
        verification::get_status,
        verification::face_verify,
        verification::face_reverify,
        password::set_password,
        password::reset_password,
        password::verify_password
    ),
    components(
        schemas(
            LoginRequest,
            LoginResponse,
            FaceVerifyRequest,
            FaceReverifyRequest,
            PasswordRequest,
            PasswordCheckResponse,
            VerificationStatus,
            GateSection,
            StatusView,
            VerifyOutcome,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Auth", description = "Wallet-signature login"),
        (name = "Verification", description = "Face verification gate"),
        (name = "Password", description = "Gated password setup and reset")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_state;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let (state, _dir) = test_state();
        // Ensure the router can be converted into a service without panicking.
        let _ = router(state).into_make_service();
    }

    #[test]
    fn openapi_lists_auth_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/v1/auth/verify",
            "/v1/auth/status",
            "/v1/auth/face-verify",
            "/v1/auth/face-reverify",
            "/v1/auth/set-password",
            "/v1/auth/reset-password",
            "/v1/auth/verify-password",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
