// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet login.

use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, HeaderValue},
    Json,
};

use crate::{
    auth::{session_cookie, verify_signer, AuthError},
    models::{LoginRequest, LoginResponse, WalletIdentity},
    state::AppState,
};

/// Exchange a wallet signature for a session token.
///
/// The token is returned in the body and set as the `paaskeeper_token`
/// httpOnly cookie.
#[utoipa::path(
    post,
    path = "/v1/auth/verify",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Signature verified", body = LoginResponse),
        (status = 400, description = "Malformed address or signature"),
        (status = 401, description = "Signature does not match the address"),
    )
)]
pub async fn verify_wallet(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<LoginResponse>), AuthError> {
    let wallet = WalletIdentity::parse(&request.address)
        .map_err(|e| AuthError::InvalidWalletAddress(e.0))?;

    if let Err(e) = verify_signer(&wallet, &request.message, &request.signature) {
        tracing::warn!(wallet = %wallet, error = %e, "Wallet login rejected");
        return Err(e);
    }

    let issued = state.tokens.issue(&wallet)?;
    let cookie = HeaderValue::from_str(&session_cookie(&issued.token, state.cookie_secure))
        .map_err(|e| AuthError::InternalError(e.to_string()))?;
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);

    tracing::info!(wallet = %wallet, "Wallet logged in");
    Ok((
        headers,
        Json(LoginResponse {
            success: true,
            wallet_address: wallet,
            token: issued.token,
            expires_at: issued.expires_at,
        }),
    ))
}
