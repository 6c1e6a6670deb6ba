// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the authenticated wallet.
//!
//! Use the `Auth` extractor in handlers to require a wallet session:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(wallet): Auth) -> impl IntoResponse {
//!     // wallet is the WalletIdentity the session token was issued to
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
};

use super::token::SESSION_COOKIE;
use super::AuthError;
use crate::models::WalletIdentity;
use crate::state::AppState;

/// Extractor for the authenticated wallet.
///
/// Accepts `Authorization: Bearer <token>` first, then the session cookie.
/// Handlers act only on this wallet; request bodies never name the target.
pub struct Auth(pub WalletIdentity);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(wallet) = parts.extensions.get::<WalletIdentity>().copied() {
            return Ok(Auth(wallet));
        }

        let token = match parts.headers.get(AUTHORIZATION) {
            Some(header) => header
                .to_str()
                .map_err(|_| AuthError::InvalidAuthHeader)?
                .strip_prefix("Bearer ")
                .ok_or(AuthError::InvalidAuthHeader)?
                .trim()
                .to_string(),
            None => cookie_token(parts).ok_or(AuthError::MissingToken)?,
        };

        let wallet = state.tokens.verify(&token)?;
        parts.extensions.insert(wallet);
        Ok(Auth(wallet))
    }
}

fn cookie_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_state;
    use alloy::primitives::Address;
    use axum::http::Request;

    fn parts(header: Option<(&str, String)>) -> Parts {
        let mut builder = Request::builder().uri("/v1/auth/status");
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn wallet() -> WalletIdentity {
        WalletIdentity::from(Address::repeat_byte(0x11))
    }

    #[tokio::test]
    async fn requires_token() {
        let (state, _dir) = test_state();
        let result = Auth::from_request_parts(&mut parts(None), &state).await;
        assert!(matches!(result, Err(AuthError::MissingToken)));
    }

    #[tokio::test]
    async fn accepts_bearer_token() {
        let (state, _dir) = test_state();
        let token = state.tokens.issue(&wallet()).unwrap().token;
        let mut parts = parts(Some(("Authorization", format!("Bearer {token}"))));

        let Auth(authenticated) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(authenticated, wallet());
    }

    #[tokio::test]
    async fn accepts_session_cookie() {
        let (state, _dir) = test_state();
        let token = state.tokens.issue(&wallet()).unwrap().token;
        let mut parts = parts(Some(("Cookie", format!("theme=dark; {SESSION_COOKIE}={token}"))));

        let Auth(authenticated) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(authenticated, wallet());
    }

    #[tokio::test]
    async fn rejects_non_bearer_scheme() {
        let (state, _dir) = test_state();
        let mut parts = parts(Some(("Authorization", "Basic abc".to_string())));
        assert!(matches!(
            Auth::from_request_parts(&mut parts, &state).await,
            Err(AuthError::InvalidAuthHeader)
        ));
    }

    #[tokio::test]
    async fn rejects_forged_token() {
        let (state, _dir) = test_state();
        let forged = crate::auth::TokenIssuer::new(b"someone-else")
            .issue(&wallet())
            .unwrap()
            .token;
        let mut parts = parts(Some(("Authorization", format!("Bearer {forged}"))));
        assert!(matches!(
            Auth::from_request_parts(&mut parts, &state).await,
            Err(AuthError::InvalidTokenSignature)
        ));
    }
}
