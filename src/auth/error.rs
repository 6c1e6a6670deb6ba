// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
///
/// Covers both halves of wallet login: verifying the signed login message,
/// and verifying the session token on later requests.
#[derive(Debug)]
pub enum AuthError {
    /// Neither a bearer header nor a session cookie was sent
    MissingToken,
    /// Invalid authorization header format
    InvalidAuthHeader,
    /// Token is malformed
    MalformedToken,
    /// Token signature is invalid
    InvalidTokenSignature,
    /// Token has expired
    TokenExpired,
    /// The claimed wallet address is not a 0x-prefixed 20-byte hex string
    InvalidWalletAddress(String),
    /// The wallet signature could not be parsed or recovered
    InvalidWalletSignature(String),
    /// The wallet signature recovers to a different address than claimed
    SignerMismatch { claimed: String, recovered: String },
    /// Internal error
    InternalError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidTokenSignature => "invalid_token_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidWalletAddress(_) => "invalid_wallet_address",
            AuthError::InvalidWalletSignature(_) => "invalid_wallet_signature",
            AuthError::SignerMismatch { .. } => "signature_mismatch",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken
            | AuthError::InvalidAuthHeader
            | AuthError::MalformedToken
            | AuthError::InvalidTokenSignature
            | AuthError::TokenExpired
            | AuthError::SignerMismatch { .. } => StatusCode::UNAUTHORIZED,
            AuthError::InvalidWalletAddress(_) | AuthError::InvalidWalletSignature(_) => {
                StatusCode::BAD_REQUEST
            }
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => {
                write!(f, "Authentication required (bearer token or session cookie)")
            }
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::MalformedToken => write!(f, "Token is malformed"),
            AuthError::InvalidTokenSignature => write!(f, "Token signature is invalid"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::InvalidWalletAddress(msg) => write!(f, "Invalid wallet address: {msg}"),
            AuthError::InvalidWalletSignature(msg) => write!(f, "Invalid wallet signature: {msg}"),
            AuthError::SignerMismatch { claimed, recovered } => write!(
                f,
                "Signature was produced by {recovered}, not {claimed}"
            ),
            AuthError::InternalError(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
