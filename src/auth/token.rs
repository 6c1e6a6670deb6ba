// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session tokens issued after a successful wallet login.
//!
//! Tokens are HS256 JWTs carrying the lowercase wallet address. They are
//! returned in the login response body and as an `HttpOnly` cookie.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthError;
use crate::models::WalletIdentity;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "paaskeeper_token";

/// Token and cookie lifetime (one day).
pub const TOKEN_LIFETIME_SECS: i64 = 86_400;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Lowercase `0x` wallet address
    pub address: String,
    pub iat: i64,
    pub exp: i64,
    /// Token ID
    pub jti: String,
}

/// A freshly issued token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies session tokens with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            lifetime: Duration::seconds(TOKEN_LIFETIME_SECS),
        }
    }

    pub fn issue(&self, wallet: &WalletIdentity) -> Result<IssuedToken, AuthError> {
        self.issue_at(wallet, Utc::now())
    }

    pub fn issue_at(
        &self,
        wallet: &WalletIdentity,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let expires_at = now + self.lifetime;
        let claims = SessionClaims {
            address: wallet.canonical(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::InternalError(e.to_string()))?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Verify a token and return the wallet it was issued to.
    pub fn verify(&self, token: &str) -> Result<WalletIdentity, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "iat"]);

        let data = decode::<SessionClaims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AuthError::InvalidTokenSignature
                }
                _ => AuthError::MalformedToken,
            }
        })?;

        WalletIdentity::parse(&data.claims.address).map_err(|_| AuthError::MalformedToken)
    }
}

/// `Set-Cookie` value carrying the session token.
pub fn session_cookie(token: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; HttpOnly; Path=/; Max-Age={TOKEN_LIFETIME_SECS}; SameSite=Lax"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;

    fn wallet() -> WalletIdentity {
        WalletIdentity::from(Address::repeat_byte(0xAB))
    }

    #[test]
    fn issued_token_verifies() {
        let issuer = TokenIssuer::new(b"test-secret");
        let issued = issuer.issue(&wallet()).unwrap();
        assert_eq!(issuer.verify(&issued.token).unwrap(), wallet());
    }

    #[test]
    fn claims_carry_lowercase_address_and_one_day_expiry() {
        let issuer = TokenIssuer::new(b"test-secret");
        let now = Utc::now();
        let issued = issuer.issue_at(&wallet(), now).unwrap();

        let claims = jsonwebtoken::dangerous::insecure_decode::<SessionClaims>(&issued.token)
            .unwrap()
            .claims;
        assert_eq!(claims.address, "0xabababababababababababababababababababab");
        assert_eq!(claims.exp - claims.iat, TOKEN_LIFETIME_SECS);
        assert_eq!(claims.exp, issued.expires_at.timestamp());
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let issued = TokenIssuer::new(b"secret-a").issue(&wallet()).unwrap();
        assert!(matches!(
            TokenIssuer::new(b"secret-b").verify(&issued.token),
            Err(AuthError::InvalidTokenSignature)
        ));
    }

    #[test]
    fn rejects_expired_token() {
        let issuer = TokenIssuer::new(b"test-secret");
        let issued = issuer
            .issue_at(&wallet(), Utc::now() - Duration::days(2))
            .unwrap();
        assert!(matches!(issuer.verify(&issued.token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn rejects_garbage() {
        let issuer = TokenIssuer::new(b"test-secret");
        assert!(matches!(issuer.verify("not.a.jwt"), Err(AuthError::MalformedToken)));
    }

    #[test]
    fn cookie_attributes() {
        assert_eq!(
            session_cookie("abc", false),
            "paaskeeper_token=abc; HttpOnly; Path=/; Max-Age=86400; SameSite=Lax"
        );
        assert!(session_cookie("abc", true).ends_with("; Secure"));
    }
}
