// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Threshold custody network client interface.

use std::future::Future;

use super::challenge::SignedChallenge;
use super::conditions::AccessCondition;
use super::credential::SessionCredential;
use super::payload::EncryptedPayload;

/// Errors reported by the custody network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CustodyError {
    #[error("custody network unreachable: {0}")]
    Unreachable(String),

    #[error("custody network client is not connected")]
    NotConnected,

    #[error("session credential expired")]
    CredentialExpired,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("access condition does not match the ciphertext")]
    ConditionMismatch,

    #[error("unsupported access condition: {0}")]
    InvalidCondition(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("request timed out: {0}")]
    Timeout(String),
}

impl CustodyError {
    /// Failures a fresh session credential could fix.
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            CustodyError::CredentialExpired | CustodyError::Unauthorized(_)
        )
    }
}

/// Operations the session manager needs from the custody network.
///
/// Implementations:
/// - [`super::dev_node::LocalCustodyNode`]: in-process network for development and tests
pub trait KeyCustodyClient: Send + Sync {
    /// Establish the network connection.
    fn connect(&self) -> impl Future<Output = Result<(), CustodyError>> + Send;

    /// Latest freshness anchor (block hash) to use as the challenge nonce.
    fn latest_freshness_anchor(&self) -> impl Future<Output = Result<String, CustodyError>> + Send;

    /// Exchange a signed challenge for a session credential.
    fn session_credential(
        &self,
        signed: &SignedChallenge,
    ) -> impl Future<Output = Result<SessionCredential, CustodyError>> + Send;

    /// Encrypt `plaintext` so it can only be decrypted under `condition`.
    ///
    /// Encryption needs no session credential.
    fn encrypt_string(
        &self,
        plaintext: &str,
        condition: &AccessCondition,
    ) -> impl Future<Output = Result<EncryptedPayload, CustodyError>> + Send;

    fn decrypt_to_string(
        &self,
        payload: &EncryptedPayload,
        condition: &AccessCondition,
        credential: &SessionCredential,
    ) -> impl Future<Output = Result<String, CustodyError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_credential_failures_are_authorization_class() {
        assert!(CustodyError::CredentialExpired.is_authorization());
        assert!(CustodyError::Unauthorized("bad signature".into()).is_authorization());
        assert!(!CustodyError::Timeout("30s".into()).is_authorization());
        assert!(!CustodyError::ConditionMismatch.is_authorization());
        assert!(!CustodyError::MalformedPayload("bad base64".into()).is_authorization());
        assert!(!CustodyError::Unreachable("dns".into()).is_authorization());
    }
}
