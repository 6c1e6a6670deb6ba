// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use super::client::CustodyError;
use crate::wallet::WalletError;

/// Errors surfaced by the encryption session manager.
#[derive(Debug, thiserror::Error)]
pub enum EncryptionError {
    #[error("custody network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("encryption unavailable: not connected to the custody network")]
    EncryptionUnavailable,

    #[error("authorization failed: {0}")]
    AuthorizationFailure(String),

    #[error("decryption failed after retry. Original error: {original}. Retry error: {retry}")]
    RetryExhausted {
        original: Box<EncryptionError>,
        retry: Box<EncryptionError>,
    },

    #[error("access condition does not match the one used at encryption time")]
    ConditionMismatch,

    #[error("invalid access condition: {0}")]
    InvalidCondition(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("wallet error: {0}")]
    Wallet(#[from] WalletError),
}

impl EncryptionError {
    /// True if this failure (or the final retry failure) is a condition mismatch.
    pub fn is_condition_mismatch(&self) -> bool {
        match self {
            EncryptionError::ConditionMismatch => true,
            EncryptionError::RetryExhausted { retry, .. } => retry.is_condition_mismatch(),
            _ => false,
        }
    }
}

impl From<CustodyError> for EncryptionError {
    fn from(err: CustodyError) -> Self {
        match err {
            CustodyError::Unreachable(msg) | CustodyError::Timeout(msg) => {
                EncryptionError::NetworkUnavailable(msg)
            }
            CustodyError::NotConnected => EncryptionError::EncryptionUnavailable,
            CustodyError::CredentialExpired => {
                EncryptionError::AuthorizationFailure("session credential expired".to_string())
            }
            CustodyError::Unauthorized(msg) => EncryptionError::AuthorizationFailure(msg),
            CustodyError::ConditionMismatch => EncryptionError::ConditionMismatch,
            CustodyError::InvalidCondition(msg) => EncryptionError::InvalidCondition(msg),
            CustodyError::MalformedPayload(msg) => EncryptionError::MalformedPayload(msg),
        }
    }
}
