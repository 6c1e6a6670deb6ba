// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Shared Data Models
//!
//! ## Wallet Identity
//!
//! The [`WalletIdentity`] newtype wraps an Ethereum-style externally-owned
//! account address (0x-prefixed, 40 hex characters). It is the primary key
//! for every per-user record (verification status, face embedding, password
//! hash, ledger entries).
//!
//! Addresses are parsed once and compared in canonical lowercase form, so
//! `0xABC...` and `0xabc...` name the same wallet.
//!
//! ## Request Bodies
//!
//! Shared by the HTTP handlers and the [`crate::verification::StatusClient`].

use std::fmt;
use std::str::FromStr;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error returned when a string is not a valid EVM address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid wallet address: {0}")]
pub struct InvalidWalletAddress(pub String);

/// Ethereum-compatible wallet address, canonicalized to lowercase.
///
/// # Example
///
/// ```rust,ignore
/// let wallet = WalletIdentity::parse("0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12")?;
/// assert_eq!(wallet.to_string(), "0x742d35cc6634c0532925a3b844bc9e7595f4ab12");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletIdentity(Address);

impl WalletIdentity {
    /// Parse a 0x-prefixed, 42-character hex address (any letter case).
    pub fn parse(raw: &str) -> Result<Self, InvalidWalletAddress> {
        let trimmed = raw.trim();
        if !trimmed.starts_with("0x") && !trimmed.starts_with("0X") {
            return Err(InvalidWalletAddress(format!("{trimmed} (missing 0x prefix)")));
        }
        if trimmed.len() != 42 {
            return Err(InvalidWalletAddress(format!(
                "{trimmed} (expected 42 characters, got {})",
                trimmed.len()
            )));
        }
        let address = Address::from_str(&trimmed[2..])
            .map_err(|e| InvalidWalletAddress(format!("{trimmed} ({e})")))?;
        Ok(Self(address))
    }

    /// The underlying 20-byte address.
    pub fn address(&self) -> Address {
        self.0
    }

    /// Canonical lowercase form, used as the storage key.
    pub fn canonical(&self) -> String {
        alloy::hex::encode_prefixed(self.0.as_slice())
    }
}

impl From<Address> for WalletIdentity {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

impl fmt::Display for WalletIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl FromStr for WalletIdentity {
    type Err = InvalidWalletAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WalletIdentity {
    type Error = InvalidWalletAddress;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WalletIdentity> for String {
    fn from(value: WalletIdentity) -> Self {
        value.canonical()
    }
}

// =============================================================================
// Request / Response Bodies
// =============================================================================

/// Wallet login: the wallet's signature over `message`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[schema(example = "0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12")]
    pub address: String,
    pub message: String,
    /// 0x-prefixed 65-byte hex signature.
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    #[schema(value_type = String)]
    pub wallet_address: WalletIdentity,
    /// Session token; also set as an httpOnly cookie.
    pub token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FaceVerifyRequest {
    pub face_embedding: Vec<f64>,
    pub liveness_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FaceReverifyRequest {
    /// Embedding compared against the enrolled face.
    pub current_face_embedding: Vec<f64>,
    /// Embedding stored on success; defaults to `currentFaceEmbedding`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_face_embedding: Option<Vec<f64>>,
    pub liveness_score: f64,
}

#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct PasswordRequest {
    pub password: String,
}

impl fmt::Debug for PasswordRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordRequest").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PasswordCheckResponse {
    pub valid: bool,
}
