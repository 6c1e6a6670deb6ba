// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet signature verification (EIP-191 personal messages).

use std::str::FromStr;

use alloy::primitives::Signature;

use super::AuthError;
use crate::models::WalletIdentity;

/// Recover the wallet that signed `message`.
pub fn recover_signer(message: &str, signature: &str) -> Result<WalletIdentity, AuthError> {
    let signature = Signature::from_str(signature.trim())
        .map_err(|e| AuthError::InvalidWalletSignature(e.to_string()))?;
    let address = signature
        .recover_address_from_msg(message.as_bytes())
        .map_err(|e| AuthError::InvalidWalletSignature(e.to_string()))?;
    Ok(WalletIdentity::from(address))
}

/// Check that `claimed` signed `message`. Address comparison is case-insensitive.
pub fn verify_signer(
    claimed: &WalletIdentity,
    message: &str,
    signature: &str,
) -> Result<(), AuthError> {
    let recovered = recover_signer(message, signature)?;
    if &recovered != claimed {
        return Err(AuthError::SignerMismatch {
            claimed: claimed.to_string(),
            recovered: recovered.to_string(),
        });
    }
    Ok(())
}
