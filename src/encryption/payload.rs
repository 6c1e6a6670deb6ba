// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Encrypted payload as persisted on the ledger.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Output of an encryption, input of a decryption.
///
/// Serialized as `{"ciphertext": "...", "dataToEncryptHash": "..."}`, which
/// is the exact string stored in a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    pub ciphertext: String,
    #[serde(rename = "dataToEncryptHash")]
    pub data_hash: String,
}

impl EncryptedPayload {
    pub fn to_json(&self) -> String {
        // Two string fields; serialization is infallible.
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Hex SHA-256 of the plaintext, bound to the ciphertext at encryption time.
pub fn hash_plaintext(plaintext: &str) -> String {
    alloy::hex::encode(Sha256::digest(plaintext.as_bytes()))
}
