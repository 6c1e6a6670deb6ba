// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential record codec.
//!
//! A [`CredentialRecord`] is serialized to a compact JSON object
//! `{"website":..,"username":..,"password":..}` before encryption, and the
//! decrypted plaintext is parsed back with the same shape.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("credential field `{0}` must not be empty")]
    EmptyField(&'static str),

    #[error("credential record is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A single website credential as stored in the vault.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub website: String,
    pub username: String,
    pub password: String,
}

impl CredentialRecord {
    pub fn new(
        website: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, CodecError> {
        let record = Self {
            website: website.into(),
            username: username.into(),
            password: password.into(),
        };
        record.validate()?;
        Ok(record)
    }

    fn validate(&self) -> Result<(), CodecError> {
        if self.website.trim().is_empty() {
            return Err(CodecError::EmptyField("website"));
        }
        if self.username.trim().is_empty() {
            return Err(CodecError::EmptyField("username"));
        }
        if self.password.is_empty() {
            return Err(CodecError::EmptyField("password"));
        }
        Ok(())
    }
}

// Keep secrets out of logs.
impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("website", &self.website)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Serialize a record to the plaintext that gets encrypted.
pub fn encode(record: &CredentialRecord) -> Result<String, CodecError> {
    record.validate()?;
    Ok(serde_json::to_string(record)?)
}

/// Parse decrypted plaintext back into a record.
pub fn decode(plaintext: &str) -> Result<CredentialRecord, CodecError> {
    let record: CredentialRecord = serde_json::from_str(plaintext)?;
    record.validate()?;
    Ok(record)
}
