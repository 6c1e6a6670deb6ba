// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Vault orchestration: codec, access condition, encryption session and ledger.

use crate::blockchain::{Ledger, LedgerError};
use crate::encryption::{
    build_condition, AccessCondition, EncryptedPayload, EncryptionError, EncryptionSession,
    KeyCustodyClient,
};
use crate::wallet::WalletProvider;

use super::codec::{self, CodecError, CredentialRecord};

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Encryption(#[from] EncryptionError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("vault entry {0} not found")]
    EntryNotFound(u64),

    #[error("vault entry {id} holds a malformed payload: {reason}")]
    MalformedPayload { id: u64, reason: String },
}

/// A decrypted ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultEntry {
    pub id: u64,
    pub record: CredentialRecord,
}

pub struct VaultService<C, W, L> {
    session: EncryptionSession<C, W>,
    ledger: L,
    condition: AccessCondition,
}

impl<C, W, L> VaultService<C, W, L>
where
    C: KeyCustodyClient,
    W: WalletProvider,
    L: Ledger,
{
    pub fn new(session: EncryptionSession<C, W>, ledger: L) -> Self {
        Self {
            session,
            ledger,
            condition: build_condition(),
        }
    }

    pub fn session(&self) -> &EncryptionSession<C, W> {
        &self.session
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Encrypt and store a new credential. Returns the ledger entry id.
    pub async fn save(&self, record: &CredentialRecord) -> Result<u64, VaultError> {
        let blob = self.seal(record).await?;
        let id = self.ledger.create_entry(&blob).await?;
        tracing::info!(entry_id = id, website = %record.website, "Saved vault entry");
        Ok(id)
    }

    pub async fn load(&self, id: u64) -> Result<CredentialRecord, VaultError> {
        let payload = self.fetch_payload(id).await?;
        let plaintext = self.session.decrypt(&payload, &self.condition).await?;
        Ok(codec::decode(&plaintext)?)
    }

    /// Re-encrypt a credential in place. The previous ciphertext is overwritten.
    pub async fn update(&self, id: u64, record: &CredentialRecord) -> Result<(), VaultError> {
        self.fetch_payload(id).await?;
        let blob = self.seal(record).await?;
        self.ledger.update_entry(id, &blob).await?;
        tracing::info!(entry_id = id, "Updated vault entry");
        Ok(())
    }

    pub async fn delete(&self, id: u64) -> Result<(), VaultError> {
        self.fetch_payload(id).await?;
        self.ledger.delete_entry(id).await?;
        tracing::info!(entry_id = id, "Deleted vault entry");
        Ok(())
    }

    /// Every live entry of the ledger owner, decrypted. Deleted slots are
    /// skipped; any other ledger failure aborts the listing.
    pub async fn list(&self) -> Result<Vec<VaultEntry>, VaultError> {
        let count = self
            .ledger
            .user_entry_count(self.ledger.owner())
            .await?;

        let mut entries = Vec::new();
        for id in 0..count {
            match self.load(id).await {
                Ok(record) => entries.push(VaultEntry { id, record }),
                Err(VaultError::EntryNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(entries)
    }

    async fn seal(&self, record: &CredentialRecord) -> Result<String, VaultError> {
        let plaintext = codec::encode(record)?;
        let payload = self.session.encrypt(&plaintext, &self.condition).await?;
        Ok(payload.to_json())
    }

    async fn fetch_payload(&self, id: u64) -> Result<EncryptedPayload, VaultError> {
        let blob = match self.ledger.get_entry(id).await {
            Ok(blob) => blob,
            Err(LedgerError::Reverted(_)) => return Err(VaultError::EntryNotFound(id)),
            Err(e) => return Err(e.into()),
        };
        if blob.is_empty() {
            return Err(VaultError::EntryNotFound(id));
        }
        EncryptedPayload::from_json(&blob).map_err(|e| VaultError::MalformedPayload {
            id,
            reason: e.to_string(),
        })
    }
}
