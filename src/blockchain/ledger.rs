// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger interface for encrypted vault entries.
//!
//! Entries are owned by the account that created them and addressed by a
//! per-owner index. The ledger never sees plaintext: each entry is an
//! opaque JSON-encoded encrypted payload.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::WalletIdentity;

/// Ledger errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Contract call reverted: {0}")]
    Reverted(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Receipt is missing the {0} event")]
    MissingEvent(&'static str),
}

/// Key-value ledger of encrypted entries.
///
/// Writes act on behalf of the ledger's signing account.
///
/// Implementations:
/// - [`InMemoryLedger`]: process-local, for development and tests
/// - [`super::vault_contract::VaultContractLedger`]: the deployed contract
pub trait Ledger: Send + Sync {
    /// Account whose entries this ledger writes.
    fn owner(&self) -> WalletIdentity;

    /// Store a new entry and return its id.
    fn create_entry(&self, blob: &str) -> impl Future<Output = Result<u64, LedgerError>> + Send;

    /// Read an entry. An empty string means the slot holds nothing.
    fn get_entry(&self, id: u64) -> impl Future<Output = Result<String, LedgerError>> + Send;

    fn update_entry(
        &self,
        id: u64,
        blob: &str,
    ) -> impl Future<Output = Result<(), LedgerError>> + Send;

    fn delete_entry(&self, id: u64) -> impl Future<Output = Result<(), LedgerError>> + Send;

    /// Number of entry slots ever created by `user`, deleted ones included.
    fn user_entry_count(
        &self,
        user: WalletIdentity,
    ) -> impl Future<Output = Result<u64, LedgerError>> + Send;
}

impl<L: Ledger> Ledger for Arc<L> {
    fn owner(&self) -> WalletIdentity {
        (**self).owner()
    }

    fn create_entry(&self, blob: &str) -> impl Future<Output = Result<u64, LedgerError>> + Send {
        (**self).create_entry(blob)
    }

    fn get_entry(&self, id: u64) -> impl Future<Output = Result<String, LedgerError>> + Send {
        (**self).get_entry(id)
    }

    fn update_entry(
        &self,
        id: u64,
        blob: &str,
    ) -> impl Future<Output = Result<(), LedgerError>> + Send {
        (**self).update_entry(id, blob)
    }

    fn delete_entry(&self, id: u64) -> impl Future<Output = Result<(), LedgerError>> + Send {
        (**self).delete_entry(id)
    }

    fn user_entry_count(
        &self,
        user: WalletIdentity,
    ) -> impl Future<Output = Result<u64, LedgerError>> + Send {
        (**self).user_entry_count(user)
    }
}

type Slots = BTreeMap<WalletIdentity, Vec<Option<String>>>;

/// Process-local ledger with the contract's semantics: reading or updating a
/// deleted or never-created entry reverts.
#[derive(Clone)]
pub struct InMemoryLedger {
    owner: WalletIdentity,
    slots: Arc<Mutex<Slots>>,
}

impl InMemoryLedger {
    pub fn new(owner: WalletIdentity) -> Self {
        Self {
            owner,
            slots: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Same storage, acting as a different account.
    pub fn as_account(&self, owner: WalletIdentity) -> Self {
        Self {
            owner,
            slots: Arc::clone(&self.slots),
        }
    }

    fn with_slots<T>(&self, f: impl FnOnce(&mut Vec<Option<String>>) -> T) -> T {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        f(slots.entry(self.owner).or_default())
    }
}

fn live_slot(entries: &mut [Option<String>], id: u64) -> Result<&mut String, LedgerError> {
    usize::try_from(id)
        .ok()
        .and_then(|index| entries.get_mut(index))
        .and_then(Option::as_mut)
        .ok_or_else(|| LedgerError::Reverted(format!("entry {id} does not exist")))
}

impl Ledger for InMemoryLedger {
    fn owner(&self) -> WalletIdentity {
        self.owner
    }

    async fn create_entry(&self, blob: &str) -> Result<u64, LedgerError> {
        Ok(self.with_slots(|entries| {
            entries.push(Some(blob.to_string()));
            (entries.len() - 1) as u64
        }))
    }

    async fn get_entry(&self, id: u64) -> Result<String, LedgerError> {
        self.with_slots(|entries| live_slot(entries, id).map(|blob| blob.clone()))
    }

    async fn update_entry(&self, id: u64, blob: &str) -> Result<(), LedgerError> {
        self.with_slots(|entries| {
            *live_slot(entries, id)? = blob.to_string();
            Ok(())
        })
    }

    async fn delete_entry(&self, id: u64) -> Result<(), LedgerError> {
        self.with_slots(|entries| {
            live_slot(entries, id)?;
            entries[id as usize] = None;
            Ok(())
        })
    }

    async fn user_entry_count(&self, user: WalletIdentity) -> Result<u64, LedgerError> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.get(&user).map_or(0, |entries| entries.len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(byte: u8) -> WalletIdentity {
        WalletIdentity::from(alloy::primitives::Address::repeat_byte(byte))
    }

    #[tokio::test]
    async fn create_then_get() {
        let ledger = InMemoryLedger::new(wallet(1));
        let id = ledger.create_entry("encrypted_password").await.unwrap();
        assert_eq!(id, 0);
        assert_eq!(ledger.get_entry(0).await.unwrap(), "encrypted_password");
    }

    #[tokio::test]
    async fn update_replaces_blob() {
        let ledger = InMemoryLedger::new(wallet(1));
        ledger.create_entry("original_data").await.unwrap();
        ledger.update_entry(0, "updated_data").await.unwrap();
        assert_eq!(ledger.get_entry(0).await.unwrap(), "updated_data");
    }

    #[tokio::test]
    async fn deleted_entry_reverts_but_keeps_count() {
        let ledger = InMemoryLedger::new(wallet(1));
        ledger.create_entry("to_be_deleted").await.unwrap();
        ledger.delete_entry(0).await.unwrap();

        assert!(matches!(ledger.get_entry(0).await, Err(LedgerError::Reverted(_))));
        assert!(matches!(ledger.update_entry(0, "x").await, Err(LedgerError::Reverted(_))));
        assert_eq!(ledger.user_entry_count(wallet(1)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn entries_are_scoped_to_owner() {
        let alice = InMemoryLedger::new(wallet(1));
        let bob = alice.as_account(wallet(2));
        alice.create_entry("a").await.unwrap();

        assert!(bob.get_entry(0).await.is_err());
        assert_eq!(bob.user_entry_count(wallet(1)).await.unwrap(), 1);
        assert_eq!(bob.user_entry_count(wallet(2)).await.unwrap(), 0);
    }
}
