// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Credential Cache
//!
//! A [`SessionCredential`] is the short-lived proof, issued by the custody
//! network, that a wallet signed a decryption capability. The session manager
//! holds at most one at a time in a [`CredentialCell`].
//!
//! ## Lifecycle
//!
//! ```text
//! Absent --first decrypt--> Acquiring --ok--> Cached
//! Cached --auth failure / clear / account change--> Absent
//! ```
//!
//! Acquisition is single-flight: concurrent decrypts that all find the cell
//! empty wait on one acquisition instead of prompting the wallet several
//! times. A credential acquired while a `clear()` happened is handed to the
//! caller that asked for it but not cached.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::WalletIdentity;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredential {
    /// Network-assigned identifier.
    pub id: String,
    /// Wallet that signed the capability.
    pub address: WalletIdentity,
    /// Ability granted, e.g. `access-control-condition-decryption`.
    pub ability: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Opaque proof the network checks on every request.
    pub proof: String,
}

impl SessionCredential {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredential")
            .field("id", &self.id)
            .field("address", &self.address)
            .field("ability", &self.ability)
            .field("expires_at", &self.expires_at)
            .field("proof", &"<redacted>")
            .finish()
    }
}

#[derive(Default)]
pub struct CredentialCell {
    slot: Mutex<Option<SessionCredential>>,
    acquiring: tokio::sync::Mutex<()>,
    generation: AtomicU64,
}

impl CredentialCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<SessionCredential> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_cached(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Drop the cached credential. Returns whether one was present.
    pub fn clear(&self) -> bool {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    /// Drop the cached credential only if it is still `id`.
    ///
    /// Two decrypts failing on the same stale credential must not throw away
    /// a fresh one the other already obtained.
    pub fn invalidate(&self, id: &str) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|c| c.id == id) {
            self.generation.fetch_add(1, Ordering::SeqCst);
            *slot = None;
            true
        } else {
            false
        }
    }

    /// Return the cached credential, or run `acquire` once to obtain one.
    pub async fn get_or_try_acquire<F, Fut, E>(&self, acquire: F) -> Result<SessionCredential, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<SessionCredential, E>>,
    {
        if let Some(credential) = self.get() {
            return Ok(credential);
        }

        let _guard = self.acquiring.lock().await;
        if let Some(credential) = self.get() {
            return Ok(credential);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let credential = acquire().await?;

        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if self.generation.load(Ordering::SeqCst) == generation {
            *slot = Some(credential.clone());
        } else {
            tracing::debug!(
                credential_id = %credential.id,
                "Credential cleared during acquisition; not caching"
            );
        }
        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    fn credential(id: &str) -> SessionCredential {
        let now = Utc::now();
        SessionCredential {
            id: id.to_string(),
            address: WalletIdentity::parse("0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12").unwrap(),
            ability: "access-control-condition-decryption".to_string(),
            issued_at: now,
            expires_at: now + chrono::Duration::hours(24),
            proof: "proof".to_string(),
        }
    }

    #[tokio::test]
    async fn caches_after_first_acquisition() {
        let cell = CredentialCell::new();
        let calls = AtomicUsize::new(0);
        let calls = &calls;

        for _ in 0..3 {
            let c = cell
                .get_or_try_acquire(move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(credential("a"))
                })
                .await
                .unwrap();
            assert_eq!(c.id, "a");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_acquisition_leaves_cell_empty() {
        let cell = CredentialCell::new();
        let result = cell
            .get_or_try_acquire(|| async { Err::<SessionCredential, _>("rejected") })
            .await;
        assert_eq!(result.unwrap_err(), "rejected");
        assert!(!cell.is_cached());
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_acquisition() {
        let cell = Arc::new(CredentialCell::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cell = cell.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cell.get_or_try_acquire(move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok::<_, ()>(credential("shared"))
                })
                .await
                .unwrap()
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().id, "shared");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn invalidate_only_removes_matching_credential() {
        let cell = CredentialCell::new();
        *cell.slot.lock().unwrap() = Some(credential("fresh"));

        assert!(!cell.invalidate("stale"));
        assert!(cell.is_cached());
        assert!(cell.invalidate("fresh"));
        assert!(!cell.is_cached());
    }

    #[tokio::test]
    async fn clear_during_acquisition_is_not_overwritten() {
        let cell = Arc::new(CredentialCell::new());
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let acquiring = {
            let cell = cell.clone();
            tokio::spawn(async move {
                cell.get_or_try_acquire(move || async move {
                    rx.await.ok();
                    Ok::<_, ()>(credential("old-account"))
                })
                .await
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        cell.clear();
        tx.send(()).unwrap();

        let returned = acquiring.await.unwrap().unwrap();
        assert_eq!(returned.id, "old-account");
        assert!(!cell.is_cached());
    }

    #[test]
    fn debug_redacts_proof() {
        let debug = format!("{:?}", credential("x"));
        assert!(!debug.contains("\"proof\""));
        assert!(debug.contains("<redacted>"));
    }
}
