// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Encryption Session Manager
//!
//! Owns the connection to the custody network and the cached session
//! credential for one wallet.
//!
//! ## Decrypt Flow
//!
//! ```text
//! decrypt(payload, condition)
//!   ├─ credential cached? ── no ──> anchor -> challenge -> wallet signs -> credential
//!   ├─ custody.decrypt(payload, condition, credential)
//!   └─ authorization failure?
//!        ├─ no  ──> propagate
//!        └─ yes ──> drop credential, acquire a fresh one, try once more
//!                     └─ fails again ──> RetryExhausted { original, retry }
//! ```
//!
//! Encryption never touches the credential.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::challenge::{ChallengeSettings, SignInChallenge, SignedChallenge};
use super::client::{CustodyError, KeyCustodyClient};
use super::conditions::AccessCondition;
use super::credential::{CredentialCell, SessionCredential};
use super::error::EncryptionError;
use super::payload::EncryptedPayload;
use super::retry::{retry_once, RetryFailure};
use crate::wallet::{Subscription, WalletError, WalletEvent, WalletProvider};

/// A failure inside one decrypt attempt.
#[derive(Debug)]
enum AttemptError {
    Custody(CustodyError),
    Wallet(WalletError),
}

impl AttemptError {
    fn is_authorization(&self) -> bool {
        match self {
            AttemptError::Custody(e) => e.is_authorization(),
            AttemptError::Wallet(e) => e.is_authorization(),
        }
    }
}

impl From<AttemptError> for EncryptionError {
    fn from(err: AttemptError) -> Self {
        match err {
            AttemptError::Custody(e) => e.into(),
            AttemptError::Wallet(e) => e.into(),
        }
    }
}

#[derive(Debug)]
struct AttemptFailure {
    error: AttemptError,
    /// Credential the attempt used, if it got that far.
    credential_id: Option<String>,
}

pub struct EncryptionSession<C, W> {
    client: C,
    wallet: W,
    settings: ChallengeSettings,
    connected: AtomicBool,
    credentials: CredentialCell,
}

impl<C: KeyCustodyClient, W: WalletProvider> EncryptionSession<C, W> {
    pub fn new(client: C, wallet: W) -> Self {
        Self {
            client,
            wallet,
            settings: ChallengeSettings::default(),
            connected: AtomicBool::new(false),
            credentials: CredentialCell::new(),
        }
    }

    pub fn with_settings(mut self, settings: ChallengeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    /// Connect to the custody network. Never fails; returns whether the
    /// session can now encrypt and decrypt.
    pub async fn connect(&self) -> bool {
        match self.client.connect().await {
            Ok(()) => {
                self.connected.store(true, Ordering::SeqCst);
                tracing::info!("Connected to custody network");
                true
            }
            Err(e) => {
                self.connected.store(false, Ordering::SeqCst);
                tracing::warn!(error = %e, "Custody network connection failed");
                false
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn has_session_credential(&self) -> bool {
        self.credentials.is_cached()
    }

    /// Drop the cached session credential. The next decrypt re-prompts the wallet.
    pub fn clear_session_credential(&self) {
        if self.credentials.clear() {
            tracing::info!("Cleared session credential");
        }
    }

    pub async fn encrypt(
        &self,
        plaintext: &str,
        condition: &AccessCondition,
    ) -> Result<EncryptedPayload, EncryptionError> {
        self.ensure_connected()?;
        let payload = self.client.encrypt_string(plaintext, condition).await?;
        tracing::debug!(data_hash = %payload.data_hash, "Encrypted payload");
        Ok(payload)
    }

    pub async fn decrypt(
        &self,
        payload: &EncryptedPayload,
        condition: &AccessCondition,
    ) -> Result<String, EncryptionError> {
        self.ensure_connected()?;

        let result = retry_once(
            |_| self.attempt_decrypt(payload, condition),
            |failure: &AttemptFailure| failure.error.is_authorization(),
            |failure: &AttemptFailure| {
                tracing::warn!(
                    error = ?failure.error,
                    "Decryption rejected; refreshing session credential and retrying"
                );
                match &failure.credential_id {
                    Some(id) => {
                        self.credentials.invalidate(id);
                    }
                    None => {
                        self.credentials.clear();
                    }
                }
            },
        )
        .await;

        match result {
            Ok(plaintext) => Ok(plaintext),
            Err(RetryFailure::NotRetried(failure)) => Err(failure.error.into()),
            Err(RetryFailure::Exhausted { original, retry }) => {
                tracing::error!(
                    original = ?original.error,
                    retry = ?retry.error,
                    "Decryption failed after retry"
                );
                Err(EncryptionError::RetryExhausted {
                    original: Box::new(original.error.into()),
                    retry: Box::new(retry.error.into()),
                })
            }
        }
    }

    /// Clear the credential whenever the wallet account changes or
    /// disconnects, or when this watcher misses events. Runs until `shutdown` fires or the hub closes.
    pub async fn watch_wallet_events(&self, mut events: Subscription, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = events.next() => match event {
                    Some(WalletEvent::AccountChanged(account)) => {
                        tracing::info!(
                            account = %account.map(|a| a.to_string()).unwrap_or_default(),
                            "Wallet account changed"
                        );
                        self.clear_session_credential();
                    }
                    Some(WalletEvent::Disconnected) => self.clear_session_credential(),
                    // A dropped account change cannot be ruled out.
                    Some(WalletEvent::Lagged(_)) => self.clear_session_credential(),
                    Some(WalletEvent::ChainChanged(_)) => {}
                    None => break,
                },
            }
        }
    }

    fn ensure_connected(&self) -> Result<(), EncryptionError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(EncryptionError::EncryptionUnavailable)
        }
    }

    async fn attempt_decrypt(
        &self,
        payload: &EncryptedPayload,
        condition: &AccessCondition,
    ) -> Result<String, AttemptFailure> {
        let credential = self
            .credentials
            .get_or_try_acquire(move || self.acquire_credential())
            .await
            .map_err(|error| AttemptFailure {
                error,
                credential_id: None,
            })?;

        self.client
            .decrypt_to_string(payload, condition, &credential)
            .await
            .map_err(|e| AttemptFailure {
                error: AttemptError::Custody(e),
                credential_id: Some(credential.id.clone()),
            })
    }

    async fn acquire_credential(&self) -> Result<SessionCredential, AttemptError> {
        let address = self.wallet.address().await.map_err(AttemptError::Wallet)?;
        let anchor = self
            .client
            .latest_freshness_anchor()
            .await
            .map_err(AttemptError::Custody)?;

        let challenge = SignInChallenge::for_decryption(&self.settings, address, anchor, Utc::now());
        let signature = self
            .wallet
            .sign_message(&challenge.to_message())
            .await
            .map_err(AttemptError::Wallet)?;

        let credential = self
            .client
            .session_credential(&SignedChallenge { challenge, signature })
            .await
            .map_err(AttemptError::Custody)?;
        tracing::info!(wallet = %address, credential_id = %credential.id, "Acquired session credential");
        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryption::conditions::build_condition;
    use crate::encryption::dev_node::LocalCustodyNode;
    use crate::wallet::{LocalWalletProvider, WalletEventHub};
    use std::sync::Arc;

    async fn connected_session() -> EncryptionSession<LocalCustodyNode, LocalWalletProvider> {
        let session = EncryptionSession::new(LocalCustodyNode::new(), LocalWalletProvider::random());
        assert!(session.connect().await);
        session
    }

    #[tokio::test]
    async fn connect_reports_failure_without_error() {
        let node = LocalCustodyNode::new();
        node.set_reachable(false);
        let session = EncryptionSession::new(node, LocalWalletProvider::random());
        assert!(!session.connect().await);
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn encrypt_before_connect_is_unavailable() {
        let session = EncryptionSession::new(LocalCustodyNode::new(), LocalWalletProvider::random());
        assert!(matches!(
            session.encrypt("x", &build_condition()).await,
            Err(EncryptionError::EncryptionUnavailable)
        ));
    }

    #[tokio::test]
    async fn decrypt_reuses_cached_credential() {
        let session = connected_session().await;
        let condition = build_condition();
        let payload = session.encrypt("secret", &condition).await.unwrap();

        for _ in 0..3 {
            assert_eq!(session.decrypt(&payload, &condition).await.unwrap(), "secret");
        }
        assert_eq!(session.client().credentials_issued(), 1);
    }

    #[tokio::test]
    async fn encrypt_does_not_acquire_credential() {
        let session = connected_session().await;
        session.encrypt("secret", &build_condition()).await.unwrap();
        assert!(!session.has_session_credential());
        assert_eq!(session.client().credentials_issued(), 0);
    }

    #[tokio::test]
    async fn stale_credential_is_refreshed_once() {
        let session = connected_session().await;
        let condition = build_condition();
        let payload = session.encrypt("secret", &condition).await.unwrap();
        session.decrypt(&payload, &condition).await.unwrap();

        session.client().revoke_all_credentials();
        assert_eq!(session.decrypt(&payload, &condition).await.unwrap(), "secret");
        assert_eq!(session.client().credentials_issued(), 2);
    }

    #[tokio::test]
    async fn condition_mismatch_is_not_retried() {
        let session = connected_session().await;
        let payload = session.encrypt("secret", &build_condition()).await.unwrap();

        let mut other = build_condition();
        other.parameters.push("extra".to_string());
        let err = session.decrypt(&payload, &other).await.unwrap_err();
        assert!(matches!(err, EncryptionError::ConditionMismatch));
        assert_eq!(session.client().credentials_issued(), 1);
    }

    #[tokio::test]
    async fn offline_network_propagates_without_retry() {
        let session = connected_session().await;
        let condition = build_condition();
        let payload = session.encrypt("secret", &condition).await.unwrap();

        session.client().set_reachable(false);
        assert!(matches!(
            session.decrypt(&payload, &condition).await,
            Err(EncryptionError::NetworkUnavailable(_))
        ));
        assert_eq!(session.client().credentials_issued(), 0);
    }

    #[tokio::test]
    async fn clear_forces_new_credential() {
        let session = connected_session().await;
        let condition = build_condition();
        let payload = session.encrypt("secret", &condition).await.unwrap();

        session.decrypt(&payload, &condition).await.unwrap();
        session.clear_session_credential();
        assert!(!session.has_session_credential());
        session.decrypt(&payload, &condition).await.unwrap();
        assert_eq!(session.client().credentials_issued(), 2);
    }

    #[tokio::test]
    async fn account_change_clears_credential() {
        let session = Arc::new(connected_session().await);
        let condition = build_condition();
        let payload = session.encrypt("secret", &condition).await.unwrap();
        session.decrypt(&payload, &condition).await.unwrap();
        assert!(session.has_session_credential());

        let hub = WalletEventHub::new();
        let shutdown = CancellationToken::new();
        let watcher = {
            let session = session.clone();
            let events = hub.subscribe();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { session.watch_wallet_events(events, shutdown).await })
        };

        hub.publish(WalletEvent::AccountChanged(None));
        for _ in 0..50 {
            if !session.has_session_credential() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(!session.has_session_credential());

        shutdown.cancel();
        watcher.await.unwrap();
    }

    #[tokio::test]
    async fn missed_wallet_events_clear_credential() {
        let session = Arc::new(connected_session().await);
        let condition = build_condition();
        let payload = session.encrypt("secret", &condition).await.unwrap();
        session.decrypt(&payload, &condition).await.unwrap();

        let hub = WalletEventHub::with_capacity(1);
        let shutdown = CancellationToken::new();
        let events = hub.subscribe();
        // Overflow the subscriber before the watcher first polls it.
        hub.publish(WalletEvent::ChainChanged(1));
        hub.publish(WalletEvent::ChainChanged(2));
        let watcher = {
            let session = session.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { session.watch_wallet_events(events, shutdown).await })
        };

        for _ in 0..50 {
            if !session.has_session_credential() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(!session.has_session_credential());

        shutdown.cancel();
        watcher.await.unwrap();
    }
}
