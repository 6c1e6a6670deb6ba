// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;

use super::events::{WalletEvent, WalletEventHub};
use crate::models::WalletIdentity;

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("signature request rejected: {0}")]
    Rejected(String),

    #[error("wallet unavailable: {0}")]
    Unavailable(String),

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("failed to switch network: {0}")]
    NetworkSwitch(String),
}

impl WalletError {
    /// A rejected signature prompt can be retried with a new prompt.
    pub fn is_authorization(&self) -> bool {
        matches!(self, WalletError::Rejected(_))
    }
}

/// What the session manager needs from the user's wallet.
pub trait WalletProvider: Send + Sync {
    fn address(&self) -> impl Future<Output = Result<WalletIdentity, WalletError>> + Send;

    /// EIP-191 personal-sign `message`; returns a 0x-prefixed 65-byte hex signature.
    fn sign_message(&self, message: &str)
        -> impl Future<Output = Result<String, WalletError>> + Send;

    fn switch_network(&self, chain_id: u64) -> impl Future<Output = Result<(), WalletError>> + Send;
}

impl<W: WalletProvider> WalletProvider for Arc<W> {
    fn address(&self) -> impl Future<Output = Result<WalletIdentity, WalletError>> + Send {
        (**self).address()
    }

    fn sign_message(
        &self,
        message: &str,
    ) -> impl Future<Output = Result<String, WalletError>> + Send {
        (**self).sign_message(message)
    }

    fn switch_network(&self, chain_id: u64) -> impl Future<Output = Result<(), WalletError>> + Send {
        (**self).switch_network(chain_id)
    }
}

/// Wallet backed by an in-memory secp256k1 key.
///
/// Used by the server for development and by tests; the browser wallet
/// implements the same trait on the client side.
pub struct LocalWalletProvider {
    signer: PrivateKeySigner,
    chain_id: AtomicU64,
    events: Option<WalletEventHub>,
}

impl LocalWalletProvider {
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self {
            signer,
            chain_id: AtomicU64::new(1),
            events: None,
        }
    }

    /// Build from a 0x-prefixed or bare hex private key.
    pub fn from_private_key(private_key: &str) -> Result<Self, WalletError> {
        let key = private_key.trim().trim_start_matches("0x");
        let signer: PrivateKeySigner = key
            .parse()
            .map_err(|e| WalletError::InvalidKey(format!("{e}")))?;
        Ok(Self::new(signer))
    }

    pub fn random() -> Self {
        Self::new(PrivateKeySigner::random())
    }

    /// Publish chain changes on `hub`.
    pub fn with_events(mut self, hub: WalletEventHub) -> Self {
        self.events = Some(hub);
        self
    }

    pub fn identity(&self) -> WalletIdentity {
        WalletIdentity::from(self.signer.address())
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id.load(Ordering::SeqCst)
    }
}

impl WalletProvider for LocalWalletProvider {
    async fn address(&self) -> Result<WalletIdentity, WalletError> {
        Ok(self.identity())
    }

    async fn sign_message(&self, message: &str) -> Result<String, WalletError> {
        let signature = self
            .signer
            .sign_message(message.as_bytes())
            .await
            .map_err(|e| WalletError::Rejected(e.to_string()))?;
        Ok(alloy::hex::encode_prefixed(signature.as_bytes()))
    }

    async fn switch_network(&self, chain_id: u64) -> Result<(), WalletError> {
        let previous = self.chain_id.swap(chain_id, Ordering::SeqCst);
        if previous != chain_id {
            tracing::info!(from = previous, to = chain_id, "Wallet switched network");
            if let Some(hub) = &self.events {
                hub.publish(WalletEvent::ChainChanged(chain_id));
            }
        }
        Ok(())
    }
}
