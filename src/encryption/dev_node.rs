// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Local Custody Node
//!
//! In-process stand-in for the threshold custody network, used for local
//! development and tests. It enforces the same contract the real network
//! does:
//!
//! - encryption needs no credential; decryption needs a valid session credential
//! - a credential is issued only for a challenge signed by the claimed wallet,
//!   carrying a recent freshness anchor and the decryption capability
//! - a ciphertext only decrypts under the access condition it was created with
//! - a ciphertext only decrypts with the plaintext hash it was created with
//!
//! ## Envelope
//!
//! ```text
//! base64( version(1) || condition fingerprint(8) || nonce(24) || XChaCha20-Poly1305 ciphertext )
//! ```
//!
//! The per-condition key is `HMAC-SHA256(master_key, canonical condition)`
//! and the AEAD associated data is the plaintext hash, so swapping either the
//! condition or the hash makes decryption fail.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use base64ct::{Base64, Encoding};
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use super::challenge::{SignedChallenge, CONDITION_RESOURCE, DECRYPTION_ABILITY};
use super::client::{CustodyError, KeyCustodyClient};
use super::conditions::{AccessCondition, BALANCE_METHOD, CONDITION_CHAIN, USER_ADDRESS_PARAM};
use super::credential::SessionCredential;
use super::payload::{hash_plaintext, EncryptedPayload};
use crate::auth::signature::recover_signer;
use crate::models::WalletIdentity;

type HmacSha256 = Hmac<Sha256>;

const ENVELOPE_VERSION: u8 = 1;
const FINGERPRINT_LEN: usize = 8;
const NONCE_LEN: usize = 24;
const HEADER_LEN: usize = 1 + FINGERPRINT_LEN + NONCE_LEN;

/// How many recent anchors a challenge nonce may reference.
const ANCHOR_WINDOW: usize = 16;

#[derive(Clone)]
pub struct LocalCustodyNode {
    inner: Arc<NodeState>,
}

struct NodeState {
    master_key: [u8; 32],
    reachable: AtomicBool,
    connected: AtomicBool,
    block_height: AtomicU64,
    recent_anchors: Mutex<VecDeque<String>>,
    credentials: Mutex<HashMap<String, SessionCredential>>,
    balances: Mutex<HashMap<WalletIdentity, u128>>,
    issued: AtomicUsize,
}

impl Default for LocalCustodyNode {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalCustodyNode {
    /// Node with a random master key.
    pub fn new() -> Self {
        let mut master_key = [0u8; 32];
        OsRng.fill_bytes(&mut master_key);
        Self::with_master_key(master_key)
    }

    /// Node with a fixed master key, so ciphertexts survive restarts.
    pub fn with_master_key(master_key: [u8; 32]) -> Self {
        Self {
            inner: Arc::new(NodeState {
                master_key,
                reachable: AtomicBool::new(true),
                connected: AtomicBool::new(false),
                block_height: AtomicU64::new(0),
                recent_anchors: Mutex::new(VecDeque::with_capacity(ANCHOR_WINDOW)),
                credentials: Mutex::new(HashMap::new()),
                balances: Mutex::new(HashMap::new()),
                issued: AtomicUsize::new(0),
            }),
        }
    }

    /// Simulate the network going down or coming back.
    pub fn set_reachable(&self, reachable: bool) {
        self.inner.reachable.store(reachable, Ordering::SeqCst);
        if !reachable {
            self.inner.connected.store(false, Ordering::SeqCst);
        }
    }

    /// Forget every issued credential, as if they had all expired.
    pub fn revoke_all_credentials(&self) {
        let mut credentials = lock(&self.inner.credentials);
        tracing::debug!(count = credentials.len(), "Revoking all session credentials");
        credentials.clear();
    }

    /// Number of issued credentials the node still tracks.
    pub fn live_credentials(&self) -> usize {
        lock(&self.inner.credentials).len()
    }

    /// Number of session credentials issued so far.
    pub fn credentials_issued(&self) -> usize {
        self.inner.issued.load(Ordering::SeqCst)
    }

    pub fn set_balance(&self, wallet: WalletIdentity, balance: u128) {
        lock(&self.inner.balances).insert(wallet, balance);
    }

    fn ensure_connected(&self) -> Result<(), CustodyError> {
        if !self.inner.reachable.load(Ordering::SeqCst) {
            return Err(CustodyError::Unreachable("local node is offline".to_string()));
        }
        if !self.inner.connected.load(Ordering::SeqCst) {
            return Err(CustodyError::NotConnected);
        }
        Ok(())
    }

    fn condition_key(&self, condition: &AccessCondition) -> Result<[u8; 32], CustodyError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.inner.master_key)
            .map_err(|e| CustodyError::InvalidCondition(e.to_string()))?;
        mac.update(&condition.canonical_bytes());
        Ok(mac.finalize().into_bytes().into())
    }

    fn credential_proof(&self, credential: &SessionCredential) -> Result<String, CustodyError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.inner.master_key)
            .map_err(|e| CustodyError::Unauthorized(e.to_string()))?;
        mac.update(credential.id.as_bytes());
        mac.update(credential.address.canonical().as_bytes());
        mac.update(&credential.expires_at.timestamp().to_be_bytes());
        Ok(alloy::hex::encode(mac.finalize().into_bytes()))
    }

    fn check_credential(&self, presented: &SessionCredential) -> Result<(), CustodyError> {
        let known = lock(&self.inner.credentials).get(&presented.id).cloned();
        let Some(known) = known else {
            // Expired credentials are pruned; the proof still vouches for them.
            if presented.is_expired_at(Utc::now())
                && self.credential_proof(presented)? == presented.proof
            {
                return Err(CustodyError::CredentialExpired);
            }
            return Err(CustodyError::Unauthorized(
                "unknown session credential".to_string(),
            ));
        };
        if known != *presented || self.credential_proof(presented)? != presented.proof {
            return Err(CustodyError::Unauthorized(
                "session credential proof is invalid".to_string(),
            ));
        }
        if known.is_expired_at(Utc::now()) {
            return Err(CustodyError::CredentialExpired);
        }
        Ok(())
    }

    fn evaluate_condition(
        &self,
        condition: &AccessCondition,
        requester: &WalletIdentity,
    ) -> Result<bool, CustodyError> {
        if condition.chain != CONDITION_CHAIN {
            return Err(CustodyError::InvalidCondition(format!(
                "unsupported chain {}",
                condition.chain
            )));
        }
        if condition.method != BALANCE_METHOD {
            return Err(CustodyError::InvalidCondition(format!(
                "unsupported method {}",
                condition.method
            )));
        }
        if condition.parameters.first().map(String::as_str) != Some(USER_ADDRESS_PARAM) {
            return Err(CustodyError::InvalidCondition(
                "balance condition must target :userAddress".to_string(),
            ));
        }
        let expected: u128 = condition
            .return_value_test
            .value
            .parse()
            .map_err(|_| {
                CustodyError::InvalidCondition(format!(
                    "non-numeric threshold {}",
                    condition.return_value_test.value
                ))
            })?;
        let balance = lock(&self.inner.balances)
            .get(requester)
            .copied()
            .unwrap_or(0);
        Ok(condition.return_value_test.comparator.evaluate(balance, expected))
    }
}

impl KeyCustodyClient for LocalCustodyNode {
    async fn connect(&self) -> Result<(), CustodyError> {
        if !self.inner.reachable.load(Ordering::SeqCst) {
            return Err(CustodyError::Unreachable("local node is offline".to_string()));
        }
        self.inner.connected.store(true, Ordering::SeqCst);
        tracing::debug!("Connected to local custody node");
        Ok(())
    }

    async fn latest_freshness_anchor(&self) -> Result<String, CustodyError> {
        self.ensure_connected()?;
        let height = self.inner.block_height.fetch_add(1, Ordering::SeqCst) + 1;

        let mut hasher = Sha256::new();
        hasher.update(self.inner.master_key);
        hasher.update(height.to_be_bytes());
        let anchor = alloy::hex::encode_prefixed(hasher.finalize());

        let mut anchors = lock(&self.inner.recent_anchors);
        if anchors.len() == ANCHOR_WINDOW {
            anchors.pop_front();
        }
        anchors.push_back(anchor.clone());
        Ok(anchor)
    }

    async fn session_credential(
        &self,
        signed: &SignedChallenge,
    ) -> Result<SessionCredential, CustodyError> {
        self.ensure_connected()?;
        let challenge = &signed.challenge;
        let now = Utc::now();

        if !lock(&self.inner.recent_anchors).contains(&challenge.nonce) {
            return Err(CustodyError::Unauthorized(
                "challenge nonce is not a recent anchor".to_string(),
            ));
        }
        if challenge.is_expired_at(now) {
            return Err(CustodyError::Unauthorized("challenge has expired".to_string()));
        }
        if !challenge.grants(CONDITION_RESOURCE, DECRYPTION_ABILITY) {
            return Err(CustodyError::Unauthorized(
                "challenge does not request the decryption capability".to_string(),
            ));
        }

        let signer = recover_signer(&challenge.to_message(), &signed.signature)
            .map_err(|e| CustodyError::Unauthorized(e.to_string()))?;
        if signer != challenge.address {
            return Err(CustodyError::Unauthorized(format!(
                "signature is from {signer}, challenge names {}",
                challenge.address
            )));
        }

        let mut credential = SessionCredential {
            id: uuid::Uuid::new_v4().to_string(),
            address: challenge.address,
            ability: DECRYPTION_ABILITY.to_string(),
            issued_at: now,
            expires_at: challenge.expiration_time,
            proof: String::new(),
        };
        credential.proof = self.credential_proof(&credential)?;

        {
            let mut credentials = lock(&self.inner.credentials);
            credentials.retain(|_, issued| !issued.is_expired_at(now));
            credentials.insert(credential.id.clone(), credential.clone());
        }
        self.inner.issued.fetch_add(1, Ordering::SeqCst);
        tracing::info!(
            wallet = %credential.address,
            credential_id = %credential.id,
            expires_at = %credential.expires_at,
            "Issued session credential"
        );
        Ok(credential)
    }

    async fn encrypt_string(
        &self,
        plaintext: &str,
        condition: &AccessCondition,
    ) -> Result<EncryptedPayload, CustodyError> {
        self.ensure_connected()?;
        let key = self.condition_key(condition)?;
        let cipher = XChaCha20Poly1305::new(&key.into());

        let data_hash = hash_plaintext(plaintext);
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let sealed = cipher
            .encrypt(
                XNonce::from_slice(&nonce),
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: data_hash.as_bytes(),
                },
            )
            .map_err(|_| CustodyError::MalformedPayload("encryption failed".to_string()))?;

        let mut envelope = Vec::with_capacity(HEADER_LEN + sealed.len());
        envelope.push(ENVELOPE_VERSION);
        envelope.extend_from_slice(&condition.fingerprint()[..FINGERPRINT_LEN]);
        envelope.extend_from_slice(&nonce);
        envelope.extend_from_slice(&sealed);

        Ok(EncryptedPayload {
            ciphertext: Base64::encode_string(&envelope),
            data_hash,
        })
    }

    async fn decrypt_to_string(
        &self,
        payload: &EncryptedPayload,
        condition: &AccessCondition,
        credential: &SessionCredential,
    ) -> Result<String, CustodyError> {
        self.ensure_connected()?;
        self.check_credential(credential)?;
        if !self.evaluate_condition(condition, &credential.address)? {
            return Err(CustodyError::Unauthorized(
                "access condition not satisfied".to_string(),
            ));
        }

        let envelope = Base64::decode_vec(&payload.ciphertext)
            .map_err(|e| CustodyError::MalformedPayload(format!("ciphertext is not base64: {e}")))?;
        if envelope.len() <= HEADER_LEN {
            return Err(CustodyError::MalformedPayload("ciphertext is truncated".to_string()));
        }
        if envelope[0] != ENVELOPE_VERSION {
            return Err(CustodyError::MalformedPayload(format!(
                "unknown envelope version {}",
                envelope[0]
            )));
        }
        if envelope[1..1 + FINGERPRINT_LEN] != condition.fingerprint()[..FINGERPRINT_LEN] {
            return Err(CustodyError::ConditionMismatch);
        }

        let key = self.condition_key(condition)?;
        let cipher = XChaCha20Poly1305::new(&key.into());
        let nonce = &envelope[1 + FINGERPRINT_LEN..HEADER_LEN];
        let plaintext = cipher
            .decrypt(
                XNonce::from_slice(nonce),
                Payload {
                    msg: &envelope[HEADER_LEN..],
                    aad: payload.data_hash.as_bytes(),
                },
            )
            .map_err(|_| {
                CustodyError::MalformedPayload(
                    "ciphertext does not authenticate against its data hash".to_string(),
                )
            })?;

        String::from_utf8(plaintext)
            .map_err(|_| CustodyError::MalformedPayload("plaintext is not UTF-8".to_string()))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
