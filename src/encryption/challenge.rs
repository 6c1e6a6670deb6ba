// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Challenge
//!
//! Before the custody network issues a session credential, the wallet signs
//! a sign-in message (EIP-4361 layout) that embeds the requested capability
//! as a `urn:recap:` resource.
//!
//! ```text
//! {domain} wants you to sign in with your Ethereum account:
//! {address}
//!
//! {statement}
//!
//! URI: {uri}
//! Version: 1
//! Chain ID: {chain_id}
//! Nonce: {nonce}
//! Issued At: {issued_at}
//! Expiration Time: {expiration_time}
//! Resources:
//! - urn:recap:{base64url(capability json)}
//! ```
//!
//! The nonce is the network's latest freshness anchor (a recent block hash),
//! which keeps a signed challenge from being replayed indefinitely.

use std::collections::BTreeMap;

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::models::WalletIdentity;

/// Ability required to decrypt under an access condition.
pub const DECRYPTION_ABILITY: &str = "access-control-condition-decryption";

/// Wildcard resource: any access-condition-bound ciphertext.
pub const CONDITION_RESOURCE: &str = "acc://*";

/// How long a requested session credential stays valid.
pub const SESSION_LIFETIME_HOURS: i64 = 24;

const RECAP_PREFIX: &str = "urn:recap:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInChallenge {
    pub domain: String,
    pub address: WalletIdentity,
    pub statement: String,
    pub uri: String,
    pub chain_id: u64,
    pub nonce: String,
    pub issued_at: DateTime<Utc>,
    pub expiration_time: DateTime<Utc>,
    pub resources: Vec<String>,
}

/// Where the challenge is presented, configured once per session manager.
#[derive(Debug, Clone)]
pub struct ChallengeSettings {
    pub domain: String,
    pub uri: String,
    pub chain_id: u64,
    pub lifetime: Duration,
}

impl Default for ChallengeSettings {
    fn default() -> Self {
        Self {
            domain: "localhost".to_string(),
            uri: "lit:session:paaskeeper".to_string(),
            chain_id: 1,
            lifetime: Duration::hours(SESSION_LIFETIME_HOURS),
        }
    }
}

impl SignInChallenge {
    /// Challenge requesting the decryption capability for `address`.
    pub fn for_decryption(
        settings: &ChallengeSettings,
        address: WalletIdentity,
        nonce: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            domain: settings.domain.clone(),
            address,
            statement: format!(
                "I further authorize the stated URI to perform the following actions on my behalf: \
                 '{DECRYPTION_ABILITY}' for '{CONDITION_RESOURCE}'."
            ),
            uri: settings.uri.clone(),
            chain_id: settings.chain_id,
            nonce,
            issued_at: now,
            expiration_time: now + settings.lifetime,
            resources: vec![capability_resource(CONDITION_RESOURCE, DECRYPTION_ABILITY)],
        }
    }

    /// The exact text the wallet signs.
    pub fn to_message(&self) -> String {
        let mut message = format!(
            "{domain} wants you to sign in with your Ethereum account:\n\
             {address}\n\
             \n\
             {statement}\n\
             \n\
             URI: {uri}\n\
             Version: 1\n\
             Chain ID: {chain_id}\n\
             Nonce: {nonce}\n\
             Issued At: {issued_at}\n\
             Expiration Time: {expiration}",
            domain = self.domain,
            address = self.address,
            statement = self.statement,
            uri = self.uri,
            chain_id = self.chain_id,
            nonce = self.nonce,
            issued_at = self.issued_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            expiration = self
                .expiration_time
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        );
        if !self.resources.is_empty() {
            message.push_str("\nResources:");
            for resource in &self.resources {
                message.push_str("\n- ");
                message.push_str(resource);
            }
        }
        message
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration_time
    }

    /// Whether any resource grants `ability` on `resource`.
    pub fn grants(&self, resource: &str, ability: &str) -> bool {
        self.resources
            .iter()
            .filter_map(|r| decode_capability(r))
            .any(|cap| {
                cap.att
                    .get(resource)
                    .is_some_and(|abilities| abilities.contains_key(ability))
            })
    }
}

/// A challenge together with the wallet's hex signature over its message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedChallenge {
    pub challenge: SignInChallenge,
    pub signature: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Capability {
    att: BTreeMap<String, BTreeMap<String, Vec<serde_json::Value>>>,
    prf: Vec<String>,
}

/// Encode a single-ability capability as a `urn:recap:` resource.
pub fn capability_resource(resource: &str, ability: &str) -> String {
    let mut abilities = BTreeMap::new();
    abilities.insert(ability.to_string(), vec![serde_json::json!({})]);
    let mut att = BTreeMap::new();
    att.insert(resource.to_string(), abilities);

    let json = serde_json::to_vec(&Capability { att, prf: Vec::new() }).unwrap_or_default();
    format!("{RECAP_PREFIX}{}", Base64UrlUnpadded::encode_string(&json))
}

fn decode_capability(resource: &str) -> Option<Capability> {
    let encoded = resource.strip_prefix(RECAP_PREFIX)?;
    let bytes = Base64UrlUnpadded::decode_vec(encoded).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn challenge() -> SignInChallenge {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        SignInChallenge::for_decryption(
            &ChallengeSettings::default(),
            WalletIdentity::parse("0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12").unwrap(),
            "0xabc123".to_string(),
            now,
        )
    }

    #[test]
    fn message_layout() {
        let message = challenge().to_message();
        let lines: Vec<&str> = message.lines().collect();
        assert_eq!(
            lines[0],
            "localhost wants you to sign in with your Ethereum account:"
        );
        assert_eq!(lines[1], "0x742d35cc6634c0532925a3b844bc9e7595f4ab12");
        assert!(message.contains("\nVersion: 1\n"));
        assert!(message.contains("\nNonce: 0xabc123\n"));
        assert!(message.contains("\nIssued At: 2026-01-02T03:04:05.000Z\n"));
        assert!(message.contains("\nExpiration Time: 2026-01-03T03:04:05.000Z"));
        assert!(lines.last().unwrap().starts_with("- urn:recap:"));
    }

    #[test]
    fn grants_decryption_capability() {
        let c = challenge();
        assert!(c.grants(CONDITION_RESOURCE, DECRYPTION_ABILITY));
        assert!(!c.grants(CONDITION_RESOURCE, "pkp-signing"));
        assert!(!c.grants("acc://other", DECRYPTION_ABILITY));
    }

    #[test]
    fn expiry_is_one_lifetime_after_issue() {
        let c = challenge();
        assert!(!c.is_expired_at(c.issued_at));
        assert!(c.is_expired_at(c.issued_at + Duration::hours(24)));
    }
}
