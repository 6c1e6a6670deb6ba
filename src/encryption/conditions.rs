// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Access Conditions
//!
//! An [`AccessCondition`] is the predicate the custody network evaluates
//! before releasing decryption shares. The vault binds every ciphertext to
//! the same condition:
//!
//! | Field                    | Value                          |
//! |--------------------------|--------------------------------|
//! | `contractAddress`        | `""`                           |
//! | `standardContractType`   | `""`                           |
//! | `chain`                  | `ethereum`                     |
//! | `method`                 | `eth_getBalance`               |
//! | `parameters`             | `[":userAddress", "latest"]`   |
//! | `returnValueTest`        | `>= 0`                         |
//!
//! The condition is trivially true for any address; its purpose is to bind
//! decryption to the wallet that signed the session challenge. The ciphertext
//! is keyed on the canonical serialization, so [`build_condition`] must be
//! byte-identical on every call.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::WalletIdentity;

/// Placeholder substituted with the requesting wallet at evaluation time.
pub const USER_ADDRESS_PARAM: &str = ":userAddress";

pub const CONDITION_CHAIN: &str = "ethereum";
pub const BALANCE_METHOD: &str = "eth_getBalance";

/// Numeric comparison applied to the method's return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
}

impl Comparator {
    pub fn evaluate(&self, actual: u128, expected: u128) -> bool {
        match self {
            Comparator::Eq => actual == expected,
            Comparator::Gt => actual > expected,
            Comparator::Gte => actual >= expected,
            Comparator::Lt => actual < expected,
            Comparator::Lte => actual <= expected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnValueTest {
    pub comparator: Comparator,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCondition {
    pub contract_address: String,
    pub standard_contract_type: String,
    pub chain: String,
    pub method: String,
    pub parameters: Vec<String>,
    pub return_value_test: ReturnValueTest,
}

/// Build the vault's fixed access condition.
pub fn build_condition() -> AccessCondition {
    AccessCondition {
        contract_address: String::new(),
        standard_contract_type: String::new(),
        chain: CONDITION_CHAIN.to_string(),
        method: BALANCE_METHOD.to_string(),
        parameters: vec![USER_ADDRESS_PARAM.to_string(), "latest".to_string()],
        return_value_test: ReturnValueTest {
            comparator: Comparator::Gte,
            value: "0".to_string(),
        },
    }
}

impl AccessCondition {
    /// Canonical serialization. Field order is fixed by the struct layout.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        // Plain strings and a unit enum cannot fail to serialize.
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// SHA-256 over the canonical serialization.
    pub fn fingerprint(&self) -> [u8; 32] {
        Sha256::digest(self.canonical_bytes()).into()
    }

    /// Parameters with `:userAddress` replaced by the requesting wallet.
    pub fn resolve_parameters(&self, user: &WalletIdentity) -> Vec<String> {
        self.parameters
            .iter()
            .map(|p| {
                if p == USER_ADDRESS_PARAM {
                    user.canonical()
                } else {
                    p.clone()
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_is_byte_identical_across_calls() {
        let a = build_condition();
        let b = build_condition();
        assert_eq!(a, b);
        assert_eq!(a.canonical_bytes(), b.canonical_bytes());
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn canonical_json_shape() {
        let json = String::from_utf8(build_condition().canonical_bytes()).unwrap();
        assert_eq!(
            json,
            r#"{"contractAddress":"","standardContractType":"","chain":"ethereum","method":"eth_getBalance","parameters":[":userAddress","latest"],"returnValueTest":{"comparator":">=","value":"0"}}"#
        );
    }

    #[test]
    fn any_field_change_changes_fingerprint() {
        let base = build_condition();
        let mut other = build_condition();
        other.return_value_test.value = "1".to_string();
        assert_ne!(base.fingerprint(), other.fingerprint());
    }

    #[test]
    fn resolves_user_address_placeholder() {
        let wallet = WalletIdentity::parse("0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12").unwrap();
        let params = build_condition().resolve_parameters(&wallet);
        assert_eq!(params, vec![wallet.canonical(), "latest".to_string()]);
    }

    #[test]
    fn comparator_semantics() {
        assert!(Comparator::Gte.evaluate(0, 0));
        assert!(!Comparator::Gt.evaluate(0, 0));
        assert!(Comparator::Lt.evaluate(1, 2));
        assert!(Comparator::Lte.evaluate(2, 2));
        assert!(Comparator::Eq.evaluate(7, 7));
    }
}
