// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger network constants.

/// EVM network hosting the vault contract.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Chain ID
    pub chain_id: u64,
    /// RPC endpoint URL
    pub rpc_url: &'static str,
    /// Block explorer URL
    pub explorer_url: &'static str,
}

/// Ethereum Sepolia testnet, where the vault contract is deployed.
pub const SEPOLIA: NetworkConfig = NetworkConfig {
    name: "Ethereum Sepolia",
    chain_id: 11_155_111,
    rpc_url: "https://ethereum-sepolia-rpc.publicnode.com",
    explorer_url: "https://sepolia.etherscan.io",
};

/// Deployed `VaultStorage` contract on Sepolia.
pub const VAULT_CONTRACT_ADDRESS: &str = "0x54361eFa03584db2Cc3397Afd741bE8b8870f51D";

impl NetworkConfig {
    /// Explorer link for a transaction hash.
    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url, tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn vault_contract_address_parses() {
        assert!(alloy::primitives::Address::from_str(VAULT_CONTRACT_ADDRESS).is_ok());
    }

    #[test]
    fn explorer_links() {
        assert_eq!(
            SEPOLIA.tx_url("0xabc"),
            "https://sepolia.etherscan.io/tx/0xabc"
        );
    }
}
