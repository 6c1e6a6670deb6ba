// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `VaultStorage` contract interactions.

use std::str::FromStr;

use alloy::{
    network::EthereumWallet,
    primitives::{Address, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionReceipt,
    signers::local::PrivateKeySigner,
    sol,
};

use super::ledger::{Ledger, LedgerError};
use super::types::NetworkConfig;
use crate::models::WalletIdentity;

// Entries are keyed by msg.sender; ids are per-user indices.
sol! {
    #[sol(rpc)]
    interface VaultStorage {
        event EntryCreated(address indexed user, uint256 entryId);
        event EntryUpdated(address indexed user, uint256 entryId);
        event EntryDeleted(address indexed user, uint256 entryId);

        function createEntry(string encryptedData) external;
        function getEntry(uint256 entryId) external view returns (string);
        function updateEntry(uint256 entryId, string newEncryptedData) external;
        function deleteEntry(uint256 entryId) external;
        function getUserEntryCount(address user) external view returns (uint256);
    }
}

/// Ledger backed by the deployed `VaultStorage` contract.
pub struct VaultContractLedger {
    contract: VaultStorage::VaultStorageInstance<DynProvider>,
    owner: WalletIdentity,
}

impl VaultContractLedger {
    /// Connect to the contract at `contract_address`, signing writes with `signer`.
    pub fn new(
        rpc_url: &str,
        contract_address: &str,
        signer: PrivateKeySigner,
    ) -> Result<Self, LedgerError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| LedgerError::InvalidRpcUrl(e.to_string()))?;
        let address = Address::from_str(contract_address)
            .map_err(|e| LedgerError::InvalidAddress(e.to_string()))?;

        let owner = WalletIdentity::from(signer.address());
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        Ok(Self {
            contract: VaultStorage::new(address, provider),
            owner,
        })
    }

    /// Connect using the network's public RPC endpoint.
    pub fn for_network(
        network: &NetworkConfig,
        contract_address: &str,
        signer: PrivateKeySigner,
    ) -> Result<Self, LedgerError> {
        Self::new(network.rpc_url, contract_address, signer)
    }

    pub fn contract_address(&self) -> Address {
        *self.contract.address()
    }
}

fn ensure_success(receipt: &TransactionReceipt) -> Result<(), LedgerError> {
    if receipt.status() {
        Ok(())
    } else {
        Err(LedgerError::TransactionFailed(format!(
            "transaction {} reverted",
            receipt.transaction_hash
        )))
    }
}

/// Only an execution revert reported by the node becomes `Reverted`;
/// transport, decoding and node failures stay `Rpc`.
fn call_error(err: alloy::contract::Error) -> LedgerError {
    let reverted = match &err {
        alloy::contract::Error::TransportError(e) => e.as_error_resp().is_some_and(|resp| {
            resp.as_revert_data().is_some() || resp.message.to_lowercase().contains("revert")
        }),
        _ => false,
    };
    if reverted {
        LedgerError::Reverted(err.to_string())
    } else {
        LedgerError::Rpc(err.to_string())
    }
}

fn entry_id(value: U256) -> Result<u64, LedgerError> {
    u64::try_from(value).map_err(|_| LedgerError::Rpc(format!("entry id {value} exceeds u64")))
}

impl Ledger for VaultContractLedger {
    fn owner(&self) -> WalletIdentity {
        self.owner
    }

    async fn create_entry(&self, blob: &str) -> Result<u64, LedgerError> {
        let receipt = self
            .contract
            .createEntry(blob.to_string())
            .send()
            .await
            .map_err(call_error)?
            .get_receipt()
            .await
            .map_err(|e| LedgerError::TransactionFailed(e.to_string()))?;
        ensure_success(&receipt)?;

        let created = receipt
            .inner
            .logs()
            .iter()
            .find_map(|log| log.log_decode::<VaultStorage::EntryCreated>().ok())
            .ok_or(LedgerError::MissingEvent("EntryCreated"))?;
        let id = entry_id(created.inner.data.entryId)?;

        tracing::info!(
            wallet = %self.owner,
            entry_id = id,
            tx_hash = %receipt.transaction_hash,
            "Vault entry created"
        );
        Ok(id)
    }

    async fn get_entry(&self, id: u64) -> Result<String, LedgerError> {
        self.contract
            .getEntry(U256::from(id))
            .call()
            .await
            .map_err(call_error)
    }

    async fn update_entry(&self, id: u64, blob: &str) -> Result<(), LedgerError> {
        let receipt = self
            .contract
            .updateEntry(U256::from(id), blob.to_string())
            .send()
            .await
            .map_err(call_error)?
            .get_receipt()
            .await
            .map_err(|e| LedgerError::TransactionFailed(e.to_string()))?;
        ensure_success(&receipt)?;
        tracing::info!(wallet = %self.owner, entry_id = id, "Vault entry updated");
        Ok(())
    }

    async fn delete_entry(&self, id: u64) -> Result<(), LedgerError> {
        let receipt = self
            .contract
            .deleteEntry(U256::from(id))
            .send()
            .await
            .map_err(call_error)?
            .get_receipt()
            .await
            .map_err(|e| LedgerError::TransactionFailed(e.to_string()))?;
        ensure_success(&receipt)?;
        tracing::info!(wallet = %self.owner, entry_id = id, "Vault entry deleted");
        Ok(())
    }

    async fn user_entry_count(&self, user: WalletIdentity) -> Result<u64, LedgerError> {
        let count = self
            .contract
            .getUserEntryCount(user.address())
            .call()
            .await
            .map_err(call_error)?;
        entry_id(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::types::{SEPOLIA, VAULT_CONTRACT_ADDRESS};

    #[test]
    fn owner_is_signer_address() {
        let signer = PrivateKeySigner::random();
        let expected = WalletIdentity::from(signer.address());
        let ledger = VaultContractLedger::for_network(&SEPOLIA, VAULT_CONTRACT_ADDRESS, signer).unwrap();
        assert_eq!(ledger.owner(), expected);
        assert_eq!(
            ledger.contract_address(),
            Address::from_str(VAULT_CONTRACT_ADDRESS).unwrap()
        );
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(matches!(
            VaultContractLedger::new("not a url", VAULT_CONTRACT_ADDRESS, PrivateKeySigner::random()),
            Err(LedgerError::InvalidRpcUrl(_))
        ));
        assert!(matches!(
            VaultContractLedger::new(SEPOLIA.rpc_url, "0x1234", PrivateKeySigner::random()),
            Err(LedgerError::InvalidAddress(_))
        ));
    }

    #[test]
    fn create_call_encodes_blob() {
        use alloy::sol_types::SolCall;
        let call = VaultStorage::createEntryCall {
            encryptedData: "{\"ciphertext\":\"x\"}".to_string(),
        };
        let encoded = call.abi_encode();
        assert_eq!(&encoded[..4], VaultStorage::createEntryCall::SELECTOR.as_slice());
    }

    #[tokio::test]
    async fn unreachable_node_is_not_a_revert() {
        let ledger =
            VaultContractLedger::new("http://127.0.0.1:1", VAULT_CONTRACT_ADDRESS, PrivateKeySigner::random())
                .unwrap();
        assert!(matches!(ledger.get_entry(0).await, Err(LedgerError::Rpc(_))));
        assert!(matches!(
            ledger.user_entry_count(ledger.owner()).await,
            Err(LedgerError::Rpc(_))
        ));
    }

    #[test]
    fn abi_failures_are_rpc_errors() {
        let err = alloy::contract::Error::UnknownFunction("getEntry".to_string());
        assert!(matches!(call_error(err), LedgerError::Rpc(_)));
    }
}
