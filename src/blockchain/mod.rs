// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! On-chain ledger for encrypted vault entries.
//!
//! This module provides:
//! - The `Ledger` contract the vault service writes through
//! - An in-memory ledger for development and tests
//! - The alloy binding of the deployed `VaultStorage` contract

pub mod ledger;
pub mod types;
pub mod vault_contract;

pub use ledger::{InMemoryLedger, Ledger, LedgerError};
pub use types::*;
pub use vault_contract::VaultContractLedger;
