// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! PaasKeeper - Wallet-Bound Password Vault
//!
//! Website credentials are encrypted under a wallet-bound access condition
//! by a key-custody network and stored as opaque blobs on an EVM ledger.
//! Password setup and reset are gated behind time-boxed face verification.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Wallet-signature login and session tokens
//! - `biometrics` - Face embedding similarity, liveness, camera capture
//! - `blockchain` - Ledger interface and the `VaultStorage` contract
//! - `encryption` - Access conditions and the encryption session manager
//! - `storage` - Verification status database (redb)
//! - `vault` - Credential codec and vault orchestration
//! - `verification` - Verification gate state machine, service and controller
//! - `wallet` - Wallet provider and account events

pub mod api;
pub mod auth;
pub mod biometrics;
pub mod blockchain;
pub mod config;
pub mod encryption;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
pub mod telemetry;
pub mod vault;
pub mod verification;
pub mod wallet;
