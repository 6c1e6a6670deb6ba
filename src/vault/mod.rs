// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Credential Vault
//!
//! Website credentials are encoded, encrypted under the vault's access
//! condition, and stored on the ledger as opaque payloads.

pub mod codec;
pub mod service;

pub use codec::{decode, encode, CodecError, CredentialRecord};
pub use service::{VaultEntry, VaultError, VaultService};
