// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Encryption Session
//!
//! Credential encryption is delegated to a threshold key-custody network:
//! plaintext never leaves the client unencrypted, and decryption keys are
//! released only to a wallet that proves, through a signed session
//! credential, that it satisfies the ciphertext's access condition.
//!
//! ## Module Structure
//!
//! | Module       | Contents                                               |
//! |--------------|--------------------------------------------------------|
//! | `conditions` | Access condition type and the vault's fixed condition  |
//! | `payload`    | `{ciphertext, dataToEncryptHash}` ledger payload       |
//! | `challenge`  | Signed sign-in challenge requesting a capability       |
//! | `credential` | Session credential and its single-flight cache         |
//! | `client`     | `KeyCustodyClient` trait and network errors            |
//! | `retry`      | One-shot retry on authorization failure                |
//! | `session`    | `EncryptionSession` manager                            |
//! | `dev_node`   | In-process custody node for development and tests      |

pub mod challenge;
pub mod client;
pub mod conditions;
pub mod credential;
pub mod dev_node;
pub mod error;
pub mod payload;
pub mod retry;
pub mod session;

pub use client::{CustodyError, KeyCustodyClient};
pub use conditions::{build_condition, AccessCondition};
pub use credential::SessionCredential;
pub use dev_node::LocalCustodyNode;
pub use error::EncryptionError;
pub use payload::EncryptedPayload;
pub use session::EncryptionSession;
