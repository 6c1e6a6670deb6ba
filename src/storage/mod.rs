// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Server-side persistence for the verification gate, in a single embedded
//! redb database file.
//!
//! ## Storage Layout
//!
//! ```text
//! $DATA_DIR/
//!   status.redb      # verification status, face templates, password hashes
//! ```
//!
//! Vault entries are not stored here. They live on the ledger as ciphertext
//! (see [`crate::blockchain`]).

pub mod status_db;

pub use status_db::{
    FaceRecord, PasswordRecord, StatusDatabase, StatusDbError, StatusDbResult, WalletRecord,
};
