// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Wallet Integration
//!
//! The wallet is the user's only identity. This module abstracts the
//! capabilities the rest of the crate needs from it:
//!
//! - **provider**: current address, message signing, network switching
//! - **events**: account/chain change notifications with scoped subscriptions

pub mod events;
pub mod provider;

pub use events::{Subscription, WalletEvent, WalletEventHub};
pub use provider::{LocalWalletProvider, WalletError, WalletProvider};
