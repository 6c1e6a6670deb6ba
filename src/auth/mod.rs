// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Wallet-signature login for the PaasKeeper API.
//!
//! ## Auth Flow
//!
//! 1. The client asks the wallet to sign a login message (EIP-191)
//! 2. Client sends `POST /v1/auth/verify {address, message, signature}`
//! 3. Server:
//!    - Recovers the signer from the signature
//!    - Compares it to the claimed address (case-insensitive)
//!    - Issues an HS256 session token bound to that wallet
//! 4. Later requests send the token as `Authorization: Bearer <token>` or
//!    in the `paaskeeper_token` cookie
//!
//! ## Security
//!
//! - All `/v1/auth/*` endpoints except `verify` require a session
//! - A session only ever acts on its own wallet
//! - Tokens expire after one day; clock skew tolerance is 60 seconds

pub mod error;
pub mod extractor;
pub mod signature;
pub mod token;

pub use error::AuthError;
pub use extractor::Auth;
pub use signature::{recover_signer, verify_signer};
pub use token::{session_cookie, IssuedToken, TokenIssuer, SESSION_COOKIE};
