// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::storage::StatusDatabase;
use crate::verification::VerificationService;

#[derive(Clone)]
pub struct AppState {
    pub verification: Arc<VerificationService>,
    pub tokens: TokenIssuer,
    /// Mark the session cookie `Secure`.
    pub cookie_secure: bool,
}

impl AppState {
    pub fn new(db: StatusDatabase, tokens: TokenIssuer) -> Self {
        Self {
            verification: Arc::new(VerificationService::new(Arc::new(db))),
            tokens,
            cookie_secure: false,
        }
    }

    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }
}

/// State backed by a throwaway database, for handler and extractor tests.
#[cfg(test)]
pub(crate) fn test_state() -> (AppState, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let db = StatusDatabase::open(&dir.path().join("status.redb")).expect("Failed to open status db");
    (AppState::new(db, TokenIssuer::new(b"test-secret-test-secret-test-secret")), dir)
}
