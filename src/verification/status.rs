// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Verification Status
//!
//! Per-wallet record of which gate is open:
//!
//! | has_password | is_verified | is_re_verified | Section                    |
//! |--------------|-------------|----------------|----------------------------|
//! | false        | false       | -              | `NeedsInitialVerification` |
//! | false        | true        | -              | `CanSetPassword`           |
//! | true         | -           | false          | `NeedsReVerification`      |
//! | true         | -           | true           | `CanResetPassword`         |
//!
//! Windows are not swept by a background job. Every read calls
//! [`VerificationStatus::expire_at`] first, which collapses a window whose
//! expiry is in the past.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::WalletIdentity;

/// Length of a verification window.
pub const VERIFICATION_WINDOW_SECS: i64 = 60;

pub fn verification_window() -> Duration {
    Duration::seconds(VERIFICATION_WINDOW_SECS)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStatus {
    pub has_password: bool,
    pub is_verified: bool,
    pub verification_expiry: Option<DateTime<Utc>>,
    pub is_re_verified: bool,
    pub re_verification_expiry: Option<DateTime<Utc>>,
}

/// The single unlocked gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum GateSection {
    NeedsInitialVerification,
    CanSetPassword,
    NeedsReVerification,
    CanResetPassword,
}

impl GateSection {
    /// The section a timed-out window falls back to.
    pub fn collapsed(self) -> Self {
        match self {
            GateSection::CanSetPassword => GateSection::NeedsInitialVerification,
            GateSection::CanResetPassword => GateSection::NeedsReVerification,
            other => other,
        }
    }

    pub fn is_window(self) -> bool {
        matches!(
            self,
            GateSection::CanSetPassword | GateSection::CanResetPassword
        )
    }

    /// Sections where the camera is used.
    pub fn needs_face(self) -> bool {
        matches!(
            self,
            GateSection::NeedsInitialVerification | GateSection::NeedsReVerification
        )
    }
}

impl fmt::Display for GateSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GateSection::NeedsInitialVerification => "awaiting initial verification",
            GateSection::CanSetPassword => "password setup is open",
            GateSection::NeedsReVerification => "awaiting re-verification",
            GateSection::CanResetPassword => "password reset is open",
        };
        f.write_str(s)
    }
}

impl VerificationStatus {
    /// Collapse any window that has elapsed at `now`. Returns whether the
    /// record changed.
    ///
    /// A flag set without an expiry is treated as elapsed.
    pub fn expire_at(&mut self, now: DateTime<Utc>) -> bool {
        let mut changed = false;

        if self.is_verified && self.verification_expiry.is_none_or(|exp| now > exp) {
            tracing::debug!("Initial verification window elapsed");
            self.is_verified = false;
            self.verification_expiry = None;
            changed = true;
        } else if !self.is_verified && self.verification_expiry.is_some() {
            self.verification_expiry = None;
            changed = true;
        }

        if self.is_re_verified && self.re_verification_expiry.is_none_or(|exp| now > exp) {
            tracing::debug!("Re-verification window elapsed");
            self.is_re_verified = false;
            self.re_verification_expiry = None;
            changed = true;
        } else if !self.is_re_verified && self.re_verification_expiry.is_some() {
            self.re_verification_expiry = None;
            changed = true;
        }

        changed
    }

    pub fn section(&self) -> GateSection {
        match (self.has_password, self.is_verified, self.is_re_verified) {
            (false, false, _) => GateSection::NeedsInitialVerification,
            (false, true, _) => GateSection::CanSetPassword,
            (true, _, false) => GateSection::NeedsReVerification,
            (true, _, true) => GateSection::CanResetPassword,
        }
    }

    /// Expiry of the open window, if the current section is one.
    pub fn window_expiry(&self) -> Option<DateTime<Utc>> {
        match self.section() {
            GateSection::CanSetPassword => self.verification_expiry,
            GateSection::CanResetPassword => self.re_verification_expiry,
            _ => None,
        }
    }
}

/// Status as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    #[schema(value_type = String, example = "0x742d35cc6634c0532925a3b844bc9e7595f4ab12")]
    pub wallet_address: WalletIdentity,
    #[serde(flatten)]
    pub status: VerificationStatus,
    pub section: GateSection,
    pub has_face_enrolled: bool,
}

impl StatusView {
    pub fn new(wallet: WalletIdentity, status: VerificationStatus, has_face_enrolled: bool) -> Self {
        Self {
            wallet_address: wallet,
            section: status.section(),
            status,
            has_face_enrolled,
        }
    }
}
