// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gate state machine transitions.
//!
//! ```text
//!                       face verified
//!   NeedsInitialVerification ──────────> CanSetPassword ──(60s)──┐
//!            ^                                │                   │
//!            └────────────────────────────────┼───────────────────┘
//!                                   password set
//!                                             v
//!                       face re-verified
//!   NeedsReVerification ───────────────> CanResetPassword ──(60s)──┐
//!            ^                                │                     │
//!            └──────── password reset ────────┴─────────────────────┘
//! ```
//!
//! [`apply`] is pure: it takes an already-expired status and returns the
//! next one, or [`GateError::SectionLocked`] if the event is not allowed in
//! the current section.

use std::fmt;

use chrono::{DateTime, Utc};

use super::status::{verification_window, GateSection, VerificationStatus};
use super::GateError;

/// Something the user attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateAction {
    InitialVerification,
    SetPassword,
    ReVerification,
    ResetPassword,
}

impl GateAction {
    /// The only section in which this action is allowed.
    pub fn required_section(self) -> GateSection {
        match self {
            GateAction::InitialVerification => GateSection::NeedsInitialVerification,
            GateAction::SetPassword => GateSection::CanSetPassword,
            GateAction::ReVerification => GateSection::NeedsReVerification,
            GateAction::ResetPassword => GateSection::CanResetPassword,
        }
    }
}

impl fmt::Display for GateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GateAction::InitialVerification => "initial verification",
            GateAction::SetPassword => "setting a password",
            GateAction::ReVerification => "re-verification",
            GateAction::ResetPassword => "resetting the password",
        };
        f.write_str(s)
    }
}

/// Check that `action` is allowed for `status`.
pub fn ensure_allowed(status: &VerificationStatus, action: GateAction) -> Result<(), GateError> {
    let section = status.section();
    if section == action.required_section() {
        Ok(())
    } else {
        Err(GateError::SectionLocked { action, section })
    }
}

/// Apply a successful `action` at `now`.
pub fn apply(
    status: &VerificationStatus,
    action: GateAction,
    now: DateTime<Utc>,
) -> Result<VerificationStatus, GateError> {
    ensure_allowed(status, action)?;

    let mut next = status.clone();
    match action {
        GateAction::InitialVerification => {
            next.is_verified = true;
            next.verification_expiry = Some(now + verification_window());
        }
        GateAction::SetPassword => {
            next.has_password = true;
            next.is_verified = false;
            next.verification_expiry = None;
        }
        GateAction::ReVerification => {
            next.is_re_verified = true;
            next.re_verification_expiry = Some(now + verification_window());
        }
        GateAction::ResetPassword => {
            next.is_re_verified = false;
            next.re_verification_expiry = None;
        }
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn full_lifecycle() {
        let s0 = VerificationStatus::default();
        let s1 = apply(&s0, GateAction::InitialVerification, t0()).unwrap();
        assert_eq!(s1.section(), GateSection::CanSetPassword);
        assert_eq!(s1.verification_expiry, Some(t0() + Duration::seconds(60)));

        let s2 = apply(&s1, GateAction::SetPassword, t0()).unwrap();
        assert_eq!(s2.section(), GateSection::NeedsReVerification);
        assert!(s2.has_password);
        assert!(!s2.is_verified);

        let s3 = apply(&s2, GateAction::ReVerification, t0()).unwrap();
        assert_eq!(s3.section(), GateSection::CanResetPassword);

        let s4 = apply(&s3, GateAction::ResetPassword, t0()).unwrap();
        assert_eq!(s4.section(), GateSection::NeedsReVerification);
        assert!(s4.has_password);
    }

    #[test]
    fn actions_outside_their_section_are_locked() {
        let s0 = VerificationStatus::default();
        for action in [
            GateAction::SetPassword,
            GateAction::ReVerification,
            GateAction::ResetPassword,
        ] {
            assert!(matches!(
                apply(&s0, action, t0()),
                Err(GateError::SectionLocked {
                    section: GateSection::NeedsInitialVerification,
                    ..
                })
            ));
        }
    }

    #[test]
    fn cannot_verify_again_while_window_open() {
        let s1 = apply(&VerificationStatus::default(), GateAction::InitialVerification, t0())
            .unwrap();
        assert!(apply(&s1, GateAction::InitialVerification, t0()).is_err());
    }

    #[test]
    fn at_most_one_section_unlocked() {
        let mut s = apply(&VerificationStatus::default(), GateAction::InitialVerification, t0())
            .unwrap();
        s = apply(&s, GateAction::SetPassword, t0()).unwrap();
        s = apply(&s, GateAction::ReVerification, t0()).unwrap();
        // Password exists, so the initial flag cannot reopen setup.
        assert!(!s.is_verified);
        assert_eq!(s.section(), GateSection::CanResetPassword);
    }
}
