// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Verification Gate
//!
//! Biometric gating of password setup and password reset.
//!
//! A wallet's record moves through four sections (see [`status`]). The two
//! "open" sections last 60 seconds; after that the next read collapses them.
//!
//! ## Module Structure
//!
//! - `status`: persisted flags, section derivation, lazy expiry
//! - `gate`: pure transition function
//! - `password`: argon2id hashing
//! - `service`: server-side operations, one redb transaction each
//! - `client`: HTTP [`StatusSource`] for remote gate controllers
//! - `timer`: local countdown for an open window
//! - `controller`: client-side gate driver (camera + timer + status source)

pub mod client;
pub mod controller;
pub mod gate;
pub mod password;
pub mod service;
pub mod status;
pub mod timer;

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use client::StatusClient;
pub use controller::GateController;
pub use gate::GateAction;
pub use service::{VerificationService, WalletScope};
pub use status::{GateSection, StatusView, VerificationStatus};

use crate::biometrics::{BiometricError, BiometricSample};
use crate::storage::StatusDbError;

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error(transparent)]
    Biometric(#[from] BiometricError),

    #[error("{action} is not allowed while {section}")]
    SectionLocked {
        action: GateAction,
        section: GateSection,
    },

    #[error("no face enrolled for this wallet")]
    NotEnrolled,

    #[error("password not set")]
    PasswordNotSet,

    #[error("invalid password")]
    InvalidPassword,

    #[error("password must be at least {0} characters long")]
    PasswordTooShort(usize),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Storage(#[from] StatusDbError),

    #[error("status service returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("status service unreachable: {0}")]
    Transport(String),
}

/// Result of a successful face verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOutcome {
    pub message: String,
    /// True when this verification enrolled the face for the first time.
    pub enrolled: bool,
    /// Similarity to the enrolled face; absent on first enrollment.
    pub similarity: Option<f64>,
    pub status: StatusView,
}

/// Gate operations for one wallet, local or remote.
pub trait StatusSource: Send + Sync {
    fn fetch_status(&self) -> impl Future<Output = Result<StatusView, GateError>> + Send;

    fn face_verify(
        &self,
        sample: &BiometricSample,
    ) -> impl Future<Output = Result<VerifyOutcome, GateError>> + Send;

    fn face_reverify(
        &self,
        sample: &BiometricSample,
    ) -> impl Future<Output = Result<VerifyOutcome, GateError>> + Send;

    fn set_password(
        &self,
        password: &str,
    ) -> impl Future<Output = Result<StatusView, GateError>> + Send;

    fn reset_password(
        &self,
        password: &str,
    ) -> impl Future<Output = Result<StatusView, GateError>> + Send;
}

impl<S: StatusSource> StatusSource for Arc<S> {
    fn fetch_status(&self) -> impl Future<Output = Result<StatusView, GateError>> + Send {
        (**self).fetch_status()
    }

    fn face_verify(
        &self,
        sample: &BiometricSample,
    ) -> impl Future<Output = Result<VerifyOutcome, GateError>> + Send {
        (**self).face_verify(sample)
    }

    fn face_reverify(
        &self,
        sample: &BiometricSample,
    ) -> impl Future<Output = Result<VerifyOutcome, GateError>> + Send {
        (**self).face_reverify(sample)
    }

    fn set_password(
        &self,
        password: &str,
    ) -> impl Future<Output = Result<StatusView, GateError>> + Send {
        (**self).set_password(password)
    }

    fn reset_password(
        &self,
        password: &str,
    ) -> impl Future<Output = Result<StatusView, GateError>> + Send {
        (**self).reset_password(password)
    }
}
