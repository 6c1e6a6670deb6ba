// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Server-side verification operations.
//!
//! Every operation runs as one [`StatusDatabase::update`] call: load the
//! wallet record, collapse elapsed windows, check the section, run the
//! biometric or password check, and write the result. A failed check
//! returns an error and leaves the record untouched.
//!
//! The `*_at` variants take the current time explicitly; the plain variants
//! use the wall clock.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::gate::{self, GateAction};
use super::password;
use super::status::StatusView;
use super::{GateError, StatusSource, VerifyOutcome};
use crate::biometrics::similarity::is_match;
use crate::biometrics::{check_liveness, similarity, BiometricError, BiometricSample, FaceEmbedding};
use crate::models::WalletIdentity;
use crate::storage::{FaceRecord, PasswordRecord, StatusDatabase, WalletRecord};

pub struct VerificationService {
    db: Arc<StatusDatabase>,
}

impl VerificationService {
    pub fn new(db: Arc<StatusDatabase>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &StatusDatabase {
        &self.db
    }

    /// Current status; creates a default record on first access.
    pub fn status(&self, wallet: &WalletIdentity) -> Result<StatusView, GateError> {
        self.status_at(wallet, Utc::now())
    }

    pub fn status_at(
        &self,
        wallet: &WalletIdentity,
        now: DateTime<Utc>,
    ) -> Result<StatusView, GateError> {
        self.db.update(wallet, |record| {
            record.status.expire_at(now);
            Ok(view(wallet, record))
        })
    }

    pub fn face_verify(
        &self,
        wallet: &WalletIdentity,
        sample: &BiometricSample,
    ) -> Result<VerifyOutcome, GateError> {
        self.face_verify_at(wallet, sample, Utc::now())
    }

    /// Initial verification. Enrolls the face the first time; afterwards
    /// the sample must match the enrolled face.
    pub fn face_verify_at(
        &self,
        wallet: &WalletIdentity,
        sample: &BiometricSample,
        now: DateTime<Utc>,
    ) -> Result<VerifyOutcome, GateError> {
        check_liveness(sample.liveness_score)?;

        let outcome = self.db.update(wallet, |record| {
            record.status.expire_at(now);
            let next = gate::apply(&record.status, GateAction::InitialVerification, now)?;

            let (enrolled, score) = match record.face.as_mut() {
                None => {
                    record.face = Some(FaceRecord::enroll(sample.embedding.clone(), now));
                    (true, None)
                }
                Some(face) => {
                    let score = matching_score(&face.embedding, &sample.embedding)?;
                    face.record_verification(now);
                    (false, Some(score))
                }
            };

            record.status = next;
            Ok::<_, GateError>(VerifyOutcome {
                message: if enrolled {
                    "Face enrolled and verified".to_string()
                } else {
                    "Face verified".to_string()
                },
                enrolled,
                similarity: score,
                status: view(wallet, record),
            })
        })?;

        tracing::info!(
            wallet = %wallet,
            enrolled = outcome.enrolled,
            similarity = ?outcome.similarity,
            "Initial face verification succeeded"
        );
        Ok(outcome)
    }

    pub fn face_reverify(
        &self,
        wallet: &WalletIdentity,
        sample: &BiometricSample,
        replacement: Option<&FaceEmbedding>,
    ) -> Result<VerifyOutcome, GateError> {
        self.face_reverify_at(wallet, sample, replacement, Utc::now())
    }

    /// Re-verification before a password reset. On success the enrolled
    /// face is replaced with `replacement` (or the sample itself).
    pub fn face_reverify_at(
        &self,
        wallet: &WalletIdentity,
        sample: &BiometricSample,
        replacement: Option<&FaceEmbedding>,
        now: DateTime<Utc>,
    ) -> Result<VerifyOutcome, GateError> {
        check_liveness(sample.liveness_score)?;
        let replacement = replacement.unwrap_or(&sample.embedding);
        if replacement.len() != sample.embedding.len() {
            return Err(BiometricError::DimensionMismatch {
                expected: sample.embedding.len(),
                actual: replacement.len(),
            }
            .into());
        }

        let outcome = self.db.update(wallet, |record| {
            record.status.expire_at(now);
            let next = gate::apply(&record.status, GateAction::ReVerification, now)?;

            let face = record.face.as_mut().ok_or(GateError::NotEnrolled)?;
            let score = matching_score(&face.embedding, &sample.embedding)?;
            face.embedding = replacement.clone();
            face.record_verification(now);

            record.status = next;
            Ok::<_, GateError>(VerifyOutcome {
                message: "Face re-verified".to_string(),
                enrolled: false,
                similarity: Some(score),
                status: view(wallet, record),
            })
        })?;

        tracing::info!(
            wallet = %wallet,
            similarity = ?outcome.similarity,
            "Face re-verification succeeded"
        );
        Ok(outcome)
    }

    pub fn set_password(&self, wallet: &WalletIdentity, password: &str) -> Result<StatusView, GateError> {
        self.set_password_at(wallet, password, Utc::now())
    }

    /// Set the first password. Requires the initial-verification window.
    pub fn set_password_at(
        &self,
        wallet: &WalletIdentity,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<StatusView, GateError> {
        self.store_password(wallet, password, GateAction::SetPassword, now)
    }

    pub fn reset_password(
        &self,
        wallet: &WalletIdentity,
        password: &str,
    ) -> Result<StatusView, GateError> {
        self.reset_password_at(wallet, password, Utc::now())
    }

    /// Replace the password. Requires the re-verification window.
    pub fn reset_password_at(
        &self,
        wallet: &WalletIdentity,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<StatusView, GateError> {
        self.store_password(wallet, password, GateAction::ResetPassword, now)
    }

    /// Check a password against the stored hash. Does not touch the gate.
    pub fn verify_password(&self, wallet: &WalletIdentity, password: &str) -> Result<(), GateError> {
        let stored = self
            .db
            .get(wallet)?
            .and_then(|record| record.password)
            .ok_or(GateError::PasswordNotSet)?;

        if password::verify_password(password, &stored.hash)? {
            Ok(())
        } else {
            tracing::warn!(wallet = %wallet, "Password verification failed");
            Err(GateError::InvalidPassword)
        }
    }

    /// Bind this service to one wallet as a [`StatusSource`].
    pub fn scope(self: &Arc<Self>, wallet: WalletIdentity) -> WalletScope {
        WalletScope {
            service: self.clone(),
            wallet,
        }
    }

    fn store_password(
        &self,
        wallet: &WalletIdentity,
        password: &str,
        action: GateAction,
        now: DateTime<Utc>,
    ) -> Result<StatusView, GateError> {
        // Hash before opening the write transaction.
        let hash = password::hash_password(password)?;

        let status = self.db.update(wallet, |record| {
            record.status.expire_at(now);
            let next = gate::apply(&record.status, action, now)?;
            record.password = Some(PasswordRecord {
                hash,
                updated_at: now,
            });
            record.status = next;
            Ok::<_, GateError>(view(wallet, record))
        })?;

        tracing::info!(wallet = %wallet, ?action, "Password stored");
        Ok(status)
    }
}

fn view(wallet: &WalletIdentity, record: &WalletRecord) -> StatusView {
    StatusView::new(*wallet, record.status.clone(), record.face.is_some())
}

fn matching_score(enrolled: &FaceEmbedding, candidate: &FaceEmbedding) -> Result<f64, GateError> {
    let score = similarity(enrolled.as_slice(), candidate.as_slice())?;
    if !is_match(score) {
        return Err(BiometricError::SimilarityBelowThreshold { score }.into());
    }
    Ok(score)
}

/// A [`VerificationService`] bound to one wallet.
#[derive(Clone)]
pub struct WalletScope {
    service: Arc<VerificationService>,
    wallet: WalletIdentity,
}

impl StatusSource for WalletScope {
    async fn fetch_status(&self) -> Result<StatusView, GateError> {
        self.service.status(&self.wallet)
    }

    async fn face_verify(&self, sample: &BiometricSample) -> Result<VerifyOutcome, GateError> {
        self.service.face_verify(&self.wallet, sample)
    }

    async fn face_reverify(&self, sample: &BiometricSample) -> Result<VerifyOutcome, GateError> {
        self.service.face_reverify(&self.wallet, sample, None)
    }

    async fn set_password(&self, password: &str) -> Result<StatusView, GateError> {
        self.service.set_password(&self.wallet, password)
    }

    async fn reset_password(&self, password: &str) -> Result<StatusView, GateError> {
        self.service.reset_password(&self.wallet, password)
    }
}
