// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Biometrics
//!
//! Face verification works on fixed-length numeric embeddings produced by an
//! external feature extractor. This module compares embeddings and manages
//! the camera resource used to capture them.

pub mod capture;
pub mod similarity;

pub use capture::{BiometricSample, CameraDevice, CameraStream, CaptureHandle, CaptureSession};
pub use similarity::{
    check_liveness, similarity, FaceEmbedding, LIVENESS_THRESHOLD, SIMILARITY_THRESHOLD,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BiometricError {
    #[error("embedding dimensions differ: {expected} vs {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid face embedding: {0}")]
    InvalidEmbedding(String),

    #[error("Liveness check failed (score {score:.2}). Please ensure you are a real person.")]
    LivenessFailed { score: f64 },

    #[error("Face verification failed (similarity {score:.2})")]
    SimilarityBelowThreshold { score: f64 },

    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    #[error("no face detected in frame")]
    NoFaceDetected,

    #[error("capture cancelled")]
    CaptureCancelled,
}
