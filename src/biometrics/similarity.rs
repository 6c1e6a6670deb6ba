// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedding comparison.
//!
//! Similarity is `exp(-d)` where `d` is the Euclidean distance between two
//! embeddings of equal length:
//!
//! | distance | similarity |
//! |----------|------------|
//! | 0        | 1.0        |
//! | 0.51     | ~0.60      |
//! | 1        | ~0.37      |
//!
//! Two embeddings belong to the same person when similarity is at least
//! [`SIMILARITY_THRESHOLD`].

use serde::{Deserialize, Serialize};

use super::BiometricError;

pub const SIMILARITY_THRESHOLD: f64 = 0.6;
pub const LIVENESS_THRESHOLD: f64 = 0.9;
pub const MAX_EMBEDDING_LEN: usize = 1024;

/// A validated face embedding: non-empty, finite, bounded length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct FaceEmbedding(Vec<f64>);

impl FaceEmbedding {
    pub fn new(values: Vec<f64>) -> Result<Self, BiometricError> {
        if values.is_empty() {
            return Err(BiometricError::InvalidEmbedding("embedding is empty".to_string()));
        }
        if values.len() > MAX_EMBEDDING_LEN {
            return Err(BiometricError::InvalidEmbedding(format!(
                "embedding has {} elements (max {MAX_EMBEDDING_LEN})",
                values.len()
            )));
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(BiometricError::InvalidEmbedding(format!(
                "element {i} is not a finite number"
            )));
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn similarity_to(&self, other: &FaceEmbedding) -> Result<f64, BiometricError> {
        similarity(&self.0, &other.0)
    }
}

impl TryFrom<Vec<f64>> for FaceEmbedding {
    type Error = BiometricError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl From<FaceEmbedding> for Vec<f64> {
    fn from(embedding: FaceEmbedding) -> Self {
        embedding.0
    }
}

/// `exp(-euclidean(a, b))`. Errors if the lengths differ.
pub fn similarity(a: &[f64], b: &[f64]) -> Result<f64, BiometricError> {
    if a.len() != b.len() {
        return Err(BiometricError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    let distance = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt();
    Ok((-distance).exp())
}

pub fn is_match(score: f64) -> bool {
    score >= SIMILARITY_THRESHOLD
}

/// Reject samples whose liveness score is below [`LIVENESS_THRESHOLD`].
pub fn check_liveness(score: f64) -> Result<(), BiometricError> {
    // NaN fails too.
    if score >= LIVENESS_THRESHOLD {
        Ok(())
    } else {
        Err(BiometricError::LivenessFailed { score })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_embeddings_score_one() {
        let a = [0.1, 0.2, 0.3, 0.4];
        assert_eq!(similarity(&a, &a).unwrap(), 1.0);
    }

    #[test]
    fn similarity_is_symmetric_and_below_one() {
        let a = [0.1, 0.5, -0.3];
        let b = [0.2, 0.4, -0.1];
        let ab = similarity(&a, &b).unwrap();
        let ba = similarity(&b, &a).unwrap();
        assert_eq!(ab, ba);
        assert!(ab < 1.0);
        assert!(ab > 0.0);
    }

    #[test]
    fn known_distance() {
        // distance 1 along one axis
        let s = similarity(&[0.0, 0.0], &[1.0, 0.0]).unwrap();
        assert!((s - (-1.0f64).exp()).abs() < 1e-12);
        assert!(!is_match(s));
    }

    #[test]
    fn threshold_is_inclusive() {
        let d = -SIMILARITY_THRESHOLD.ln();
        let s = similarity(&[0.0], &[d]).unwrap();
        assert!((s - SIMILARITY_THRESHOLD).abs() < 1e-12);
        assert!(is_match(0.6));
        assert!(!is_match(0.599_999));
    }

    #[test]
    fn length_mismatch_is_an_error() {
        assert_eq!(
            similarity(&[0.0, 1.0], &[0.0]),
            Err(BiometricError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn liveness_boundary() {
        assert!(check_liveness(0.9).is_ok());
        assert!(check_liveness(0.95).is_ok());
        assert!(matches!(
            check_liveness(0.89),
            Err(BiometricError::LivenessFailed { .. })
        ));
        assert!(check_liveness(f64::NAN).is_err());
    }

    #[test]
    fn embedding_validation() {
        assert!(FaceEmbedding::new(vec![]).is_err());
        assert!(FaceEmbedding::new(vec![0.0, f64::INFINITY]).is_err());
        assert!(FaceEmbedding::new(vec![0.0; MAX_EMBEDDING_LEN + 1]).is_err());
        assert_eq!(FaceEmbedding::new(vec![0.5; 128]).unwrap().len(), 128);
    }

    #[test]
    fn embedding_deserialization_validates() {
        let ok: FaceEmbedding = serde_json::from_str("[0.1, 0.2]").unwrap();
        assert_eq!(ok.as_slice(), &[0.1, 0.2]);
        assert!(serde_json::from_str::<FaceEmbedding>("[]").is_err());
    }
}
