// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Master password hashing (argon2id, PHC strings).
//!
//! Passwords are NFKC-normalized before hashing so the same password typed
//! on different keyboards/IMEs verifies.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use unicode_normalization::UnicodeNormalization;

use super::GateError;

pub const MIN_PASSWORD_LEN: usize = 6;

fn normalize(password: &str) -> String {
    password.nfkc().collect()
}

/// Reject passwords shorter than [`MIN_PASSWORD_LEN`] characters.
pub fn validate(password: &str) -> Result<(), GateError> {
    if normalize(password).chars().count() < MIN_PASSWORD_LEN {
        return Err(GateError::PasswordTooShort(MIN_PASSWORD_LEN));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, GateError> {
    validate(password)?;
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(normalize(password).as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| GateError::Hashing(e.to_string()))
}

pub fn verify_password(password: &str, phc: &str) -> Result<bool, GateError> {
    let parsed = PasswordHash::new(phc).map_err(|e| GateError::Hashing(e.to_string()))?;
    match Argon2::default().verify_password(normalize(password).as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(GateError::Hashing(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let phc = hash_password("correct horse").unwrap();
        assert!(phc.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &phc).unwrap());
        assert!(!verify_password("wrong horse", &phc).unwrap());
    }

    #[test]
    fn salts_differ() {
        assert_ne!(hash_password("abcdef").unwrap(), hash_password("abcdef").unwrap());
    }

    #[test]
    fn short_passwords_rejected() {
        assert!(matches!(validate("12345"), Err(GateError::PasswordTooShort(6))));
        assert!(validate("123456").is_ok());
    }

    #[test]
    fn normalization_equivalent_forms_verify() {
        // "ﬁ" (U+FB01) normalizes to "fi" under NFKC.
        let phc = hash_password("pro\u{FB01}le!").unwrap();
        assert!(verify_password("profile!", &phc).unwrap());
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert!(verify_password("whatever", "not-a-phc-string").is_err());
    }
}
