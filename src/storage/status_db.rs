// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-wallet verification database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `verification_status`: wallet → serialized VerificationStatus
//! - `face_embeddings`: wallet → serialized FaceRecord
//! - `password_hashes`: wallet → serialized PasswordRecord
//!
//! Keys are canonical lowercase wallet addresses.
//!
//! All three tables for a wallet are read and written inside a single redb
//! write transaction by [`StatusDatabase::update`], so a verification step
//! (read, expire, check, mutate) is atomic: either every field changes or
//! none does.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::biometrics::FaceEmbedding;
use crate::models::WalletIdentity;
use crate::verification::status::VerificationStatus;

// =============================================================================
// Table Definitions
// =============================================================================

const VERIFICATION_STATUS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("verification_status");

const FACE_EMBEDDINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("face_embeddings");

const PASSWORD_HASHES: TableDefinition<&str, &[u8]> = TableDefinition::new("password_hashes");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StatusDbError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type StatusDbResult<T> = Result<T, StatusDbError>;

// =============================================================================
// Records
// =============================================================================

/// Enrolled face template for a wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceRecord {
    pub embedding: FaceEmbedding,
    pub enrolled_at: DateTime<Utc>,
    pub last_verification: Option<DateTime<Utc>>,
    pub verification_count: u32,
}

impl FaceRecord {
    pub fn enroll(embedding: FaceEmbedding, now: DateTime<Utc>) -> Self {
        Self {
            embedding,
            enrolled_at: now,
            last_verification: Some(now),
            verification_count: 1,
        }
    }

    pub fn record_verification(&mut self, now: DateTime<Utc>) {
        self.verification_count = self.verification_count.saturating_add(1);
        self.last_verification = Some(now);
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordRecord {
    /// PHC-format argon2id hash.
    pub hash: String,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for PasswordRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordRecord")
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

/// Everything stored for one wallet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalletRecord {
    pub status: VerificationStatus,
    pub face: Option<FaceRecord>,
    pub password: Option<PasswordRecord>,
}

// =============================================================================
// StatusDatabase
// =============================================================================

pub struct StatusDatabase {
    db: Database,
}

impl StatusDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StatusDbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(VERIFICATION_STATUS)?;
            let _ = write_txn.open_table(FACE_EMBEDDINGS)?;
            let _ = write_txn.open_table(PASSWORD_HASHES)?;
        }
        write_txn.commit()?;

        tracing::info!(path = %path.display(), "Opened verification status database");
        Ok(Self { db })
    }

    /// Read a wallet's record without creating it.
    pub fn get(&self, wallet: &WalletIdentity) -> StatusDbResult<Option<WalletRecord>> {
        let key = wallet.canonical();
        let read_txn = self.db.begin_read()?;

        let status_table = read_txn.open_table(VERIFICATION_STATUS)?;
        let Some(status) = decode::<VerificationStatus>(status_table.get(key.as_str())?)? else {
            return Ok(None);
        };
        let face = decode(read_txn.open_table(FACE_EMBEDDINGS)?.get(key.as_str())?)?;
        let password = decode(read_txn.open_table(PASSWORD_HASHES)?.get(key.as_str())?)?;

        Ok(Some(WalletRecord {
            status,
            face,
            password,
        }))
    }

    /// Run `f` against the wallet's record inside one write transaction.
    ///
    /// A missing record starts from the default status and is created on
    /// commit. If `f` returns an error nothing is written.
    pub fn update<T, E>(
        &self,
        wallet: &WalletIdentity,
        f: impl FnOnce(&mut WalletRecord) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StatusDbError>,
    {
        let key = wallet.canonical();
        let write_txn = self.db.begin_write().map_err(StatusDbError::from)?;
        let (before, exists) = read_record(&write_txn, &key)?;

        let mut record = before.clone();
        let value = match f(&mut record) {
            Ok(value) => value,
            Err(e) => {
                write_txn.abort().map_err(StatusDbError::from)?;
                return Err(e);
            }
        };

        write_record(&write_txn, &key, &before, &record, exists)?;
        write_txn.commit().map_err(StatusDbError::from)?;
        Ok(value)
    }

    /// Readiness probe: a read transaction can be opened.
    pub fn ping(&self) -> StatusDbResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(VERIFICATION_STATUS)?;
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(
    guard: Option<redb::AccessGuard<'_, &[u8]>>,
) -> StatusDbResult<Option<T>> {
    guard
        .map(|value| serde_json::from_slice(value.value()))
        .transpose()
        .map_err(StatusDbError::from)
}

fn read_record(write_txn: &WriteTransaction, key: &str) -> StatusDbResult<(WalletRecord, bool)> {
    let status_table = write_txn.open_table(VERIFICATION_STATUS)?;
    let status: Option<VerificationStatus> = decode(status_table.get(key)?)?;
    let face_table = write_txn.open_table(FACE_EMBEDDINGS)?;
    let face = decode(face_table.get(key)?)?;
    let password_table = write_txn.open_table(PASSWORD_HASHES)?;
    let password = decode(password_table.get(key)?)?;

    let exists = status.is_some();
    Ok((
        WalletRecord {
            status: status.unwrap_or_default(),
            face,
            password,
        },
        exists,
    ))
}

fn write_record(
    write_txn: &WriteTransaction,
    key: &str,
    before: &WalletRecord,
    after: &WalletRecord,
    exists: bool,
) -> StatusDbResult<()> {
    if !exists || after.status != before.status {
        let json = serde_json::to_vec(&after.status)?;
        write_txn
            .open_table(VERIFICATION_STATUS)?
            .insert(key, json.as_slice())?;
    }

    if after.face != before.face {
        let mut table = write_txn.open_table(FACE_EMBEDDINGS)?;
        match &after.face {
            Some(face) => {
                let json = serde_json::to_vec(face)?;
                table.insert(key, json.as_slice())?;
            }
            None => {
                table.remove(key)?;
            }
        }
    }

    if after.password != before.password {
        let mut table = write_txn.open_table(PASSWORD_HASHES)?;
        match &after.password {
            Some(password) => {
                let json = serde_json::to_vec(password)?;
                table.insert(key, json.as_slice())?;
            }
            None => {
                table.remove(key)?;
            }
        }
    }
    Ok(())
}
