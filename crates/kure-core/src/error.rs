// SPDX-FileCopyrightText: 2026 Kure Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Kure record store.

use thiserror::Error;

/// The error type returned by every Kure crate.
///
/// `CryptoFailure` carries no detail: a wrong password, a truncated blob
/// and a tampered tag all produce the same value and the same message.
#[derive(Debug, Error)]
pub enum KureError {
    /// No record with this name exists in the partition (or it expired).
    #[error("{partition} \"{name}\" does not exist")]
    NotFound { partition: String, name: String },

    /// A record, or a folder of records, already uses this name.
    #[error("{partition} \"{name}\" already exists")]
    AlreadyExists { partition: String, name: String },

    /// The payload decrypted but is not a valid record.
    #[error("corrupted record: {0}")]
    Corrupt(String),

    /// Authenticated decryption failed.
    #[error("decryption failed")]
    CryptoFailure,

    /// Key-value engine errors (transaction, query or I/O failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors (invalid derivation parameters, bad paths).
    #[error("configuration error: {0}")]
    Config(String),

    /// The caller supplied an unusable value (empty name, empty payload).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The session holds no master password.
    #[error("session is locked")]
    Locked,

    /// Internal or unexpected errors (RNG, memory protection).
    #[error("internal error: {0}")]
    Internal(String),
}

impl KureError {
    /// Wrap any engine-level error as [`KureError::Storage`].
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        KureError::Storage {
            source: Box::new(err),
        }
    }

    pub fn not_found(partition: impl Into<String>, name: impl Into<String>) -> Self {
        KureError::NotFound {
            partition: partition.into(),
            name: name.into(),
        }
    }

    pub fn already_exists(partition: impl Into<String>, name: impl Into<String>) -> Self {
        KureError::AlreadyExists {
            partition: partition.into(),
            name: name.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, KureError::NotFound { .. })
    }

    /// Message suitable for showing to the person at the terminal.
    pub fn user_message(&self) -> String {
        match self {
            KureError::CryptoFailure => "wrong password or corrupted data".to_string(),
            other => other.to_string(),
        }
    }
}
