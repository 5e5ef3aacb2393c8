// SPDX-FileCopyrightText: 2026 Kure Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The record model: the [`Record`] capability trait, the partitions records
//! live in, and the name rules shared by every variant.

use serde::de::DeserializeOwned;
use serde::Serialize;
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::KureError;

/// Named subset of the key-value engine holding one record variant.
///
/// The string forms are persisted and must never change.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum Partition {
    Card,
    Entry,
    File,
    Wallet,
    Totp,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Card => "card",
            Partition::Entry => "entry",
            Partition::File => "file",
            Partition::Wallet => "wallet",
            Partition::Totp => "totp",
        }
    }
}

/// Capabilities a record variant supplies to the generic store.
///
/// Serialization comes from serde; the store only needs to know where the
/// variant lives, what it is called and, for expiring variants, when it
/// stops being valid.
pub trait Record: Serialize + DeserializeOwned + Send + 'static {
    /// Partition holding every record of this variant.
    const PARTITION: Partition;

    /// Whether reads must consult [`Record::expires`].
    const EXPIRES: bool = false;

    /// Display name, also the storage key once normalized.
    fn name(&self) -> &str;

    /// Expiry timestamp (RFC 1123) or the `"Never"` sentinel.
    fn expires(&self) -> Option<&str> {
        None
    }
}

/// Normalize a record name into its storage key: trimmed and lowercased.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Normalize and validate a record name.
///
/// Rejects empty names and names with empty path segments (`"a//b"`, `"/a"`,
/// `"a/"`), which could never be addressed as a folder.
pub fn validate_name(name: &str) -> Result<String, KureError> {
    let normalized = normalize_name(name);
    if normalized.is_empty() {
        return Err(KureError::InvalidInput("record name is empty".to_string()));
    }
    if normalized.split('/').any(|segment| segment.trim().is_empty()) {
        return Err(KureError::InvalidInput(format!(
            "record name \"{normalized}\" contains an empty path segment"
        )));
    }
    Ok(normalized)
}

/// Strict path prefixes of a normalized name, shortest first.
///
/// `"a/b/c"` yields `["a", "a/b"]`; a name without `/` yields nothing.
pub fn path_prefixes(name: &str) -> Vec<&str> {
    name.match_indices('/').map(|(idx, _)| &name[..idx]).collect()
}
