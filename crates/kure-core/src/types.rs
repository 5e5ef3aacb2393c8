// SPDX-FileCopyrightText: 2026 Kure Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record variants stored in the vault.
//!
//! `Debug` output of every variant redacts secret fields so records can be
//! traced and asserted on without leaking their payload.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::{Partition, Record};

/// Sentinel stored in [`Entry::expires`] for entries that never expire.
pub const NEVER: &str = "Never";

const REDACTED: &str = "[REDACTED]";

/// Login credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub notes: String,
    /// RFC 1123 timestamp or [`NEVER`].
    #[serde(default = "never")]
    pub expires: String,
}

fn never() -> String {
    NEVER.to_string()
}

impl Entry {
    /// Create an entry that never expires.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            username: String::new(),
            password: String::new(),
            url: String::new(),
            notes: String::new(),
            expires: never(),
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &REDACTED)
            .field("url", &self.url)
            .field("notes", &REDACTED)
            .field("expires", &self.expires)
            .finish()
    }
}

impl Record for Entry {
    const PARTITION: Partition = Partition::Entry;
    const EXPIRES: bool = true;

    fn name(&self) -> &str {
        &self.name
    }

    fn expires(&self) -> Option<&str> {
        Some(&self.expires)
    }
}

/// Payment card.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub name: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub security_code: String,
    #[serde(default)]
    pub expire_date: String,
    #[serde(default)]
    pub notes: String,
}

impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Card")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("number", &REDACTED)
            .field("security_code", &REDACTED)
            .field("expire_date", &self.expire_date)
            .field("notes", &REDACTED)
            .finish()
    }
}

impl Record for Card {
    const PARTITION: Partition = Partition::Card;

    fn name(&self) -> &str {
        &self.name
    }
}

/// Arbitrary file contents.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub name: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default, with = "base64_bytes")]
    pub content: Vec<u8>,
    #[serde(default)]
    pub size: u64,
    /// Unix timestamp (seconds) of when the file was added.
    #[serde(default)]
    pub created_at: i64,
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("name", &self.name)
            .field("filename", &self.filename)
            .field("content", &format_args!("<{} bytes>", self.content.len()))
            .field("size", &self.size)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl Record for File {
    const PARTITION: Partition = Partition::File;

    fn name(&self) -> &str {
        &self.name
    }
}

/// Cryptocurrency wallet.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub name: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub script_type: String,
    #[serde(default)]
    pub keystore_type: String,
    #[serde(default)]
    pub seed_phrase: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(default)]
    pub private_key: String,
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("script_type", &self.script_type)
            .field("keystore_type", &self.keystore_type)
            .field("seed_phrase", &REDACTED)
            .field("public_key", &self.public_key)
            .field("private_key", &REDACTED)
            .finish()
    }
}

impl Record for Wallet {
    const PARTITION: Partition = Partition::Wallet;

    fn name(&self) -> &str {
        &self.name
    }
}

/// One-time-password seed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totp {
    pub name: String,
    /// Base32-encoded shared secret.
    #[serde(default)]
    pub raw: String,
    #[serde(default = "default_digits")]
    pub digits: u8,
}

fn default_digits() -> u8 {
    6
}

impl fmt::Debug for Totp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Totp")
            .field("name", &self.name)
            .field("raw", &REDACTED)
            .field("digits", &self.digits)
            .finish()
    }
}

impl Record for Totp {
    const PARTITION: Partition = Partition::Totp;

    fn name(&self) -> &str {
        &self.name
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_secrets() {
        let mut entry = Entry::new("github");
        entry.password = "hunter2".to_string();
        let out = format!("{entry:?}");
        assert!(out.contains("github"));
        assert!(!out.contains("hunter2"));

        let wallet = Wallet {
            name: "btc".into(),
            kind: "bitcoin".into(),
            script_type: String::new(),
            keystore_type: String::new(),
            seed_phrase: "abandon abandon about".into(),
            public_key: "xpub".into(),
            private_key: "xprv-secret".into(),
        };
        let out = format!("{wallet:?}");
        assert!(!out.contains("abandon"));
        assert!(!out.contains("xprv-secret"));
    }

    #[test]
    fn entry_defaults_to_never() {
        let entry: Entry = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert_eq!(entry.expires, NEVER);
        assert_eq!(entry.expires(), Some(NEVER));
    }

    #[test]
    fn file_content_serializes_as_base64() {
        let file = File {
            name: "keys/ssh".into(),
            filename: "id_ed25519".into(),
            content: vec![0, 159, 255],
            size: 3,
            created_at: 1_700_000_000,
        };
        let json = serde_json::to_string(&file).unwrap();
        assert!(json.contains("\"AJ//\""));
        let back: File = serde_json::from_str(&json).unwrap();
        assert_eq!(back, file);
    }

    #[test]
    fn totp_digits_default_to_six() {
        let totp: Totp = serde_json::from_str(r#"{"name":"aws","raw":"JBSWY3DP"}"#).unwrap();
        assert_eq!(totp.digits, 6);
        assert!(!Totp::EXPIRES);
        assert!(Entry::EXPIRES);
    }
}
