// SPDX-FileCopyrightText: 2026 Kure Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixtures for storage integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use kure_core::{Card, Entry, Record};
use kure_crypt::{KdfParams, Session};
use kure_storage::{Database, RecordStore};
use tempfile::TempDir;

/// An expiry far in the past.
pub const LONG_AGO: &str = "Mon, 02 Jan 2006 15:04:05 GMT";

/// An expiry far in the future.
pub const FAR_FUTURE: &str = "Fri, 01 Jan 2100 00:00:00 GMT";

pub const PASSWORD: &[u8] = b"correct horse battery staple";

/// A database in a temporary directory with an unlocked session.
pub struct TestVault {
    pub dir: TempDir,
    pub db: Database,
    pub session: Arc<Session>,
}

impl TestVault {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::open(dir.path().join("kure.db"))
            .await
            .expect("open database");
        let session = Arc::new(
            Session::unlocked(KdfParams::insecure_fast(), PASSWORD).expect("unlock session"),
        );
        Self { dir, db, session }
    }

    pub fn store<T: Record>(&self) -> RecordStore<T> {
        RecordStore::new(self.db.clone(), Arc::clone(&self.session))
    }

    pub fn db_path(&self) -> PathBuf {
        self.db.path().to_path_buf()
    }
}

pub fn entry(name: &str, password: &str) -> Entry {
    let mut entry = Entry::new(name);
    entry.username = "me@example.com".to_string();
    entry.password = password.to_string();
    entry.url = "https://example.com".to_string();
    entry
}

pub fn expiring_entry(name: &str, expires: &str) -> Entry {
    let mut entry = entry(name, "temporary");
    entry.expires = expires.to_string();
    entry
}

pub fn card(name: &str) -> Card {
    Card {
        name: name.to_string(),
        kind: "credit".to_string(),
        number: "5555 4444 3333 1111".to_string(),
        security_code: "737".to_string(),
        expire_date: "03/30".to_string(),
        notes: String::new(),
    }
}
