// SPDX-FileCopyrightText: 2026 Kure Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encrypted record persistence for the Kure vault.
//!
//! Provides WAL-mode SQLite storage with a single-writer concurrency model via
//! `tokio-rusqlite`, one lazily created table per record partition, the
//! generic [`RecordStore`], master password verification, and consistent
//! snapshots of the whole database.

pub mod auth;
pub mod database;
pub mod expiry;
pub mod snapshot;
pub mod store;

pub use auth::{AUTH_PARTITION, change_password, is_registered, login, register};
pub use database::Database;
pub use expiry::{ExpiryStatus, check_expiry, expiry_after};
pub use snapshot::{SnapshotExporter, import_encrypted, restore};
pub use store::RecordStore;

use kure_core::{Card, Entry, File, Totp, Wallet};

pub type EntryStore = RecordStore<Entry>;
pub type CardStore = RecordStore<Card>;
pub type FileStore = RecordStore<File>;
pub type WalletStore = RecordStore<Wallet>;
pub type TotpStore = RecordStore<Totp>;
