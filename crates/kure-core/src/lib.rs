// SPDX-FileCopyrightText: 2026 Kure Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Kure encrypted record store.
//!
//! Provides the workspace-wide error type and the record model: the five
//! record variants, the partitions they are stored in, and the naming rules
//! every partition enforces.

pub mod error;
pub mod record;
pub mod types;

pub use error::KureError;
pub use record::{Partition, Record, normalize_name, path_prefixes, validate_name};
pub use types::{Card, Entry, File, NEVER, Totp, Wallet};
