// SPDX-FileCopyrightText: 2026 Kure Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lazy expiry of entries.
//!
//! `expires` holds either [`NEVER`] or an RFC 1123 timestamp such as
//! `Mon, 02 Jan 2006 15:04:05 GMT`. Reads evaluate it against the current
//! time; nothing runs in the background.

use chrono::{DateTime, Duration, Utc};
use kure_core::{KureError, NEVER};

/// Format written by [`expiry_after`].
pub const EXPIRY_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Outcome of comparing an expiry timestamp with the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryStatus {
    Valid,
    Expired,
}

/// Decide whether `expires` has passed at `now`.
///
/// An instant equal to `now` counts as expired. An empty string is treated
/// like [`NEVER`]; any other unparsable value is [`KureError::Corrupt`].
pub fn check_expiry(expires: &str, now: DateTime<Utc>) -> Result<ExpiryStatus, KureError> {
    let expires = expires.trim();
    if expires.is_empty() || expires.eq_ignore_ascii_case(NEVER) {
        return Ok(ExpiryStatus::Valid);
    }

    let at = parse_expiry(expires)?;
    Ok(if at <= now {
        ExpiryStatus::Expired
    } else {
        ExpiryStatus::Valid
    })
}

fn parse_expiry(value: &str) -> Result<DateTime<Utc>, KureError> {
    DateTime::parse_from_rfc2822(value)
        .or_else(|err| match value.strip_suffix(" UTC") {
            Some(stem) => DateTime::parse_from_rfc2822(&format!("{stem} +0000")),
            None => Err(err),
        })
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| KureError::Corrupt(format!("invalid expiry \"{value}\": {e}")))
}

/// The `expires` value for a record that should live for `duration`.
pub fn expiry_after(duration: Duration, now: DateTime<Utc>) -> String {
    (now + duration).format(EXPIRY_FORMAT).to_string()
}
