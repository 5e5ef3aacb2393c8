// SPDX-FileCopyrightText: 2026 Kure Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Master password acquisition via TTY prompt or the KURE_PASSWORD environment variable.

use kure_core::KureError;
use secrecy::{ExposeSecret, SecretString};

use crate::secret::constant_time_eq;

/// The environment variable name for providing the master password.
pub const PASSWORD_ENV_VAR: &str = "KURE_PASSWORD";

const NO_PASSWORD: &str =
    "No password provided. Set KURE_PASSWORD environment variable or run interactively.";

fn from_env() -> Option<SecretString> {
    std::env::var(PASSWORD_ENV_VAR)
        .ok()
        .filter(|value| !value.is_empty())
        .map(SecretString::from)
}

fn read(prompt: &str) -> Result<SecretString, KureError> {
    eprint!("{prompt}");
    let password = rpassword::read_password()
        .map_err(|e| KureError::InvalidInput(format!("failed to read password: {e}")))?;
    if password.is_empty() {
        return Err(KureError::InvalidInput("empty password not allowed".to_string()));
    }
    Ok(SecretString::from(password))
}

/// Get the master password from the environment or an interactive prompt.
pub fn read_password() -> Result<SecretString, KureError> {
    if let Some(password) = from_env() {
        return Ok(password);
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return read("Master password: ");
    }

    Err(KureError::InvalidInput(NO_PASSWORD.to_string()))
}

/// Get a new master password, asking twice on a terminal.
///
/// The two entries are compared in constant time. The environment variable
/// needs no confirmation.
pub fn read_new_password() -> Result<SecretString, KureError> {
    if let Some(password) = from_env() {
        return Ok(password);
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        let first = read("New master password: ")?;
        let second = read("Retype master password: ")?;
        if !constant_time_eq(
            first.expose_secret().as_bytes(),
            second.expose_secret().as_bytes(),
        ) {
            return Err(KureError::InvalidInput("passwords do not match".to_string()));
        }
        return Ok(first);
    }

    Err(KureError::InvalidInput(NO_PASSWORD.to_string()))
}
