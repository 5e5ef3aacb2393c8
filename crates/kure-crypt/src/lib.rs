// SPDX-FileCopyrightText: 2026 Kure Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cryptography for the Kure vault.
//!
//! Each record payload is sealed in its own AES-256-GCM envelope whose key is
//! derived from the master password with Argon2id and a per-envelope salt.
//! The master password itself stays encrypted in protected memory for the
//! lifetime of a [`Session`].

pub mod cipher;
pub mod kdf;
pub mod prompt;
pub mod secret;
pub mod session;

pub use cipher::{
    MIN_ENVELOPE_LEN, PasswordProvider, decrypt, decrypt_with_password, encrypt,
    encrypt_with_password,
};
pub use kdf::{KdfParams, derive_key};
pub use prompt::{PASSWORD_ENV_VAR, read_new_password, read_password};
pub use secret::{OpenSecret, SecretHandle, constant_time_eq};
pub use session::Session;
