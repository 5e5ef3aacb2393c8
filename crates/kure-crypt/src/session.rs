// SPDX-FileCopyrightText: 2026 Kure Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-process session: sealed master password plus derivation cost.

use std::sync::{PoisonError, RwLock};

use kure_core::KureError;
use tracing::debug;

use crate::cipher;
use crate::kdf::KdfParams;
use crate::secret::SecretHandle;

/// Everything a store needs to encrypt and decrypt records.
///
/// Owned by the caller and shared by reference (usually behind an `Arc`) with
/// every store. Dropping or [`lock`](Self::lock)ing it wipes the password.
#[derive(Debug)]
pub struct Session {
    secret: SecretHandle,
    params: RwLock<KdfParams>,
}

impl Session {
    /// A locked session using `params`.
    pub fn new(params: KdfParams) -> Self {
        Self {
            secret: SecretHandle::new(),
            params: RwLock::new(params),
        }
    }

    /// A session unlocked with `password`.
    pub fn unlocked(params: KdfParams, password: &[u8]) -> Result<Self, KureError> {
        params.validate()?;
        let session = Self::new(params);
        session.secret.seal(password)?;
        Ok(session)
    }

    pub fn secret(&self) -> &SecretHandle {
        &self.secret
    }

    pub fn params(&self) -> KdfParams {
        *self.params.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the derivation parameters, e.g. with those stored alongside
    /// existing data.
    pub fn set_params(&self, params: KdfParams) -> Result<(), KureError> {
        params.validate()?;
        *self.params.write().unwrap_or_else(PoisonError::into_inner) = params;
        Ok(())
    }

    pub fn unlock(&self, password: &[u8]) -> Result<(), KureError> {
        self.secret.seal(password)
    }

    /// Wipe the sealed password.
    pub fn lock(&self) {
        if self.secret.is_sealed() {
            debug!("wiping session secret");
        }
        self.secret.clear();
    }

    pub fn is_unlocked(&self) -> bool {
        self.secret.is_sealed()
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, KureError> {
        cipher::encrypt(plaintext, &self.secret, &self.params())
    }

    pub fn decrypt(&self, envelope: &[u8]) -> Result<Vec<u8>, KureError> {
        cipher::decrypt(envelope, &self.secret, &self.params())
    }
}
