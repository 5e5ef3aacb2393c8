// SPDX-FileCopyrightText: 2026 Kure Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Argon2id key derivation from the master password.
//!
//! Derives a 32-byte key using Argon2id (Algorithm::Argon2id, Version::V0x13).
//! Every ciphertext carries its own salt, so one derivation happens per
//! encrypt or decrypt call.

use kure_config::Argon2Config;
use kure_core::KureError;
use serde::{Deserialize, Serialize};
use tracing::trace;
use zeroize::Zeroizing;

/// Length of the derived key in bytes.
pub const KEY_LEN: usize = 32;

/// Length of the per-ciphertext salt in bytes.
pub const SALT_LEN: usize = 32;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Passes over memory.
    pub iterations: u32,
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Parallel lanes.
    pub parallelism: u8,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::from(&Argon2Config::default())
    }
}

impl From<&Argon2Config> for KdfParams {
    /// Thread counts above 255 are capped.
    fn from(config: &Argon2Config) -> Self {
        Self {
            iterations: config.iterations,
            memory_kib: config.memory,
            parallelism: config.threads.clamp(1, 255) as u8,
        }
    }
}

impl KdfParams {
    /// Cheapest parameters Argon2 accepts. Only suitable for tests.
    pub const fn insecure_fast() -> Self {
        Self {
            iterations: 1,
            memory_kib: 64,
            parallelism: 1,
        }
    }

    fn to_argon2(self) -> Result<argon2::Params, KureError> {
        argon2::Params::new(
            self.memory_kib,
            self.iterations,
            u32::from(self.parallelism),
            Some(KEY_LEN),
        )
        .map_err(|e| KureError::Config(format!("invalid Argon2id parameters: {e}")))
    }

    /// Check the parameters without deriving anything.
    pub fn validate(&self) -> Result<(), KureError> {
        self.to_argon2().map(|_| ())
    }
}

/// Derive a 32-byte key from `password` and `salt` using Argon2id.
///
/// The returned key is wrapped in [`Zeroizing`] for automatic memory zeroing
/// on drop.
pub fn derive_key(
    password: &[u8],
    salt: &[u8; SALT_LEN],
    params: &KdfParams,
) -> Result<Zeroizing<[u8; KEY_LEN]>, KureError> {
    let argon2 = argon2::Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        params.to_argon2()?,
    );

    trace!(
        iterations = params.iterations,
        memory_kib = params.memory_kib,
        parallelism = params.parallelism,
        "deriving key"
    );

    let mut output = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password, salt, output.as_mut())
        .map_err(|e| KureError::Internal(format!("Argon2id key derivation failed: {e}")))?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: KdfParams = KdfParams::insecure_fast();

    #[test]
    fn derive_key_is_deterministic() {
        let salt = [1u8; SALT_LEN];
        let key1 = derive_key(b"correct horse", &salt, &FAST).unwrap();
        let key2 = derive_key(b"correct horse", &salt, &FAST).unwrap();
        assert_eq!(*key1, *key2);
    }

    #[test]
    fn different_password_or_salt_changes_key() {
        let base = derive_key(b"one", &[1u8; SALT_LEN], &FAST).unwrap();
        let other_password = derive_key(b"two", &[1u8; SALT_LEN], &FAST).unwrap();
        let other_salt = derive_key(b"one", &[2u8; SALT_LEN], &FAST).unwrap();
        assert_ne!(*base, *other_password);
        assert_ne!(*base, *other_salt);
    }

    #[test]
    fn parameters_change_key() {
        let salt = [3u8; SALT_LEN];
        let cheap = derive_key(b"pw", &salt, &FAST).unwrap();
        let slower = KdfParams {
            iterations: 2,
            ..FAST
        };
        assert_ne!(*cheap, *derive_key(b"pw", &salt, &slower).unwrap());
    }

    #[test]
    fn invalid_parameters_are_config_errors() {
        let params = KdfParams {
            iterations: 0,
            ..FAST
        };
        assert!(matches!(params.validate(), Err(KureError::Config(_))));
        assert!(matches!(
            derive_key(b"pw", &[0u8; SALT_LEN], &params),
            Err(KureError::Config(_))
        ));
    }

    #[test]
    fn from_config_caps_parallelism() {
        let config = Argon2Config {
            iterations: 2,
            memory: 4096,
            threads: 1000,
        };
        let params = KdfParams::from(&config);
        assert_eq!(params.parallelism, 255);
        assert_eq!(params.memory_kib, 4096);
        assert_eq!(params.iterations, 2);
    }

    #[test]
    fn defaults_follow_config_defaults() {
        let params = KdfParams::default();
        assert_eq!(params.iterations, 1);
        assert_eq!(params.memory_kib, 1_048_576);
        assert!(params.parallelism >= 1);
    }
}
