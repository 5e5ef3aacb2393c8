// SPDX-FileCopyrightText: 2026 Kure Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authenticated envelope encryption of record payloads.
//!
//! Every call to [`encrypt`] draws a fresh 32-byte salt and a fresh 96-bit
//! nonce from the system CSPRNG, derives a key with Argon2id and seals the
//! payload with AES-256-GCM. The envelope layout is
//!
//! ```text
//! [12B nonce][ciphertext + 16B tag][32B salt]
//! ```
//!
//! with no length prefixes and no associated data.

use kure_core::KureError;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use secrecy::{ExposeSecret, SecretString};

use crate::kdf::{KdfParams, SALT_LEN, derive_key};
use crate::secret::SecretHandle;

/// AES-GCM nonce length.
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length.
pub const TAG_LEN: usize = 16;

/// Shortest envelope that can possibly open.
pub const MIN_ENVELOPE_LEN: usize = NONCE_LEN + TAG_LEN + SALT_LEN;

/// Something that can lend the master password for one derivation.
pub trait PasswordProvider {
    /// Run `f` with the password bytes. Implementations must not keep a copy.
    fn with_password<R, F>(&self, f: F) -> Result<R, KureError>
    where
        F: FnOnce(&[u8]) -> Result<R, KureError>;
}

impl PasswordProvider for SecretHandle {
    fn with_password<R, F>(&self, f: F) -> Result<R, KureError>
    where
        F: FnOnce(&[u8]) -> Result<R, KureError>,
    {
        let open = self.open()?;
        f(&open)
    }
}

impl PasswordProvider for SecretString {
    fn with_password<R, F>(&self, f: F) -> Result<R, KureError>
    where
        F: FnOnce(&[u8]) -> Result<R, KureError>,
    {
        f(self.expose_secret().as_bytes())
    }
}

/// Encrypt `plaintext` with the password lent by `provider`.
pub fn encrypt<P>(plaintext: &[u8], provider: &P, params: &KdfParams) -> Result<Vec<u8>, KureError>
where
    P: PasswordProvider + ?Sized,
{
    if plaintext.is_empty() {
        return Err(KureError::InvalidInput("nothing to encrypt".to_string()));
    }
    provider.with_password(|password| encrypt_with_password(plaintext, password, params))
}

/// Decrypt an envelope with the password lent by `provider`.
pub fn decrypt<P>(envelope: &[u8], provider: &P, params: &KdfParams) -> Result<Vec<u8>, KureError>
where
    P: PasswordProvider + ?Sized,
{
    if envelope.is_empty() {
        return Err(KureError::InvalidInput("nothing to decrypt".to_string()));
    }
    provider.with_password(|password| decrypt_with_password(envelope, password, params))
}

/// Encrypt with an explicit password, bypassing any session.
///
/// Used for bootstrap and bulk re-encryption. Produces the same envelope
/// format as [`encrypt`].
pub fn encrypt_with_password(
    plaintext: &[u8],
    password: &[u8],
    params: &KdfParams,
) -> Result<Vec<u8>, KureError> {
    if plaintext.is_empty() {
        return Err(KureError::InvalidInput("nothing to encrypt".to_string()));
    }

    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    rng.fill(&mut salt)
        .and_then(|()| rng.fill(&mut nonce))
        .map_err(|_| KureError::Internal("failed to generate salt and nonce".to_string()))?;

    let key = aead_key(password, &salt, params)?;

    let mut envelope = Vec::with_capacity(plaintext.len() + MIN_ENVELOPE_LEN);
    envelope.extend_from_slice(&nonce);
    envelope.extend_from_slice(plaintext);
    let tag = key
        .seal_in_place_separate_tag(
            Nonce::assume_unique_for_key(nonce),
            Aad::empty(),
            &mut envelope[NONCE_LEN..],
        )
        .map_err(|_| KureError::Internal("AES-256-GCM encryption failed".to_string()))?;
    envelope.extend_from_slice(tag.as_ref());
    envelope.extend_from_slice(&salt);

    Ok(envelope)
}

/// Decrypt with an explicit password, bypassing any session.
///
/// Every failure past input validation is [`KureError::CryptoFailure`].
pub fn decrypt_with_password(
    envelope: &[u8],
    password: &[u8],
    params: &KdfParams,
) -> Result<Vec<u8>, KureError> {
    if envelope.is_empty() {
        return Err(KureError::InvalidInput("nothing to decrypt".to_string()));
    }
    if envelope.len() < MIN_ENVELOPE_LEN {
        return Err(KureError::CryptoFailure);
    }

    let (nonce, rest) = envelope.split_at(NONCE_LEN);
    let (sealed, salt) = rest.split_at(rest.len() - SALT_LEN);
    let nonce: [u8; NONCE_LEN] = nonce.try_into().map_err(|_| KureError::CryptoFailure)?;
    let salt: &[u8; SALT_LEN] = salt.try_into().map_err(|_| KureError::CryptoFailure)?;

    let key = aead_key(password, salt, params)?;

    let mut in_out = sealed.to_vec();
    let plaintext = key
        .open_in_place(Nonce::assume_unique_for_key(nonce), Aad::empty(), &mut in_out)
        .map_err(|_| KureError::CryptoFailure)?;
    let len = plaintext.len();
    in_out.truncate(len);

    Ok(in_out)
}

/// Derive the key and build the AEAD key object. The derived bytes are
/// zeroed before this returns.
fn aead_key(
    password: &[u8],
    salt: &[u8; SALT_LEN],
    params: &KdfParams,
) -> Result<LessSafeKey, KureError> {
    let derived = derive_key(password, salt, params)?;
    let unbound = UnboundKey::new(&AES_256_GCM, &derived[..])
        .map_err(|_| KureError::Internal("failed to create AES-256-GCM key".to_string()))?;
    drop(derived);
    Ok(LessSafeKey::new(unbound))
}
