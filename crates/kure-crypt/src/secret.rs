// SPDX-FileCopyrightText: 2026 Kure Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Protected in-memory storage for the session's master password.
//!
//! The password is never kept in plain memory. [`SecretHandle::seal`] encrypts
//! it with a random enclave key, and that key lives in a `MemSafe` region that
//! is locked in RAM, excluded from core dumps and zeroed when dropped.
//! [`SecretHandle::open`] decrypts into a [`Zeroizing`] buffer that the caller
//! drops as soon as the key is derived.

use std::fmt;
use std::ops::Deref;
use std::sync::{PoisonError, RwLock};

use kure_core::KureError;
use memsafe::MemSafe;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

/// Compare two byte strings in constant time.
///
/// Length differences are not hidden.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// A decrypted copy of the master password, zeroed on drop.
pub struct OpenSecret(Zeroizing<Vec<u8>>);

impl Deref for OpenSecret {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for OpenSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OpenSecret([REDACTED])")
    }
}

/// Sealed password plus the protected key that unseals it.
struct Enclave {
    key: RwLock<MemSafe<[u8; 32]>>,
    nonce: [u8; 12],
    sealed: Vec<u8>,
}

// SAFETY: the only non-Send/Sync field is the MemSafe region, whose raw
// pointer is reached exclusively through the RwLock. The mlock/mprotect calls
// MemSafe issues are thread-safe system calls.
unsafe impl Send for Enclave {}
// SAFETY: see above; every access to the protected key holds the write lock.
unsafe impl Sync for Enclave {}

impl Enclave {
    fn seal(password: &[u8]) -> Result<Self, KureError> {
        let rng = SystemRandom::new();
        let mut key = Zeroizing::new([0u8; 32]);
        let mut nonce = [0u8; 12];
        rng.fill(key.as_mut())
            .and_then(|()| rng.fill(&mut nonce))
            .map_err(|_| KureError::Internal("failed to generate enclave key".to_string()))?;

        let mut sealed = password.to_vec();
        aead_key(&key)?
            .seal_in_place_append_tag(Nonce::assume_unique_for_key(nonce), Aad::empty(), &mut sealed)
            .map_err(|_| KureError::Internal("failed to seal session secret".to_string()))?;

        let protected = MemSafe::new(*key)
            .map_err(|e| KureError::Internal(format!("memory protection failed: {e}")))?;

        Ok(Self {
            key: RwLock::new(protected),
            nonce,
            sealed,
        })
    }

    fn open(&self) -> Result<OpenSecret, KureError> {
        let less_safe = {
            let mut lock = self.key.write().unwrap_or_else(PoisonError::into_inner);
            let guard = lock
                .read()
                .map_err(|e| KureError::Internal(format!("memory protection failed: {e}")))?;
            aead_key(&guard)?
        };

        let mut buf = Zeroizing::new(self.sealed.clone());
        let len = less_safe
            .open_in_place(
                Nonce::assume_unique_for_key(self.nonce),
                Aad::empty(),
                buf.as_mut_slice(),
            )
            .map_err(|_| KureError::Internal("session secret is damaged".to_string()))?
            .len();
        buf.truncate(len);
        Ok(OpenSecret(buf))
    }
}

impl Drop for Enclave {
    fn drop(&mut self) {
        self.sealed.zeroize();
        self.nonce.zeroize();
    }
}

fn aead_key(key: &[u8; 32]) -> Result<LessSafeKey, KureError> {
    UnboundKey::new(&AES_256_GCM, key)
        .map(LessSafeKey::new)
        .map_err(|_| KureError::Internal("failed to create AES-256-GCM key".to_string()))
}

/// Holds the master password for the lifetime of a session.
///
/// Starts empty, becomes sealed after [`seal`](Self::seal), and returns to
/// empty on [`clear`](Self::clear) or drop. The handle may be shared across
/// threads, but [`open`](Self::open) calls are serialized: each one holds the
/// guarded key exclusively while it unseals the password.
#[derive(Default)]
pub struct SecretHandle {
    enclave: RwLock<Option<Enclave>>,
}

impl fmt::Debug for SecretHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretHandle")
            .field("sealed", &self.is_sealed())
            .finish()
    }
}

impl SecretHandle {
    /// An empty handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle already holding `password`.
    pub fn with_password(password: &[u8]) -> Result<Self, KureError> {
        let handle = Self::new();
        handle.seal(password)?;
        Ok(handle)
    }

    /// Seal `password`, replacing whatever the handle held before.
    pub fn seal(&self, password: &[u8]) -> Result<(), KureError> {
        if password.is_empty() {
            return Err(KureError::InvalidInput("password is empty".to_string()));
        }
        let enclave = Enclave::seal(password)?;
        *self.enclave.write().unwrap_or_else(PoisonError::into_inner) = Some(enclave);
        Ok(())
    }

    /// Decrypt the password into a buffer that is zeroed on drop.
    ///
    /// Returns [`KureError::Locked`] when nothing is sealed.
    pub fn open(&self) -> Result<OpenSecret, KureError> {
        let slot = self.enclave.read().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().ok_or(KureError::Locked)?.open()
    }

    /// Wipe the sealed password. Idempotent.
    pub fn clear(&self) {
        let previous = self
            .enclave
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(previous);
    }

    pub fn is_sealed(&self) -> bool {
        self.enclave
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Constant-time comparison of `candidate` against the sealed password.
    pub fn matches(&self, candidate: &[u8]) -> Result<bool, KureError> {
        let open = self.open()?;
        Ok(constant_time_eq(&open, candidate))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn handle_is_send_and_sync() {
        assert_send_sync::<SecretHandle>();
        assert_send_sync::<Arc<SecretHandle>>();
    }

    #[test]
    fn empty_handle_is_locked() {
        let handle = SecretHandle::new();
        assert!(!handle.is_sealed());
        assert!(matches!(handle.open(), Err(KureError::Locked)));
    }

    #[test]
    fn seal_open_clear_lifecycle() {
        let handle = SecretHandle::new();
        handle.seal(b"master password").unwrap();
        assert!(handle.is_sealed());
        assert_eq!(&*handle.open().unwrap(), b"master password");

        handle.clear();
        assert!(!handle.is_sealed());
        assert!(matches!(handle.open(), Err(KureError::Locked)));
        handle.clear();
    }

    #[test]
    fn reseal_replaces_password() {
        let handle = SecretHandle::with_password(b"old").unwrap();
        handle.seal(b"new").unwrap();
        assert_eq!(&*handle.open().unwrap(), b"new");
    }

    #[test]
    fn empty_password_is_rejected() {
        let handle = SecretHandle::new();
        assert!(matches!(handle.seal(b""), Err(KureError::InvalidInput(_))));
        assert!(!handle.is_sealed());
    }

    #[test]
    fn sealed_bytes_differ_from_password() {
        let handle = SecretHandle::with_password(b"plain text password").unwrap();
        let slot = handle.enclave.read().unwrap();
        let enclave = slot.as_ref().unwrap();
        assert_ne!(&enclave.sealed[..19], b"plain text password");
    }

    #[test]
    fn concurrent_opens() {
        let handle = Arc::new(SecretHandle::with_password(b"shared").unwrap());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let handle = Arc::clone(&handle);
                thread::spawn(move || {
                    for _ in 0..50 {
                        assert_eq!(&*handle.open().unwrap(), b"shared");
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
    }

    #[test]
    fn matches_is_exact() {
        let handle = SecretHandle::with_password(b"hunter2").unwrap();
        assert!(handle.matches(b"hunter2").unwrap());
        assert!(!handle.matches(b"hunter3").unwrap());
        assert!(!handle.matches(b"hunter22").unwrap());
    }

    #[test]
    fn debug_output_is_redacted() {
        let handle = SecretHandle::with_password(b"hunter2").unwrap();
        let open = handle.open().unwrap();
        assert!(!format!("{handle:?}").contains("hunter2"));
        assert_eq!(format!("{open:?}"), "OpenSecret([REDACTED])");
    }

    #[test]
    fn constant_time_eq_handles_lengths() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
        assert!(constant_time_eq(b"", b""));
    }
}
