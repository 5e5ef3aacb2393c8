// SPDX-FileCopyrightText: 2026 Kure Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for envelopes produced through a session.

use std::sync::Arc;

use kure_core::KureError;
use kure_crypt::{
    KdfParams, MIN_ENVELOPE_LEN, Session, decrypt_with_password, encrypt_with_password,
};

const FAST: KdfParams = KdfParams::insecure_fast();

#[test]
fn session_envelopes_open_with_the_raw_password() {
    let session = Session::unlocked(FAST, b"master").unwrap();
    let envelope = session.encrypt(b"{\"name\":\"github\"}").unwrap();
    assert_eq!(
        decrypt_with_password(&envelope, b"master", &FAST).unwrap(),
        b"{\"name\":\"github\"}"
    );
}

#[test]
fn reencryption_moves_data_to_a_new_password() {
    let session = Session::unlocked(FAST, b"old").unwrap();
    let envelopes: Vec<Vec<u8>> = ["a", "b", "c"]
        .iter()
        .map(|p| session.encrypt(p.as_bytes()).unwrap())
        .collect();

    let moved: Vec<Vec<u8>> = envelopes
        .iter()
        .map(|e| {
            let plain = session.decrypt(e).unwrap();
            encrypt_with_password(&plain, b"new", &FAST).unwrap()
        })
        .collect();

    session.unlock(b"new").unwrap();
    for (envelope, expected) in moved.iter().zip(["a", "b", "c"]) {
        assert_eq!(session.decrypt(envelope).unwrap(), expected.as_bytes());
    }
    assert!(matches!(
        session.decrypt(&envelopes[0]),
        Err(KureError::CryptoFailure)
    ));
}

#[test]
fn shared_session_serves_many_threads() {
    let session = Arc::new(Session::unlocked(FAST, b"pw").unwrap());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let session = Arc::clone(&session);
            std::thread::spawn(move || {
                let payload = format!("payload-{i}");
                let envelope = session.encrypt(payload.as_bytes()).unwrap();
                assert_eq!(envelope.len(), payload.len() + MIN_ENVELOPE_LEN);
                assert_eq!(session.decrypt(&envelope).unwrap(), payload.as_bytes());
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}
