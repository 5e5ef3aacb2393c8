// SPDX-FileCopyrightText: 2026 Kure Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Master password registration, verification and rotation.
//!
//! The `kure_auth` partition holds two rows: the Argon2id parameters in clear
//! (`params`) and an envelope of a fixed marker sealed with the master
//! password (`verifier`). A password is correct exactly when the verifier
//! opens.

use std::sync::Arc;

use kure_core::{KureError, Partition};
use kure_crypt::{KdfParams, Session, encrypt_with_password};
use rusqlite::{OptionalExtension, Transaction, TransactionBehavior, params};
use secrecy::{ExposeSecret, SecretString};
use strum::IntoEnumIterator;
use tracing::{info, warn};

use crate::database::{Database, ensure_partition, table, table_exists};

/// Partition holding the verification record.
pub const AUTH_PARTITION: &str = "kure_auth";

const PARAMS_KEY: &str = "params";
const VERIFIER_KEY: &str = "verifier";
const VERIFIER_MARKER: &[u8] = b"kure-verifier";

/// Whether the database already has a master password.
pub async fn is_registered(db: &Database) -> Result<bool, KureError> {
    db.run(|conn| {
        if !table_exists(conn, AUTH_PARTITION)? {
            return Ok(false);
        }
        read_value(conn, VERIFIER_KEY).map(|v| v.is_some())
    })
    .await
}

/// Store the session's parameters and a verifier for its password.
///
/// Fails with [`KureError::AlreadyExists`] if a password is already set.
pub async fn register(db: &Database, session: &Arc<Session>) -> Result<(), KureError> {
    let session = Arc::clone(session);
    db.run(move |conn| {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(KureError::storage)?;
        ensure_partition(&tx, AUTH_PARTITION)?;
        if read_value(&tx, VERIFIER_KEY)?.is_some() {
            return Err(KureError::already_exists(AUTH_PARTITION, VERIFIER_KEY));
        }

        let params = session.params();
        let verifier = session.encrypt(VERIFIER_MARKER)?;
        write_value(&tx, PARAMS_KEY, &encode_params(&params)?)?;
        write_value(&tx, VERIFIER_KEY, &verifier)?;
        tx.commit().map_err(KureError::storage)
    })
    .await?;

    info!("master password registered");
    Ok(())
}

/// Adopt the stored parameters and check the session's password.
///
/// Returns [`KureError::CryptoFailure`] for a wrong password and
/// [`KureError::NotFound`] when no password was ever registered.
pub async fn login(db: &Database, session: &Arc<Session>) -> Result<(), KureError> {
    let (params, verifier) = db
        .run(|conn| {
            if !table_exists(conn, AUTH_PARTITION)? {
                return Ok((None, None));
            }
            Ok((read_value(conn, PARAMS_KEY)?, read_value(conn, VERIFIER_KEY)?))
        })
        .await?;

    let verifier = verifier.ok_or_else(|| KureError::not_found(AUTH_PARTITION, VERIFIER_KEY))?;
    if let Some(raw) = params {
        let stored = decode_params(&raw)?;
        if stored != session.params() {
            info!("using derivation parameters stored with the vault");
        }
        session.set_params(stored)?;
    }

    match session.decrypt(&verifier) {
        Ok(marker) if marker == VERIFIER_MARKER => Ok(()),
        Ok(_) => Err(KureError::Corrupt("verifier marker mismatch".to_string())),
        Err(err) => {
            warn!("master password rejected");
            Err(err)
        }
    }
}

/// Re-encrypt every record and the verifier under `new_password`.
///
/// Everything happens in one write transaction; the session is resealed with
/// the new password only after it commits.
pub async fn change_password(
    db: &Database,
    session: &Arc<Session>,
    new_password: &SecretString,
) -> Result<usize, KureError> {
    let password = zeroize::Zeroizing::new(new_password.expose_secret().as_bytes().to_vec());
    let worker = Arc::clone(session);

    let count = db
        .run(move |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(KureError::storage)?;
            let params = worker.params();

            let mut count = 0;
            for partition in Partition::iter() {
                count += reencrypt(&tx, partition.as_str(), &worker, &password, &params)?;
            }

            let verifier = read_value(&tx, VERIFIER_KEY)?
                .ok_or_else(|| KureError::not_found(AUTH_PARTITION, VERIFIER_KEY))?;
            let marker = worker.decrypt(&verifier)?;
            write_value(
                &tx,
                VERIFIER_KEY,
                &encrypt_with_password(&marker, &password, &params)?,
            )?;

            tx.commit().map_err(KureError::storage)?;
            Ok(count)
        })
        .await?;

    session.unlock(new_password.expose_secret().as_bytes())?;
    info!(records = count, "master password changed");
    Ok(count)
}

fn reencrypt(
    tx: &Transaction<'_>,
    partition: &str,
    session: &Session,
    password: &[u8],
    params: &KdfParams,
) -> Result<usize, KureError> {
    if !table_exists(tx, partition)? {
        return Ok(0);
    }

    let rows: Vec<(String, Vec<u8>)> = {
        let mut stmt = tx
            .prepare(&format!("SELECT name, value FROM {}", table(partition)))
            .map_err(KureError::storage)?;
        stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(KureError::storage)?
            .collect::<Result<_, _>>()
            .map_err(KureError::storage)?
    };

    let mut update = tx
        .prepare(&format!("UPDATE {} SET value = ?2 WHERE name = ?1", table(partition)))
        .map_err(KureError::storage)?;
    for (name, value) in &rows {
        let plaintext = zeroize::Zeroizing::new(session.decrypt(value)?);
        let sealed = encrypt_with_password(&plaintext, password, params)?;
        update
            .execute(params![name, sealed])
            .map_err(KureError::storage)?;
    }
    Ok(rows.len())
}

fn read_value(conn: &rusqlite::Connection, key: &str) -> Result<Option<Vec<u8>>, KureError> {
    conn.query_row(
        &format!("SELECT value FROM {} WHERE name = ?1", table(AUTH_PARTITION)),
        [key],
        |row| row.get(0),
    )
    .optional()
    .map_err(KureError::storage)
}

fn write_value(tx: &Transaction<'_>, key: &str, value: &[u8]) -> Result<(), KureError> {
    tx.execute(
        &format!(
            "INSERT OR REPLACE INTO {} (name, value) VALUES (?1, ?2)",
            table(AUTH_PARTITION)
        ),
        params![key, value],
    )
    .map(|_| ())
    .map_err(KureError::storage)
}

fn encode_params(params: &KdfParams) -> Result<Vec<u8>, KureError> {
    serde_json::to_vec(params)
        .map_err(|e| KureError::Internal(format!("failed to encode parameters: {e}")))
}

fn decode_params(raw: &[u8]) -> Result<KdfParams, KureError> {
    serde_json::from_slice(raw)
        .map_err(|e| KureError::Corrupt(format!("stored derivation parameters: {e}")))
}
