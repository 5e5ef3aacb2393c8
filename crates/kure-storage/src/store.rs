// SPDX-FileCopyrightText: 2026 Kure Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generic CRUD over one record variant.
//!
//! Each variant lives in its own partition: a table keyed by the normalized
//! record name whose values are ciphertext envelopes. Every operation runs as
//! a single transaction on the writer thread, including the decryption and
//! expiry checks, so a check and the write it guards can never interleave
//! with another writer.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use kure_core::{KureError, Record, normalize_name, path_prefixes, validate_name};
use kure_crypt::Session;
use rusqlite::{OptionalExtension, Transaction, TransactionBehavior, params};
use tracing::{debug, info};

use crate::database::{Database, ensure_partition, table, table_exists};
use crate::expiry::{ExpiryStatus, check_expiry};

/// Encrypted persistence for records of type `T`.
pub struct RecordStore<T> {
    db: Database,
    session: Arc<Session>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for RecordStore<T> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            session: Arc::clone(&self.session),
            _record: PhantomData,
        }
    }
}

impl<T: Record> std::fmt::Debug for RecordStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("partition", &T::PARTITION.as_str())
            .finish()
    }
}

impl<T: Record> RecordStore<T> {
    pub fn new(db: Database, session: Arc<Session>) -> Self {
        Self {
            db,
            session,
            _record: PhantomData,
        }
    }

    pub fn partition(&self) -> &'static str {
        T::PARTITION.as_str()
    }

    /// Store a new record.
    ///
    /// Fails with [`KureError::AlreadyExists`] if the name is taken, if the
    /// name is a folder of existing records, or if one of its folders is
    /// itself a record. An expiry that is neither `"Never"` nor an RFC 1123
    /// timestamp is [`KureError::InvalidInput`].
    pub async fn put(&self, record: T) -> Result<(), KureError> {
        let name = validate_name(record.name())?;
        validate_expiry(&record)?;
        let session = Arc::clone(&self.session);

        self.db
            .run(move |conn| {
                let tx = write_tx(conn)?;
                ensure_partition(&tx, T::PARTITION.as_str())?;
                if collides(&tx, T::PARTITION.as_str(), &name, None)? {
                    return Err(KureError::already_exists(T::PARTITION.as_str(), name));
                }
                let value = seal(&session, &record)?;
                insert(&tx, T::PARTITION.as_str(), &name, &value)?;
                tx.commit().map_err(KureError::storage)?;
                Ok(name)
            })
            .await
            .map(|name| info!(partition = T::PARTITION.as_str(), name = %name, "record stored"))
    }

    /// Fetch one record by name (case-insensitive).
    pub async fn get(&self, name: &str) -> Result<T, KureError> {
        let name = normalize_name(name);
        let session = Arc::clone(&self.session);

        self.db
            .run(move |conn| {
                let tx = read_tx(conn)?;
                let record = fetch_live::<T>(&tx, &session, &name)?;
                tx.commit().map_err(KureError::storage)?;
                record.ok_or_else(|| KureError::not_found(T::PARTITION.as_str(), name))
            })
            .await
    }

    /// Every record of the partition in key order. Expired entries are
    /// deleted and left out.
    pub async fn list(&self) -> Result<Vec<T>, KureError> {
        let session = Arc::clone(&self.session);
        self.db
            .run(move |conn| {
                let tx = read_tx(conn)?;
                let records = scan_live::<T>(&tx, &session, None)?;
                tx.commit().map_err(KureError::storage)?;
                Ok(records)
            })
            .await
    }

    /// Stored names in key order, without decrypting anything.
    pub async fn list_names(&self) -> Result<Vec<String>, KureError> {
        self.db
            .run(|conn| {
                if !table_exists(conn, T::PARTITION.as_str())? {
                    return Ok(Vec::new());
                }
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT name FROM {} ORDER BY name",
                        table(T::PARTITION.as_str())
                    ))
                    .map_err(KureError::storage)?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))
                    .map_err(KureError::storage)?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(KureError::storage)?;
                Ok(names)
            })
            .await
    }

    /// Delete one record.
    ///
    /// Expiring variants are read back first, so removing an entry that has
    /// already expired reports [`KureError::NotFound`].
    pub async fn remove(&self, name: &str) -> Result<(), KureError> {
        let name = normalize_name(name);
        let session = Arc::clone(&self.session);

        self.db
            .run(move |conn| {
                let tx = write_tx(conn)?;
                if T::EXPIRES && fetch_live::<T>(&tx, &session, &name)?.is_none() {
                    tx.commit().map_err(KureError::storage)?;
                    return Err(KureError::not_found(T::PARTITION.as_str(), name));
                }
                if !delete(&tx, T::PARTITION.as_str(), &name)? {
                    return Err(KureError::not_found(T::PARTITION.as_str(), name));
                }
                tx.commit().map_err(KureError::storage)?;
                Ok(name)
            })
            .await
            .map(|name| info!(partition = T::PARTITION.as_str(), name = %name, "record removed"))
    }

    /// Records whose name contains `needle`, case-insensitively, in key order.
    ///
    /// Returns [`KureError::NotFound`] when nothing matches.
    pub async fn search(&self, needle: &str) -> Result<Vec<T>, KureError> {
        let needle = normalize_name(needle);
        let session = Arc::clone(&self.session);

        let records = self
            .db
            .run(move |conn| {
                let tx = read_tx(conn)?;
                let records = scan_live::<T>(&tx, &session, Some(&needle))?;
                tx.commit().map_err(KureError::storage)?;
                if records.is_empty() {
                    return Err(KureError::not_found(T::PARTITION.as_str(), needle));
                }
                Ok(records)
            })
            .await?;
        debug!(
            partition = T::PARTITION.as_str(),
            matches = records.len(),
            "search finished"
        );
        Ok(records)
    }

    /// Replace the record called `old_name` with `record`, which may carry a
    /// different name.
    pub async fn update(&self, old_name: &str, record: T) -> Result<(), KureError> {
        let old = normalize_name(old_name);
        let new = validate_name(record.name())?;
        validate_expiry(&record)?;
        let session = Arc::clone(&self.session);

        self.db
            .run(move |conn| {
                let tx = write_tx(conn)?;
                let exists = if T::EXPIRES {
                    fetch_live::<T>(&tx, &session, &old)?.is_some()
                } else {
                    fetch_raw(&tx, T::PARTITION.as_str(), &old)?.is_some()
                };
                if !exists {
                    tx.commit().map_err(KureError::storage)?;
                    return Err(KureError::not_found(T::PARTITION.as_str(), old));
                }
                if collides(&tx, T::PARTITION.as_str(), &new, Some(&old))? {
                    return Err(KureError::already_exists(T::PARTITION.as_str(), new));
                }
                let value = seal(&session, &record)?;
                delete(&tx, T::PARTITION.as_str(), &old)?;
                insert(&tx, T::PARTITION.as_str(), &new, &value)?;
                tx.commit().map_err(KureError::storage)?;
                Ok((old, new))
            })
            .await
            .map(|(old, new)| {
                info!(
                    partition = T::PARTITION.as_str(),
                    from = %old,
                    to = %new,
                    "record updated"
                );
            })
    }
}

fn write_tx(conn: &mut rusqlite::Connection) -> Result<Transaction<'_>, KureError> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(KureError::storage)
}

fn read_tx(conn: &mut rusqlite::Connection) -> Result<Transaction<'_>, KureError> {
    conn.transaction().map_err(KureError::storage)
}

fn seal<T: Record>(session: &Session, record: &T) -> Result<Vec<u8>, KureError> {
    let plaintext = zeroize::Zeroizing::new(
        serde_json::to_vec(record)
            .map_err(|e| KureError::Internal(format!("failed to serialize record: {e}")))?,
    );
    session.encrypt(&plaintext)
}

fn open<T: Record>(session: &Session, value: &[u8]) -> Result<T, KureError> {
    let plaintext = zeroize::Zeroizing::new(session.decrypt(value)?);
    serde_json::from_slice(&plaintext).map_err(|e| {
        KureError::Corrupt(format!(
            "{} payload does not parse: {e}",
            T::PARTITION.as_str()
        ))
    })
}

/// Reject an expiry that later reads could not parse. Timestamps already in
/// the past are accepted.
fn validate_expiry<T: Record>(record: &T) -> Result<(), KureError> {
    if !T::EXPIRES {
        return Ok(());
    }
    match check_expiry(record.expires().unwrap_or_default(), Utc::now()) {
        Ok(_) => Ok(()),
        Err(KureError::Corrupt(message)) => Err(KureError::InvalidInput(message)),
        Err(other) => Err(other),
    }
}

fn is_expired<T: Record>(record: &T) -> Result<bool, KureError> {
    if !T::EXPIRES {
        return Ok(false);
    }
    let status = check_expiry(record.expires().unwrap_or_default(), Utc::now())?;
    Ok(status == ExpiryStatus::Expired)
}

fn fetch_raw(
    tx: &Transaction<'_>,
    partition: &str,
    name: &str,
) -> Result<Option<Vec<u8>>, KureError> {
    if !table_exists(tx, partition)? {
        return Ok(None);
    }
    tx.query_row(
        &format!("SELECT value FROM {} WHERE name = ?1", table(partition)),
        [name],
        |row| row.get(0),
    )
    .optional()
    .map_err(KureError::storage)
}

/// Decrypt one record, deleting it instead if it has expired.
fn fetch_live<T: Record>(
    tx: &Transaction<'_>,
    session: &Session,
    name: &str,
) -> Result<Option<T>, KureError> {
    let Some(value) = fetch_raw(tx, T::PARTITION.as_str(), name)? else {
        return Ok(None);
    };
    let record: T = open(session, &value)?;
    if is_expired(&record)? {
        delete(tx, T::PARTITION.as_str(), name)?;
        info!(partition = T::PARTITION.as_str(), name = %name, "expired record deleted");
        return Ok(None);
    }
    Ok(Some(record))
}

/// Decrypt every record (optionally only names containing `needle`),
/// deleting the expired ones.
fn scan_live<T: Record>(
    tx: &Transaction<'_>,
    session: &Session,
    needle: Option<&str>,
) -> Result<Vec<T>, KureError> {
    let partition = T::PARTITION.as_str();
    if !table_exists(tx, partition)? {
        return Ok(Vec::new());
    }

    let rows: Vec<(String, Vec<u8>)> = {
        let mut stmt = tx
            .prepare(&format!(
                "SELECT name, value FROM {} WHERE ?1 IS NULL OR instr(name, ?1) > 0 ORDER BY name",
                table(partition)
            ))
            .map_err(KureError::storage)?;
        stmt.query_map([needle], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(KureError::storage)?
            .collect::<Result<_, _>>()
            .map_err(KureError::storage)?
    };

    let mut records = Vec::with_capacity(rows.len());
    for (name, value) in rows {
        let record: T = open(session, &value)?;
        if is_expired(&record)? {
            delete(tx, partition, &name)?;
            info!(partition, name = %name, "expired record deleted");
            continue;
        }
        records.push(record);
    }
    Ok(records)
}

/// Whether `name` clashes with a stored record other than `exclude`.
///
/// A clash is an exact match, a stored record nested under `name`, or a
/// stored record whose name is one of `name`'s folders.
fn collides(
    tx: &Transaction<'_>,
    partition: &str,
    name: &str,
    exclude: Option<&str>,
) -> Result<bool, KureError> {
    let exact = format!(
        "SELECT 1 FROM {} WHERE name = ?1 AND (?2 IS NULL OR name <> ?2)",
        table(partition)
    );
    let nested = format!(
        "SELECT 1 FROM {} WHERE substr(name, 1, length(?1)) = ?1 AND (?2 IS NULL OR name <> ?2) LIMIT 1",
        table(partition)
    );
    let hit = |sql: &str, key: &str| -> Result<bool, KureError> {
        tx.query_row(sql, params![key, exclude], |_| Ok(()))
            .optional()
            .map(|row| row.is_some())
            .map_err(KureError::storage)
    };

    if hit(&exact, name)? || hit(&nested, &format!("{name}/"))? {
        return Ok(true);
    }
    for prefix in path_prefixes(name) {
        if hit(&exact, prefix)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn insert(tx: &Transaction<'_>, partition: &str, name: &str, value: &[u8]) -> Result<(), KureError> {
    tx.execute(
        &format!("INSERT INTO {} (name, value) VALUES (?1, ?2)", table(partition)),
        params![name, value],
    )
    .map(|_| ())
    .map_err(KureError::storage)
}

fn delete(tx: &Transaction<'_>, partition: &str, name: &str) -> Result<bool, KureError> {
    if !table_exists(tx, partition)? {
        return Ok(false);
    }
    tx.execute(
        &format!("DELETE FROM {} WHERE name = ?1", table(partition)),
        [name],
    )
    .map(|rows| rows > 0)
    .map_err(KureError::storage)
}

#[cfg(test)]
mod tests {
    use kure_core::{Card, Entry};
    use kure_crypt::KdfParams;

    use super::*;

    async fn store<T: Record>() -> (tempfile::TempDir, RecordStore<T>) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("kure.db")).await.unwrap();
        let session = Arc::new(Session::unlocked(KdfParams::insecure_fast(), b"pw").unwrap());
        (dir, RecordStore::new(db, session))
    }

    fn card(name: &str) -> Card {
        Card {
            name: name.to_string(),
            kind: "debit".to_string(),
            number: "4242 4242 4242 4242".to_string(),
            security_code: "123".to_string(),
            expire_date: "12/30".to_string(),
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn reads_on_empty_partition() {
        let (_dir, cards) = store::<Card>().await;
        assert!(cards.list().await.unwrap().is_empty());
        assert!(cards.list_names().await.unwrap().is_empty());
        assert!(cards.get("visa").await.unwrap_err().is_not_found());
        assert!(cards.remove("visa").await.unwrap_err().is_not_found());
        assert!(cards.search("visa").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn values_are_ciphertext() {
        let (_dir, cards) = store::<Card>().await;
        cards.put(card("visa")).await.unwrap();

        let raw = cards
            .db
            .run(|conn| {
                conn.query_row("SELECT value FROM \"card\" WHERE name = 'visa'", [], |row| {
                    row.get::<_, Vec<u8>>(0)
                })
                .map_err(KureError::storage)
            })
            .await
            .unwrap();
        let needle = b"4242";
        assert!(!raw.windows(needle.len()).any(|w| w == needle));
    }

    #[tokio::test]
    async fn undecodable_payload_is_corrupt() {
        let (_dir, cards) = store::<Card>().await;
        cards.put(card("visa")).await.unwrap();
        let garbage = cards.session.encrypt(b"not json").unwrap();
        cards
            .db
            .run(move |conn| {
                conn.execute(
                    "UPDATE \"card\" SET value = ?1 WHERE name = 'visa'",
                    [garbage],
                )
                .map(|_| ())
                .map_err(KureError::storage)
            })
            .await
            .unwrap();
        assert!(matches!(cards.get("visa").await, Err(KureError::Corrupt(_))));
    }

    #[tokio::test]
    async fn empty_name_is_invalid() {
        let (_dir, entries) = store::<Entry>().await;
        assert!(matches!(
            entries.put(Entry::new("  ")).await,
            Err(KureError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn logs_name_but_never_payload() {
        let (_dir, cards) = store::<Card>().await;
        cards.put(card("visa")).await.unwrap();
        assert!(logs_contain("record stored"));
        assert!(logs_contain("visa"));
        assert!(!logs_contain("4242"));
    }
}
