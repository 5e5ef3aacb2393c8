// SPDX-FileCopyrightText: 2026 Kure Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes; snapshots open
//! their own read-only connections.

use std::path::{Path, PathBuf};

use kure_core::KureError;
use rusqlite::{OptionalExtension, Transaction};
use tracing::{debug, info};

/// Convert a tokio-rusqlite error into KureError::Storage.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> KureError {
    KureError::storage(e)
}

/// Handle to the vault database. Cheap to clone; clones share one writer.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
    path: PathBuf,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}

impl Database {
    /// Open (creating if needed) the database at `path` in WAL mode.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, KureError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(KureError::storage)?;
        }

        let conn = tokio_rusqlite::Connection::open(&path)
            .await
            .map_err(KureError::storage)?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;",
            )
        })
        .await
        .map_err(map_tr_err)?;

        info!(path = %path.display(), "database opened");
        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn conn(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Run `f` on the writer thread.
    ///
    /// `f` reports its own errors; anything it returns is passed through
    /// unchanged, while connection failures become [`KureError::Storage`].
    pub async fn run<T, F>(&self, f: F) -> Result<T, KureError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<T, KureError> + Send + 'static,
        T: Send + 'static,
    {
        self.conn
            .call(move |conn| Ok::<_, rusqlite::Error>(f(conn)))
            .await
            .map_err(map_tr_err)?
    }

    /// Close the connection, flushing the WAL.
    pub async fn close(self) -> Result<(), KureError> {
        debug!(path = %self.path.display(), "closing database");
        self.conn.close().await.map_err(KureError::storage)
    }
}

/// Quote a partition name for use as an SQL identifier.
pub(crate) fn table(partition: &str) -> String {
    format!("\"{}\"", partition.replace('"', "\"\""))
}

pub(crate) fn table_exists(conn: &rusqlite::Connection, partition: &str) -> Result<bool, KureError> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [partition],
        |_| Ok(()),
    )
    .optional()
    .map(|row| row.is_some())
    .map_err(KureError::storage)
}

/// Create the partition's table on first write.
pub(crate) fn ensure_partition(tx: &Transaction<'_>, partition: &str) -> Result<(), KureError> {
    tx.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            name  TEXT PRIMARY KEY NOT NULL,
            value BLOB NOT NULL
        ) WITHOUT ROWID;",
        table(partition)
    ))
    .map_err(KureError::storage)
}
