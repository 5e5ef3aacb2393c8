// SPDX-FileCopyrightText: 2026 Kure Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Point-in-time database images.
//!
//! Uses rusqlite's Backup API over a separate read-only connection. The
//! whole image is copied in a single step, which SQLite performs inside one
//! read transaction, so the copy is consistent and writers on the main
//! connection are never blocked in WAL mode. Records stay encrypted: the
//! image is the raw database file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use kure_core::KureError;
use kure_crypt::Session;
use rusqlite::backup::{Backup, StepResult};
use rusqlite::{Connection, OpenFlags};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Produces raw images of one database file.
#[derive(Debug, Clone)]
pub struct SnapshotExporter {
    path: PathBuf,
}

impl SnapshotExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a consistent image of the database to `sink`.
    ///
    /// Returns the number of bytes written.
    pub fn export<W: Write + ?Sized>(&self, sink: &mut W) -> Result<u64, KureError> {
        let image = self.copy_to_temp()?;
        let mut file = image.reopen().map_err(KureError::storage)?;
        let written = io::copy(&mut file, sink).map_err(KureError::storage)?;
        sink.flush().map_err(KureError::storage)?;
        debug!(bytes = written, "snapshot exported");
        Ok(written)
    }

    /// The full image in memory, for callers that need its exact length up
    /// front.
    pub fn to_bytes(&self) -> Result<Vec<u8>, KureError> {
        let mut buf = Vec::new();
        self.export(&mut buf)?;
        Ok(buf)
    }

    /// Write the image to `dest` without extra encryption.
    pub fn export_to_file(&self, dest: &Path) -> Result<u64, KureError> {
        let image = self.copy_to_temp()?;
        let bytes = image.as_file().metadata().map_err(KureError::storage)?.len();
        persist(image, dest)?;
        info!(dest = %dest.display(), bytes, "backup written");
        Ok(bytes)
    }

    /// Write the image to `dest` sealed in one envelope with the session's
    /// password.
    pub fn export_encrypted(&self, dest: &Path, session: &Session) -> Result<u64, KureError> {
        let image = self.to_bytes()?;
        let envelope = session.encrypt(&image)?;

        let mut out = temp_beside(dest)?;
        out.write_all(&envelope).map_err(KureError::storage)?;
        persist(out, dest)?;
        info!(dest = %dest.display(), bytes = envelope.len(), "encrypted backup written");
        Ok(envelope.len() as u64)
    }

    fn copy_to_temp(&self) -> Result<NamedTempFile, KureError> {
        if !self.path.exists() {
            return Err(KureError::storage(io::Error::new(
                io::ErrorKind::NotFound,
                format!("database not found: {}", self.path.display()),
            )));
        }

        let src = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(KureError::storage)?;

        let image = NamedTempFile::new().map_err(KureError::storage)?;
        copy_database(&src, image.path())?;
        Ok(image)
    }
}

/// Restore `dest` from the raw image at `source`.
///
/// The image is validated first, and an existing `dest` is preserved as
/// `<dest>.pre-restore`.
pub fn restore(source: &Path, dest: &Path) -> Result<(), KureError> {
    if !source.exists() {
        return Err(KureError::storage(io::Error::new(
            io::ErrorKind::NotFound,
            format!("backup file not found: {}", source.display()),
        )));
    }

    let src = Connection::open_with_flags(source, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(KureError::storage)?;
    src.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
        row.get::<_, i64>(0)
    })
    .map_err(|e| KureError::Corrupt(format!("not a kure database: {e}")))?;

    if dest.exists() {
        let safety = pre_restore_path(dest);
        info!(path = %safety.display(), "keeping copy of current database");
        SnapshotExporter::new(dest).export_to_file(&safety)?;
    }

    copy_database(&src, dest)?;
    info!(source = %source.display(), dest = %dest.display(), "database restored");
    Ok(())
}

/// Decrypt an image written by [`SnapshotExporter::export_encrypted`] and
/// restore it over `dest`.
pub fn import_encrypted(source: &Path, dest: &Path, session: &Session) -> Result<(), KureError> {
    let envelope = fs::read(source).map_err(KureError::storage)?;
    let image = session.decrypt(&envelope)?;

    let mut plain = NamedTempFile::new().map_err(KureError::storage)?;
    plain.write_all(&image).map_err(KureError::storage)?;
    plain.flush().map_err(KureError::storage)?;
    restore(plain.path(), dest)
}

/// `<dest>.pre-restore`.
pub fn pre_restore_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".pre-restore");
    PathBuf::from(name)
}

fn copy_database(src: &Connection, dest: &Path) -> Result<(), KureError> {
    let mut dst = Connection::open(dest).map_err(KureError::storage)?;
    {
        let backup = Backup::new(src, &mut dst).map_err(KureError::storage)?;
        // -1 copies every page in one step, i.e. one read transaction.
        loop {
            match backup.step(-1).map_err(KureError::storage)? {
                StepResult::Done => break,
                StepResult::More => continue,
                _ => std::thread::sleep(Duration::from_millis(10)),
            }
        }
    }
    dst.close().map_err(|(_, e)| KureError::storage(e))
}

fn temp_beside(dest: &Path) -> Result<NamedTempFile, KureError> {
    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    NamedTempFile::new_in(dir).map_err(KureError::storage)
}

/// Move a finished temp file into place atomically when possible.
fn persist(file: NamedTempFile, dest: &Path) -> Result<(), KureError> {
    match file.persist(dest) {
        Ok(_) => Ok(()),
        // Different filesystem: fall back to copying.
        Err(err) => {
            fs::copy(err.file.path(), dest).map_err(KureError::storage)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pre_restore_path_appends_suffix() {
        assert_eq!(
            pre_restore_path(Path::new("/var/kure/kure.db")),
            PathBuf::from("/var/kure/kure.db.pre-restore")
        );
    }

    #[test]
    fn missing_database_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = SnapshotExporter::new(dir.path().join("absent.db"));
        assert!(matches!(
            exporter.to_bytes(),
            Err(KureError::Storage { .. })
        ));
    }

    #[test]
    fn restore_from_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = restore(&dir.path().join("nope.db"), &dir.path().join("kure.db")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn restore_rejects_non_database() {
        let dir = tempfile::tempdir().unwrap();
        let junk = dir.path().join("junk.db");
        fs::write(&junk, b"definitely not sqlite, just some bytes padding it out").unwrap();
        let result = restore(&junk, &dir.path().join("kure.db"));
        assert!(result.is_err());
        assert!(!dir.path().join("kure.db").exists());
    }
}
