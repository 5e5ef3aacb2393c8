// SPDX-FileCopyrightText: 2026 Kure Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kure backup` and `kure restore` command implementation.
//!
//! Raw backups are the database file as it sits on disk: every record is
//! already encrypted, so they need no password. Encrypted backups wrap the
//! whole image in one more envelope sealed with the master password.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use kure_core::KureError;
use kure_crypt::Session;
use kure_storage::snapshot::pre_restore_path;
use kure_storage::{SnapshotExporter, import_encrypted, restore};

/// Copy the database at `db_path` to `backup_path`.
pub async fn run_backup(db_path: &Path, backup_path: &Path) -> Result<u64, KureError> {
    let exporter = SnapshotExporter::new(db_path);
    let dest = backup_path.to_path_buf();
    let bytes = blocking(move || exporter.export_to_file(&dest)).await?;
    report_size("Backup", bytes, backup_path);
    Ok(bytes)
}

/// Copy the database at `db_path` to `backup_path`, sealed with the session's
/// password.
pub async fn run_encrypted_backup(
    db_path: &Path,
    backup_path: &Path,
    session: &Arc<Session>,
) -> Result<u64, KureError> {
    let exporter = SnapshotExporter::new(db_path);
    let dest = backup_path.to_path_buf();
    let session = Arc::clone(session);
    let bytes = blocking(move || exporter.export_encrypted(&dest, &session)).await?;
    report_size("Encrypted backup", bytes, backup_path);
    Ok(bytes)
}

/// Replace the database at `db_path` with the raw image at `restore_from`.
pub async fn run_restore(db_path: &Path, restore_from: &Path) -> Result<(), KureError> {
    let (source, dest) = (restore_from.to_path_buf(), db_path.to_path_buf());
    let had_db = dest.exists();
    blocking(move || restore(&source, &dest)).await?;
    report_restore(db_path, restore_from, had_db);
    Ok(())
}

/// Replace the database at `db_path` with an encrypted backup.
pub async fn run_encrypted_restore(
    db_path: &Path,
    restore_from: &Path,
    session: &Arc<Session>,
) -> Result<(), KureError> {
    let (source, dest) = (restore_from.to_path_buf(), db_path.to_path_buf());
    let had_db = dest.exists();
    let session = Arc::clone(session);
    blocking(move || import_encrypted(&source, &dest, &session)).await?;
    report_restore(db_path, restore_from, had_db);
    Ok(())
}

async fn blocking<T, F>(f: F) -> Result<T, KureError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, KureError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| KureError::Internal(format!("backup task failed: {e}")))?
}

fn report_size(what: &str, bytes: u64, dest: &Path) {
    let size_mb = bytes as f64 / (1024.0 * 1024.0);
    eprintln!("{what} complete: {size_mb:.1} MB written to {}", dest.display());
}

fn report_restore(db_path: &Path, source: &Path, had_db: bool) {
    if had_db {
        let safety: PathBuf = pre_restore_path(db_path);
        eprintln!("Previous database saved to {}", safety.display());
    }
    eprintln!("Restore complete from {}", source.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    use kure_crypt::KdfParams;

    async fn seed_db(path: &Path) {
        let db = kure_storage::Database::open(path).await.unwrap();
        let session = std::sync::Arc::new(
            kure_crypt::Session::unlocked(kure_crypt::KdfParams::insecure_fast(), b"pw").unwrap(),
        );
        kure_storage::register(&db, &session).await.unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn backup_of_missing_database_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_backup(&dir.path().join("absent.db"), &dir.path().join("b.db")).await;
        assert!(matches!(result, Err(KureError::Storage { .. })));
        assert!(!dir.path().join("b.db").exists());
    }

    #[tokio::test]
    async fn backup_then_restore_keeps_previous_copy() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("kure.db");
        let backup = dir.path().join("kure.bak");
        seed_db(&db).await;

        run_backup(&db, &backup).await.unwrap();
        assert!(backup.exists());

        run_restore(&db, &backup).await.unwrap();
        assert!(pre_restore_path(&db).exists());
    }

    #[tokio::test]
    async fn encrypted_backup_needs_the_same_password() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("kure.db");
        let backup = dir.path().join("kure.bak.enc");
        seed_db(&db).await;

        let params = KdfParams::insecure_fast();
        let session = Arc::new(Session::unlocked(params, b"first").unwrap());
        run_encrypted_backup(&db, &backup, &session).await.unwrap();

        let other = Arc::new(Session::unlocked(params, b"second").unwrap());
        let err = run_encrypted_restore(&dir.path().join("restored.db"), &backup, &other)
            .await
            .unwrap_err();
        assert!(matches!(err, KureError::CryptoFailure));

        run_encrypted_restore(&dir.path().join("restored.db"), &backup, &session)
            .await
            .unwrap();
        assert!(dir.path().join("restored.db").exists());
    }
}
