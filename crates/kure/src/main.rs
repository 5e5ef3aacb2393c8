// SPDX-FileCopyrightText: 2026 Kure Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kure - an encrypted local secrets vault.
//!
//! This is the operator binary: vault creation, backups, the snapshot
//! server and a name listing. Record editing lives in the library crates.

mod backup;
mod serve;
mod shutdown;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use kure_config::KureConfig;
use kure_core::{KureError, Partition, Record};
use kure_crypt::{KdfParams, Session, read_new_password, read_password};
use kure_storage::{
    CardStore, Database, EntryStore, FileStore, RecordStore, SnapshotExporter, TotpStore,
    WalletStore, change_password, is_registered, login, register,
};
use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;

use crate::shutdown::OnSignal;

/// Kure - an encrypted local secrets vault.
#[derive(Parser, Debug)]
#[command(name = "kure", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the vault and set its master password.
    Init,
    /// Copy the database to a file.
    Backup {
        /// Destination file.
        path: PathBuf,
        /// Seal the copy with the master password.
        #[arg(long)]
        encrypt: bool,
    },
    /// Replace the database with a backup.
    Restore {
        /// Backup file to restore from.
        path: PathBuf,
        /// The backup was written with `backup --encrypt`.
        #[arg(long)]
        encrypted: bool,
    },
    /// Serve database snapshots over HTTP.
    Serve,
    /// List record names in a partition.
    Ls {
        /// One of card, entry, file, wallet, totp.
        partition: Partition,
    },
    /// Change the master password and re-encrypt every record.
    Passwd,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match kure_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            kure_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log.level);

    let session = Arc::new(Session::new(KdfParams::from(&config.argon2)));
    let mode = match cli.command {
        Commands::Serve => OnSignal::Drain,
        _ => OnSignal::Exit,
    };
    let shutdown = shutdown::install_signal_handler(Arc::clone(&session), mode);

    let result = run(cli.command, &config, &session, shutdown).await;
    session.lock();

    if let Err(e) = result {
        eprintln!("kure: {}", e.user_message());
        std::process::exit(1);
    }
}

async fn run(
    command: Commands,
    config: &KureConfig,
    session: &Arc<Session>,
    shutdown: CancellationToken,
) -> Result<(), KureError> {
    let db_path = config.database.resolved_path();

    match command {
        Commands::Init => init(&db_path, session).await,
        Commands::Backup { path, encrypt } => {
            if encrypt {
                open_vault(&db_path, session).await?.close().await?;
                backup::run_encrypted_backup(&db_path, &path, session).await?;
            } else {
                backup::run_backup(&db_path, &path).await?;
            }
            Ok(())
        }
        Commands::Restore { path, encrypted } => {
            if encrypted {
                unlock_for_import(&db_path, session).await?;
                backup::run_encrypted_restore(&db_path, &path, session).await
            } else {
                backup::run_restore(&db_path, &path).await
            }
        }
        Commands::Serve => {
            open_vault(&db_path, session).await?.close().await?;
            let state = serve::AppState {
                exporter: SnapshotExporter::new(&db_path),
                db_name: config.database.name.clone(),
                start_time: Instant::now(),
            };
            serve::run(&config.http, state, shutdown).await
        }
        Commands::Ls { partition } => {
            let db = open_vault(&db_path, session).await?;
            let names = list_names(&db, session, partition).await;
            db.close().await?;
            for name in names? {
                println!("{name}");
            }
            Ok(())
        }
        Commands::Passwd => {
            let db = open_vault(&db_path, session).await?;
            let result = passwd(&db, session).await;
            db.close().await?;
            let count = result?;
            eprintln!("Master password changed: {count} records re-encrypted");
            Ok(())
        }
    }
}

async fn init(db_path: &Path, session: &Arc<Session>) -> Result<(), KureError> {
    let db = Database::open(db_path).await?;
    if is_registered(&db).await? {
        db.close().await?;
        return Err(KureError::InvalidInput(format!(
            "a vault already exists at {}",
            db_path.display()
        )));
    }

    let password = read_new_password()?;
    session.unlock(password.expose_secret().as_bytes())?;
    let result = register(&db, session).await;
    db.close().await?;
    result?;

    eprintln!("Vault created at {}", db_path.display());
    Ok(())
}

/// Open an existing vault and log in with the master password.
async fn open_vault(db_path: &Path, session: &Arc<Session>) -> Result<Database, KureError> {
    let missing = || {
        KureError::InvalidInput(format!(
            "no vault at {}; run `kure init` first",
            db_path.display()
        ))
    };

    if !db_path.exists() {
        return Err(missing());
    }

    let db = Database::open(db_path).await?;
    if !is_registered(&db).await? {
        db.close().await?;
        return Err(missing());
    }

    unlock(session)?;
    if let Err(e) = login(&db, session).await {
        db.close().await?;
        return Err(e);
    }
    Ok(db)
}

/// Unlock for an encrypted restore.
///
/// An existing vault supplies its stored derivation parameters and checks
/// the password; otherwise the configured parameters are used as-is.
async fn unlock_for_import(db_path: &Path, session: &Arc<Session>) -> Result<(), KureError> {
    if db_path.exists() {
        let db = Database::open(db_path).await?;
        let registered = is_registered(&db).await?;
        db.close().await?;
        if registered {
            return open_vault(db_path, session).await?.close().await;
        }
    }
    unlock(session)
}

fn unlock(session: &Session) -> Result<(), KureError> {
    let password = read_password()?;
    session.unlock(password.expose_secret().as_bytes())
}

async fn passwd(db: &Database, session: &Arc<Session>) -> Result<usize, KureError> {
    let new_password = read_new_password()?;
    change_password(db, session, &new_password).await
}

async fn list_names(
    db: &Database,
    session: &Arc<Session>,
    partition: Partition,
) -> Result<Vec<String>, KureError> {
    let (db, session) = (db.clone(), Arc::clone(session));
    match partition {
        Partition::Card => names(CardStore::new(db, session)).await,
        Partition::Entry => names(EntryStore::new(db, session)).await,
        Partition::File => names(FileStore::new(db, session)).await,
        Partition::Wallet => names(WalletStore::new(db, session)).await,
        Partition::Totp => names(TotpStore::new(db, session)).await,
    }
}

/// Display names of the live records in `store`.
async fn names<T: Record>(store: RecordStore<T>) -> Result<Vec<String>, KureError> {
    Ok(store
        .list()
        .await?
        .iter()
        .map(|record| record.name().to_string())
        .collect())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kure={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
