// SPDX-FileCopyrightText: 2026 Kure Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signal handling that wipes the master password before the process stops.
//!
//! SIGINT and SIGTERM always lock the session first. Long-running commands
//! (`serve`) then drain through a [`CancellationToken`]; one-shot commands
//! may be blocked on a password prompt, so they exit right away.

use std::sync::Arc;

use kure_crypt::Session;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What happens after the session is wiped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnSignal {
    /// Cancel the token and let the command finish its own shutdown.
    Drain,
    /// Exit with status 130 immediately.
    Exit,
}

/// Installs handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is
/// received, after `session` has been locked.
pub fn install_signal_handler(session: Arc<Session>, mode: OnSignal) -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        wait_for_signal().await;

        session.lock();
        token_clone.cancel();
        debug!("shutdown signal handler completed");

        if mode == OnSignal::Exit {
            std::process::exit(130);
        }
    });

    token
}

async fn wait_for_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {
                        info!("received SIGINT (Ctrl+C), wiping session");
                    }
                    _ = sigterm.recv() => {
                        info!("received SIGTERM, wiping session");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                let _ = ctrl_c.await;
                info!("received SIGINT (Ctrl+C), wiping session");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        info!("received Ctrl+C, wiping session");
    }
}
