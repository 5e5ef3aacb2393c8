// SPDX-FileCopyrightText: 2026 Kure Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Kure vault.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Kure configuration.
///
/// Loaded from TOML files with environment variable overrides. All sections
/// are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KureConfig {
    /// Database file settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Argon2id key derivation cost.
    #[serde(default)]
    pub argon2: Argon2Config,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// Snapshot download endpoint settings.
    #[serde(default)]
    pub http: HttpConfig,
}

/// Database file configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub path: String,

    /// File name advertised when a snapshot is downloaded.
    #[serde(default = "default_database_name")]
    pub name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            name: default_database_name(),
        }
    }
}

impl DatabaseConfig {
    /// [`path`](Self::path) with a leading `~/` expanded to the home
    /// directory.
    pub fn resolved_path(&self) -> std::path::PathBuf {
        match (self.path.strip_prefix("~/"), dirs::home_dir()) {
            (Some(rest), Some(home)) => home.join(rest),
            _ => std::path::PathBuf::from(&self.path),
        }
    }
}

fn default_database_path() -> String {
    dirs::home_dir()
        .map(|p| p.join(".kure").join("kure.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("kure.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_database_name() -> String {
    "kure.db".to_string()
}

/// Argon2id parameters used to derive every record key.
///
/// The defaults make offline guessing expensive while staying usable on a
/// laptop: one pass over 1 GiB using every logical core.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Argon2Config {
    /// Number of passes over memory (default: 1).
    #[serde(default = "default_iterations")]
    pub iterations: u32,

    /// Memory cost in KiB (default: 1048576 = 1 GiB).
    #[serde(default = "default_memory")]
    pub memory: u32,

    /// Parallel lanes (default: number of logical cores, at most 255).
    #[serde(default = "default_threads")]
    pub threads: u32,
}

impl Default for Argon2Config {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            memory: default_memory(),
            threads: default_threads(),
        }
    }
}

fn default_iterations() -> u32 {
    1
}

fn default_memory() -> u32 {
    1_048_576
}

/// Logical cores available to the process, clamped to `1..=255`.
pub fn default_threads() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, 255) as u32
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// HTTP snapshot endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// Address to bind the server to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port to bind the server to.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8732
}
