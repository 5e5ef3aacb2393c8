// SPDX-FileCopyrightText: 2026 Kure Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `~/.config/kure/kure.toml`, then `./kure.toml`, then the
//! file named by `KURE_CONFIG`, with `KURE_*` environment overrides on top.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use tracing::debug;

use crate::model::KureConfig;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV_VAR: &str = "KURE_CONFIG";

/// Sections that may be overridden through `KURE_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: [&str; 4] = ["database", "argon2", "log", "http"];

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `~/.config/kure/kure.toml` (user config)
/// 3. `./kure.toml` (local directory)
/// 4. `$KURE_CONFIG` (explicit file)
/// 5. `KURE_*` environment variables
pub fn load_config() -> Result<KureConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<KureConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KureConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<KureConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KureConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new()
        .merge(Serialized::defaults(KureConfig::default()))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file("kure.toml"));

    if let Some(explicit) = explicit_config_path() {
        debug!(path = %explicit.display(), "loading configuration from {CONFIG_ENV_VAR}");
        figment = figment.merge(Toml::file(explicit));
    }

    figment.merge(env_provider())
}

/// `~/.config/kure/kure.toml`, when a config directory exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("kure").join("kure.toml"))
}

/// File named by `KURE_CONFIG`, if set and non-empty.
pub fn explicit_config_path() -> Option<PathBuf> {
    std::env::var_os(CONFIG_ENV_VAR)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Create the environment variable provider.
///
/// Only `KURE_<SECTION>_*` variables are considered, so `KURE_CONFIG` and
/// `KURE_PASSWORD` never reach the strict model. The section prefix is mapped
/// with `replacen` rather than `Env::split("_")` because keys such as
/// `bind_address` contain underscores.
fn env_provider() -> Env {
    Env::prefixed("KURE_")
        .filter(|key| section_of(&key.as_str().to_ascii_lowercase()).is_some())
        .map(|key| {
            let key = key.as_str().to_ascii_lowercase();
            match section_of(&key) {
                Some(section) => key
                    .replacen(&format!("{section}_"), &format!("{section}."), 1)
                    .into(),
                None => key.into(),
            }
        })
}

fn section_of(key: &str) -> Option<&'static str> {
    ENV_SECTIONS
        .iter()
        .copied()
        .find(|section| key.starts_with(&format!("{section}_")))
}
