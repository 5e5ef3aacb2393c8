// SPDX-FileCopyrightText: 2026 Kure Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Kure vault.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! layered file lookup, environment variable overrides, and diagnostic error
//! rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use kure_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("Database: {}", config.database.path);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{Argon2Config, DatabaseConfig, HttpConfig, KureConfig, LogConfig};

/// Load configuration from the file hierarchy and validate it.
///
/// Figment errors are converted into diagnostics carrying source spans and
/// "did you mean" suggestions; semantic problems are all reported together.
pub fn load_and_validate() -> Result<KureConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let toml_sources = collect_toml_sources();
            Err(diagnostic::figment_to_config_errors(err, &toml_sources))
        }
    }
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<KureConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Read every TOML file that may have contributed to the figment.
fn collect_toml_sources() -> Vec<(String, String)> {
    let mut sources = Vec::new();

    if let Ok(content) = std::fs::read_to_string("kure.toml") {
        let path = std::env::current_dir()
            .map(|d| d.join("kure.toml").display().to_string())
            .unwrap_or_else(|_| "kure.toml".to_string());
        sources.push((path, content));
    }

    let files = [loader::user_config_path(), loader::explicit_config_path()];
    for path in files.into_iter().flatten() {
        let absolute = std::path::absolute(&path).unwrap_or(path);
        if let Ok(content) = std::fs::read_to_string(&absolute) {
            sources.push((absolute.display().to_string(), content));
        }
    }

    sources
}
