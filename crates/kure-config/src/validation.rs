// SPDX-FileCopyrightText: 2026 Kure Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::KureConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every problem instead of stopping at the first one.
pub fn validate_config(config: &KureConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut invalid = |message: String| errors.push(ConfigError::Validation { message });

    if config.database.path.trim().is_empty() {
        invalid("database.path must not be empty".to_string());
    }

    let name = config.database.name.trim();
    if name.is_empty() {
        invalid("database.name must not be empty".to_string());
    } else if name.contains(['/', '\\', '"']) {
        invalid(format!(
            "database.name `{name}` must be a bare file name without separators or quotes"
        ));
    }

    let argon2 = &config.argon2;
    if argon2.iterations < 1 {
        invalid("argon2.iterations must be at least 1".to_string());
    }

    if !(1..=255).contains(&argon2.threads) {
        invalid(format!(
            "argon2.threads must be between 1 and 255, got {}",
            argon2.threads
        ));
    }

    // Argon2 needs at least 8 KiB per lane.
    if u64::from(argon2.memory) < 8 * u64::from(argon2.threads.max(1)) {
        invalid(format!(
            "argon2.memory must be at least 8 KiB per thread ({} KiB for {} threads), got {}",
            8 * argon2.threads.max(1),
            argon2.threads,
            argon2.memory
        ));
    }

    if config.http.bind_address.trim().is_empty() {
        invalid("http.bind_address must not be empty".to_string());
    }

    if !["trace", "debug", "info", "warn", "error"].contains(&config.log.level.as_str()) {
        invalid(format!(
            "log.level must be one of trace, debug, info, warn, error; got `{}`",
            config.log.level
        ));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
