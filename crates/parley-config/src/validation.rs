// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::ParleyConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ParleyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.scheduler.tick_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "scheduler.tick_secs must be at least 1".to_string(),
        });
    }

    if config.scheduler.queue_key.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "scheduler.queue_key must not be empty".to_string(),
        });
    }

    if config
        .telegram
        .bot_token
        .as_deref()
        .is_some_and(|token| token.trim().is_empty())
    {
        errors.push(ConfigError::Validation {
            message: "telegram.bot_token must not be empty when set".to_string(),
        });
    }

    let currency = &config.catalog.currency;
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
        errors.push(ConfigError::Validation {
            message: format!("catalog.currency `{currency}` is not a three-letter ISO 4217 code"),
        });
    }

    for user in &config.telegram.allowed_users {
        if config.telegram.blocked_users.contains(user) {
            errors.push(ConfigError::Validation {
                message: format!(
                    "telegram user `{user}` is listed in both allowed_users and blocked_users"
                ),
            });
        }
    }

    if config.dialog.apology_text.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "dialog.apology_text must not be empty".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
