// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Parley bot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Parley configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParleyConfig {
    /// Bot identity and logging.
    #[serde(default)]
    pub bot: BotConfig,

    /// Telegram transport settings and access lists.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Notification scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Dialog engine settings.
    #[serde(default)]
    pub dialog: DialogConfig,

    /// Exercise catalog settings.
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Display name used in greetings and logs.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_bot_name() -> String {
    "parley".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram bot integration configuration.
///
/// User lists accept numeric ids or usernames (with or without `@`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot API token from @BotFather.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Users allowed to run administrative commands.
    #[serde(default)]
    pub admin_users: Vec<String>,

    /// When non-empty, only these users are served.
    #[serde(default)]
    pub allowed_users: Vec<String>,

    /// Users whose updates are always dropped.
    #[serde(default)]
    pub blocked_users: Vec<String>,

    /// Payment provider token for invoices. Unset means Telegram Stars.
    #[serde(default)]
    pub payment_provider_token: Option<String>,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL mode for concurrent reads.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    "parley.db".to_string()
}

/// Notification scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Run the background tick loop.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between queue polls.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,

    /// Sorted-set key holding pending notifications.
    #[serde(default = "default_queue_key")]
    pub queue_key: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_secs: default_tick_secs(),
            queue_key: default_queue_key(),
        }
    }
}

fn default_tick_secs() -> u64 {
    10
}

fn default_queue_key() -> String {
    "delayed_notifications".to_string()
}

/// Dialog engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DialogConfig {
    /// Message sent when a dialog step fails unexpectedly.
    #[serde(default = "default_apology_text")]
    pub apology_text: String,

    /// Handle one event at a time per user.
    #[serde(default = "default_true")]
    pub serialize_per_user: bool,
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            apology_text: default_apology_text(),
            serialize_per_user: true,
        }
    }
}

fn default_apology_text() -> String {
    "Sorry, something went wrong on our side. Please try again later.".to_string()
}

/// Exercise catalog configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    /// ISO 4217 currency of pack prices.
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
        }
    }
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_true() -> bool {
    true
}
