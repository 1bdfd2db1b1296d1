// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Parley configuration system.

use parley_config::diagnostic::ConfigError;
use parley_config::model::ParleyConfig;
use parley_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_parley_config() {
    let toml = r#"
[bot]
name = "vocal-coach"
log_level = "debug"

[telegram]
bot_token = "123:ABC"
admin_users = ["@mentor"]
allowed_users = ["1", "2"]
blocked_users = ["3"]

[storage]
database_path = "/tmp/parley-test.db"
wal_mode = false

[scheduler]
enabled = false
tick_secs = 30
queue_key = "reminders"

[dialog]
apology_text = "Oops"
serialize_per_user = false
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.bot.name, "vocal-coach");
    assert_eq!(config.bot.log_level, "debug");
    assert_eq!(config.telegram.bot_token.as_deref(), Some("123:ABC"));
    assert_eq!(config.telegram.admin_users, vec!["@mentor"]);
    assert_eq!(config.telegram.allowed_users, vec!["1", "2"]);
    assert_eq!(config.telegram.blocked_users, vec!["3"]);
    assert_eq!(config.storage.database_path, "/tmp/parley-test.db");
    assert!(!config.storage.wal_mode);
    assert!(!config.scheduler.enabled);
    assert_eq!(config.scheduler.tick_secs, 30);
    assert_eq!(config.scheduler.queue_key, "reminders");
    assert_eq!(config.dialog.apology_text, "Oops");
    assert!(!config.dialog.serialize_per_user);
}

/// Missing sections fall back to defaults.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.bot.name, "parley");
    assert_eq!(config.bot.log_level, "info");
    assert!(config.telegram.bot_token.is_none());
    assert!(config.telegram.admin_users.is_empty());
    assert_eq!(config.storage.database_path, "parley.db");
    assert!(config.storage.wal_mode);
    assert!(config.scheduler.enabled);
    assert_eq!(config.scheduler.tick_secs, 10);
    assert_eq!(config.scheduler.queue_key, "delayed_notifications");
    assert!(config.dialog.serialize_per_user);
}

/// Unknown field in a section is rejected.
#[test]
fn unknown_field_in_scheduler_produces_error() {
    let toml = r#"
[scheduler]
tick_sec = 5
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("tick_sec"),
        "error should mention the bad key, got: {err_str}"
    );
}

/// Unexpected top-level section is rejected.
#[test]
fn deny_unknown_fields_at_top_level() {
    let err = load_config_from_str("[redis]\nurl = \"x\"\n")
        .expect_err("unknown top-level section should be rejected");
    let err_str = format!("{err}");
    assert!(err_str.contains("unknown field") || err_str.contains("redis"));
}

/// Dotted overrides (what the env provider produces) land on the right field.
#[test]
fn dotted_override_sets_nested_key() {
    use figment::{Figment, providers::Serialized};

    let config: ParleyConfig = Figment::new()
        .merge(Serialized::defaults(ParleyConfig::default()))
        .merge(("telegram.bot_token", "xyz-from-env"))
        .merge(("scheduler.tick_secs", 3))
        .extract()
        .expect("dotted keys should merge");

    assert_eq!(config.telegram.bot_token.as_deref(), Some("xyz-from-env"));
    assert_eq!(config.scheduler.tick_secs, 3);
}

/// Environment variables override file values.
#[test]
#[serial_test::serial]
fn env_var_overrides_file_value() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("parley.toml");
    std::fs::write(&path, "[scheduler]\ntick_secs = 20\n").unwrap();

    // SAFETY: serialized with other env-mutating tests.
    unsafe { std::env::set_var("PARLEY_SCHEDULER_TICK_SECS", "7") };
    let result = load_and_validate_path(&path);
    unsafe { std::env::remove_var("PARLEY_SCHEDULER_TICK_SECS") };

    let config = result.expect("file plus env should validate");
    assert_eq!(config.scheduler.tick_secs, 7);
}

/// An explicit file with a typo reports the key with a suggestion.
#[test]
#[serial_test::serial]
fn explicit_file_reports_unknown_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("parley.toml");
    std::fs::write(&path, "[telegram]\nbot_tken = \"abc\"\n").unwrap();

    let errors = load_and_validate_path(&path).expect_err("typo should be rejected");
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::UnknownKey { key, suggestion, .. }
            if key == "bot_tken" && suggestion.as_deref() == Some("bot_token")
    )));
}

/// Inline source errors carry a suggestion and the section's valid keys.
#[test]
fn diagnostic_error_includes_suggestion_and_valid_keys() {
    let toml = r#"
[bot]
naem = "test"
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let found = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, span, .. } if {
            key == "naem"
                && suggestion.as_deref() == Some("name")
                && valid_keys.contains("log_level")
                && span.is_some()
        })
    });
    assert!(found, "expected UnknownKey for `naem`, got: {errors:?}");
}

/// Wrong value types are reported as InvalidType.
#[test]
fn invalid_type_is_reported() {
    let errors = load_and_validate_str("[scheduler]\ntick_secs = \"soon\"\n")
        .expect_err("string tick should be rejected");
    assert!(errors.iter().any(|e| matches!(e, ConfigError::InvalidType { .. })));
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_runs_after_parse() {
    let errors = load_and_validate_str("[scheduler]\ntick_secs = 0\n")
        .expect_err("zero tick should fail validation");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("tick_secs"))
    ));
}

/// ConfigError renders through miette with its help text.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "naem".to_string(),
        suggestion: Some("name".to_string()),
        valid_keys: "name, log_level".to_string(),
        span: None,
        src: None,
    };
    assert!(error.code().is_some());
    let help = error.help().map(|h| h.to_string()).unwrap_or_default();
    assert!(help.contains("did you mean `name`"), "got: {help}");

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("should render");
    assert!(buf.contains("naem"));
}
