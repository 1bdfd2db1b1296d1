// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; without an installed recorder every call is a no-op.

use metrics::{describe_counter, describe_gauge};

/// Register all Parley metric descriptions.
///
/// Called once at startup.
pub fn register_metrics() {
    describe_counter!(
        "parley_dialog_transitions_total",
        "Dialog states entered, by state"
    );
    describe_counter!(
        "parley_dialog_failures_total",
        "Mutator failures that forced a dialog reset"
    );
    describe_counter!("parley_notifications_fired_total", "Reminders delivered");
    describe_counter!(
        "parley_notifications_failed_total",
        "Reminder deliveries that failed and stay queued"
    );
    describe_counter!(
        "parley_telegram_messages_sent_total",
        "Messages sent through the Telegram transport"
    );
    describe_gauge!("parley_notification_queue_size", "Users currently queued");
}

pub fn record_transition(state: &str) {
    metrics::counter!("parley_dialog_transitions_total", "state" => state.to_string()).increment(1);
}

pub fn record_dialog_failure(state: &str) {
    metrics::counter!("parley_dialog_failures_total", "state" => state.to_string()).increment(1);
}

pub fn record_notifications(fired: usize, failed: usize) {
    metrics::counter!("parley_notifications_fired_total").increment(fired as u64);
    metrics::counter!("parley_notifications_failed_total").increment(failed as u64);
}

pub fn record_message_sent() {
    metrics::counter!("parley_telegram_messages_sent_total").increment(1);
}

pub fn set_queue_size(size: usize) {
    metrics::gauge!("parley_notification_queue_size").set(size as f64);
}
