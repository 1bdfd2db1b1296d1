// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery of scheduled reminders.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use parley_core::{Content, NotificationHandler, ParleyError, Transport, UserId};
use parley_storage::SqliteStorage;

pub const REMINDER_TEXT: &str = "⏰ Time for your check-in! How is your day going?";

/// Sends the reminder, followed by a random cheer-up when the library has any.
pub struct ReminderNotifier {
    storage: Arc<SqliteStorage>,
    transport: Arc<dyn Transport>,
}

impl ReminderNotifier {
    pub fn new(storage: Arc<SqliteStorage>, transport: Arc<dyn Transport>) -> Self {
        Self { storage, transport }
    }
}

/// Reminder body with an optional cheer-up appended.
pub fn reminder_content(cheer_up: Option<&str>) -> Content {
    match cheer_up {
        Some(extra) => Content::text(format!("{REMINDER_TEXT}\n\n{extra}")),
        None => Content::text(REMINDER_TEXT),
    }
}

#[async_trait]
impl NotificationHandler for ReminderNotifier {
    async fn notify(&self, user: UserId) -> Result<(), ParleyError> {
        let cheer_up = self.storage.random_cheer_up().await?;
        self.transport
            .send(user, reminder_content(cheer_up.as_deref()))
            .await?;
        debug!(user_id = %user, with_cheer_up = cheer_up.is_some(), "reminder delivered");
        Ok(())
    }
}
