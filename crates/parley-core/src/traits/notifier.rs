// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Callback invoked by the scheduler for each due user.

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::types::UserId;

#[async_trait]
pub trait NotificationHandler: Send + Sync + 'static {
    /// Delivers one reminder. An error keeps the user queued for the next tick.
    async fn notify(&self, user: UserId) -> Result<(), ParleyError>;
}
