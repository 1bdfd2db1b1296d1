// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistent per-user dialog record store.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::types::{MenuName, MessageId, StateName, UserId};

/// Keyed record store mapping a user to their dialog record.
///
/// Records are created implicitly on first write and never deleted; an idle
/// record (no current state) is the steady state. Every method is a single
/// independent read or write, so several workers can share one store.
#[async_trait]
pub trait StateStore: Send + Sync + 'static {
    /// Current state name, `None` when idle.
    async fn get_state(&self, user: UserId) -> Result<Option<StateName>, ParleyError>;

    /// Sets (`Some`) or clears (`None`) the current state.
    async fn set_state(&self, user: UserId, state: Option<&StateName>) -> Result<(), ParleyError>;

    async fn get_var(&self, user: UserId, key: &str) -> Result<Option<String>, ParleyError>;

    async fn set_var(&self, user: UserId, key: &str, value: &str) -> Result<(), ParleyError>;

    async fn get_all_vars(&self, user: UserId) -> Result<HashMap<String, String>, ParleyError>;

    async fn clear_vars(&self, user: UserId) -> Result<(), ParleyError>;

    /// Last rendered menu message, used for in-place edits.
    async fn get_tracked_message_id(&self, user: UserId)
    -> Result<Option<MessageId>, ParleyError>;

    async fn set_tracked_message_id(
        &self,
        user: UserId,
        message: &MessageId,
    ) -> Result<(), ParleyError>;

    /// Menu to re-render when the current dialog step completes.
    async fn get_return_menu(&self, user: UserId) -> Result<Option<MenuName>, ParleyError>;

    async fn set_return_menu(
        &self,
        user: UserId,
        menu: Option<&MenuName>,
    ) -> Result<(), ParleyError>;
}
