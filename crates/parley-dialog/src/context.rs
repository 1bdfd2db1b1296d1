// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-call context handed to validators, mutators and menu callbacks.

use std::collections::HashMap;
use std::sync::Arc;

use parley_core::{Content, InboundEvent, MessageId, ParleyError, StateStore, Transport, UserId};

/// Who is talking, what they sent, and handles to reply and remember things.
///
/// Cheap to clone. Carries no dialog state of its own: every read and write
/// goes straight to the state store.
#[derive(Clone)]
pub struct DialogContext {
    user: UserId,
    event: Option<InboundEvent>,
    store: Arc<dyn StateStore>,
    transport: Arc<dyn Transport>,
}

impl DialogContext {
    pub fn new(
        user: UserId,
        event: Option<InboundEvent>,
        store: Arc<dyn StateStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            user,
            event,
            store,
            transport,
        }
    }

    pub fn user(&self) -> UserId {
        self.user
    }

    /// The inbound event being handled. `None` for renders and triggers.
    pub fn event(&self) -> Option<&InboundEvent> {
        self.event.as_ref()
    }

    /// Trimmed text (or caption) of the inbound event.
    pub fn text(&self) -> Option<&str> {
        self.event
            .as_ref()
            .and_then(InboundEvent::text_content)
            .map(str::trim)
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub async fn get_var(&self, key: &str) -> Result<Option<String>, ParleyError> {
        self.store.get_var(self.user, key).await
    }

    pub async fn set_var(&self, key: &str, value: &str) -> Result<(), ParleyError> {
        self.store.set_var(self.user, key, value).await
    }

    pub async fn vars(&self) -> Result<HashMap<String, String>, ParleyError> {
        self.store.get_all_vars(self.user).await
    }

    /// Sends a message to the user's chat.
    pub async fn send(&self, content: impl Into<Content>) -> Result<MessageId, ParleyError> {
        self.transport.send(self.user, content.into()).await
    }
}

impl std::fmt::Debug for DialogContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogContext")
            .field("user", &self.user)
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}
