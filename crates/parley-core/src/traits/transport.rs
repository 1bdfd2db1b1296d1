// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat transport traits.

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::traits::adapter::Adapter;
use crate::types::{Content, EditOutcome, InboundEvent, Invoice, MessageId, UserId};

/// Outbound side of a chat transport.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends a new message to the user's private chat.
    async fn send(&self, user: UserId, content: Content) -> Result<MessageId, ParleyError>;

    /// Replaces the text and inline keyboard of a previously sent message.
    ///
    /// Byte-identical content is reported as [`EditOutcome::Unchanged`], not an error.
    async fn edit(
        &self,
        user: UserId,
        message: &MessageId,
        content: Content,
    ) -> Result<EditOutcome, ParleyError>;

    /// Acknowledges an inline button click, optionally with a short toast.
    async fn answer_click(&self, callback_id: &str, notice: Option<&str>)
    -> Result<(), ParleyError>;

    /// Sends a payment request.
    async fn send_invoice(&self, user: UserId, invoice: &Invoice) -> Result<MessageId, ParleyError>;

    /// Approves a pending checkout, or declines it with `error` shown to the user.
    async fn answer_checkout(
        &self,
        checkout_id: &str,
        error: Option<&str>,
    ) -> Result<(), ParleyError>;
}

/// Full bidirectional channel: a transport that also produces inbound events.
#[async_trait]
pub trait ChannelAdapter: Transport + Adapter {
    /// Starts receiving updates from the platform.
    async fn connect(&mut self) -> Result<(), ParleyError>;

    /// Waits for the next inbound event.
    async fn receive(&self) -> Result<InboundEvent, ParleyError>;
}
