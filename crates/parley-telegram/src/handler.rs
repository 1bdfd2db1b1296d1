// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Access filtering and conversion of Telegram updates into [`InboundEvent`]s.
//!
//! Only private chats are handled. In a private chat the chat id equals the
//! sender's user id, which is what the transport addresses replies to.

use parley_config::model::TelegramConfig;
use parley_core::{InboundEvent, InboundKind, MediaKind, MessageId, UserId};
use teloxide::prelude::*;
use teloxide::types::{ChatKind, User};
use tracing::debug;

/// Allow, block and admin lists. Entries are numeric user ids or usernames
/// with or without the leading `@`.
#[derive(Debug, Clone, Default)]
pub struct AccessList {
    allowed: Vec<String>,
    blocked: Vec<String>,
    admins: Vec<String>,
}

impl AccessList {
    pub fn new(allowed: Vec<String>, blocked: Vec<String>, admins: Vec<String>) -> Self {
        Self {
            allowed,
            blocked,
            admins,
        }
    }

    pub fn from_config(config: &TelegramConfig) -> Self {
        Self::new(
            config.allowed_users.clone(),
            config.blocked_users.clone(),
            config.admin_users.clone(),
        )
    }

    /// Blocked users never pass. A non-empty allow list admits only its members.
    pub fn permits(&self, user: UserId, username: Option<&str>) -> bool {
        if matches_any(&self.blocked, user, username) {
            return false;
        }
        self.allowed.is_empty() || matches_any(&self.allowed, user, username)
    }

    pub fn is_admin(&self, user: UserId, username: Option<&str>) -> bool {
        matches_any(&self.admins, user, username)
    }
}

fn matches_any(entries: &[String], user: UserId, username: Option<&str>) -> bool {
    let id = user.0.to_string();
    entries.iter().any(|entry| {
        if *entry == id {
            return true;
        }
        let clean = entry.strip_prefix('@').unwrap_or(entry);
        username.is_some_and(|name| name.eq_ignore_ascii_case(clean))
    })
}

/// Checks whether the message is from a private (DM) chat.
pub fn is_dm(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}

fn user_id(user: &User) -> UserId {
    UserId(user.id.0 as i64)
}

/// Converts a private message into an inbound event.
///
/// Returns `None` for messages without a sender and for unsupported kinds
/// (stickers, locations, polls).
pub fn message_to_event(msg: &Message) -> Option<InboundEvent> {
    let from = msg.from.as_ref()?;
    let kind = if let Some(text) = msg.text() {
        InboundKind::Text(text.to_string())
    } else if let Some(contact) = msg.contact() {
        InboundKind::Contact {
            phone: contact.phone_number.clone(),
        }
    } else if let Some((kind, file_id)) = media_of(msg) {
        InboundKind::Media {
            kind,
            file_id,
            caption: msg.caption().map(str::to_string),
        }
    } else {
        debug!(msg_id = msg.id.0, "ignoring unsupported message type");
        return None;
    };

    Some(InboundEvent {
        user_id: user_id(from),
        username: from.username.clone(),
        message_id: Some(MessageId(msg.id.0.to_string())),
        kind,
    })
}

fn media_of(msg: &Message) -> Option<(MediaKind, String)> {
    if let Some(photos) = msg.photo() {
        // Telegram provides multiple sizes; the last one is the largest.
        return photos
            .last()
            .map(|p| (MediaKind::Photo, p.file.id.to_string()));
    }
    if let Some(video) = msg.video() {
        return Some((MediaKind::Video, video.file.id.to_string()));
    }
    if let Some(audio) = msg.audio() {
        return Some((MediaKind::Audio, audio.file.id.to_string()));
    }
    if let Some(voice) = msg.voice() {
        return Some((MediaKind::Voice, voice.file.id.to_string()));
    }
    if let Some(doc) = msg.document() {
        return Some((MediaKind::Document, doc.file.id.to_string()));
    }
    None
}

/// Converts a pre-checkout query into a [`InboundKind::Checkout`] event.
pub fn checkout_to_event(q: &PreCheckoutQuery) -> InboundEvent {
    InboundEvent {
        user_id: user_id(&q.from),
        username: q.from.username.clone(),
        message_id: None,
        kind: InboundKind::Checkout {
            checkout_id: q.id.to_string(),
            payload: q.invoice_payload.clone(),
            total: q.total_amount,
            currency: q.currency.clone(),
        },
    }
}

/// Converts an inline button click. Clicks without data are ignored.
pub fn callback_to_event(q: &CallbackQuery) -> Option<InboundEvent> {
    let payload = q.data.clone()?;
    Some(InboundEvent {
        user_id: user_id(&q.from),
        username: q.from.username.clone(),
        message_id: q
            .message
            .as_ref()
            .map(|m| MessageId(m.id().0.to_string())),
        kind: InboundKind::Click {
            payload,
            callback_id: q.id.to_string(),
        },
    })
}
