// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by stores, transports and the dialog layer.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Messaging platform user identifier. In private chats it doubles as the chat id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(UserId)
    }
}

macro_rules! name_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(name: impl Into<String>) -> Self {
                Self(name.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

name_newtype!(
    /// Registry key of a dialog state. Persisted as plain text.
    StateName
);

name_newtype!(
    /// Registry key of an interactive menu. Also embedded in click payloads.
    MenuName
);

/// Opaque transport handle of a sent message, used for in-place edits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// How the transport should interpret message text.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum ParseMode {
    #[default]
    Plain,
    Html,
}

/// A clickable inline button: visible text plus the opaque click payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    pub text: String,
    pub payload: String,
}

/// Keyboard attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Keyboard {
    /// Buttons rendered under the message; clicks arrive as [`InboundKind::Click`].
    Inline(Vec<Vec<InlineButton>>),
    /// Replacement keyboard whose buttons send their own text.
    Reply { rows: Vec<Vec<String>>, one_time: bool },
    /// Hide a previously shown reply keyboard.
    RemoveReply,
    /// Reply keyboard led by a button that shares the user's phone number.
    ContactRequest { share: String, rows: Vec<Vec<String>> },
}

/// A file already known to the transport, resent by its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub kind: MediaKind,
    pub file_id: String,
}

/// Outgoing message content.
///
/// With `media` set, `text` is sent as the caption.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub text: String,
    pub keyboard: Option<Keyboard>,
    pub parse_mode: ParseMode,
    #[serde(default)]
    pub media: Option<Media>,
    /// The recipient may not forward or save the message.
    #[serde(default)]
    pub protected: bool,
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn media(kind: MediaKind, file_id: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            text: caption.into(),
            media: Some(Media {
                kind,
                file_id: file_id.into(),
            }),
            ..Self::default()
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    /// Attaches `keyboard` only if none is set yet.
    pub fn or_keyboard(mut self, keyboard: Option<&Keyboard>) -> Self {
        if self.keyboard.is_none() {
            self.keyboard = keyboard.cloned();
        }
        self
    }

    pub fn html(mut self) -> Self {
        self.parse_mode = ParseMode::Html;
        self
    }

    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Content::text(s)
    }
}

impl From<String> for Content {
    fn from(s: String) -> Self {
        Content::text(s)
    }
}

/// Kind of attached media in an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
    Audio,
    Voice,
    Document,
}

/// Payload of an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundKind {
    Text(String),
    Media {
        kind: MediaKind,
        file_id: String,
        caption: Option<String>,
    },
    Contact { phone: String },
    /// An inline button click. `callback_id` must be acknowledged on the transport.
    Click { payload: String, callback_id: String },
    /// A payment about to be charged. `checkout_id` must be answered on the transport.
    Checkout {
        checkout_id: String,
        payload: String,
        total: u32,
        currency: String,
    },
}

/// A normalized inbound transport event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub user_id: UserId,
    pub username: Option<String>,
    /// For messages, the message itself. For clicks, the message carrying the keyboard.
    pub message_id: Option<MessageId>,
    pub kind: InboundKind,
}

impl InboundEvent {
    pub fn text(user_id: UserId, text: impl Into<String>) -> Self {
        Self {
            user_id,
            username: None,
            message_id: None,
            kind: InboundKind::Text(text.into()),
        }
    }

    pub fn click(
        user_id: UserId,
        message_id: Option<MessageId>,
        payload: impl Into<String>,
        callback_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            username: None,
            message_id,
            kind: InboundKind::Click {
                payload: payload.into(),
                callback_id: callback_id.into(),
            },
        }
    }

    /// The message as content that can be relayed to another chat.
    pub fn as_content(&self) -> Option<Content> {
        match &self.kind {
            InboundKind::Text(text) => Some(Content::text(text.clone())),
            InboundKind::Media {
                kind,
                file_id,
                caption,
            } => Some(Content::media(
                *kind,
                file_id.clone(),
                caption.clone().unwrap_or_default(),
            )),
            _ => None,
        }
    }

    /// Message text, or the caption of a media message.
    pub fn text_content(&self) -> Option<&str> {
        match &self.kind {
            InboundKind::Text(text) => Some(text),
            InboundKind::Media { caption, .. } => caption.as_deref(),
            _ => None,
        }
    }
}

/// A payment request sent to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub title: String,
    pub description: String,
    /// Echoed back in the matching [`InboundKind::Checkout`].
    pub payload: String,
    pub currency: String,
    /// Price in the smallest unit of `currency`.
    pub amount: u32,
}

/// Result of an in-place message edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Edited,
    /// The new content was identical to the current one; nothing changed.
    Unchanged,
}
