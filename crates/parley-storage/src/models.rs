// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types returned by the query modules.

use serde::{Deserialize, Serialize};

use parley_core::{Content, MediaKind, MenuName, MessageId, StateName, UserId};

/// Full dialog record of one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogRecord {
    pub state: Option<StateName>,
    pub variables: serde_json::Map<String, serde_json::Value>,
    pub message_id: Option<MessageId>,
    pub return_menu: Option<MenuName>,
}

/// A registered user's profile as collected by the survey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub username: Option<String>,
    pub display_name: String,
    pub age: Option<u32>,
    pub city: Option<String>,
    pub utc_offset_minutes: i32,
    pub timezone_label: String,
    pub experience: Option<String>,
}

impl UserProfile {
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            username: None,
            display_name: display_name.into(),
            age: None,
            city: None,
            utc_offset_minutes: 0,
            timezone_label: parley_core::schedule::format_utc_offset(0),
            experience: None,
        }
    }
}

/// A stored cheer-up message appended to notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheerUp {
    pub id: i64,
    pub body: String,
    pub created_at: String,
}

/// A purchasable group of exercises. `price` is in whole currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pack {
    pub id: i64,
    pub name: String,
    pub price: u32,
}

impl Pack {
    pub fn is_free(&self) -> bool {
        self.price == 0
    }
}

/// A pack as one user sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackOffer {
    pub pack: Pack,
    pub purchased: bool,
}

impl PackOffer {
    pub fn unlocked(&self) -> bool {
        self.purchased || self.pack.is_free()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: i64,
    pub pack_id: i64,
    pub name: String,
}

/// One recorded message: text, or a media file with its caption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedPart {
    pub media: Option<(MediaKind, String)>,
    pub body: String,
}

impl RecordedPart {
    pub fn from_content(content: &Content) -> Self {
        Self {
            media: content.media.as_ref().map(|m| (m.kind, m.file_id.clone())),
            body: content.text.clone(),
        }
    }

    pub fn to_content(&self) -> Content {
        match &self.media {
            Some((kind, file_id)) => Content::media(*kind, file_id.clone(), self.body.clone()),
            None => Content::text(self.body.clone()),
        }
    }
}

/// A completed purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub user_id: UserId,
    pub pack_id: i64,
    pub checkout_id: String,
    /// Amount and currency as charged, e.g. `500EUR`.
    pub paid: String,
}

/// A user's request for a personal lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonRequest {
    pub user_id: UserId,
    pub username: Option<String>,
    /// `None` when the user prefers a private message over a call.
    pub phone: Option<String>,
    pub resolved: bool,
    pub created_at: String,
}
