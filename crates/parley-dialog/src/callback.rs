// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Click payload codec: `"{button_id}|{menu}"`.
//!
//! Menu names never contain the separator, so decoding splits on the last one
//! and button ids may contain it freely.

use parley_core::MenuName;

pub const SEPARATOR: char = '|';

/// Telegram rejects callback data longer than this.
pub const MAX_PAYLOAD_BYTES: usize = 64;

pub fn encode(button_id: &str, menu: &MenuName) -> String {
    format!("{button_id}{SEPARATOR}{menu}")
}

/// Splits a payload into `(button_id, menu)`.
pub fn decode(payload: &str) -> Option<(&str, MenuName)> {
    let (id, menu) = payload.rsplit_once(SEPARATOR)?;
    if id.is_empty() || menu.is_empty() {
        return None;
    }
    Some((id, MenuName::from(menu)))
}
