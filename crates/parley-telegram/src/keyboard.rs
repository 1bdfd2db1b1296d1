// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of [`Keyboard`] into Telegram reply markup.

use parley_core::{InlineButton, Keyboard, ParseMode};
use teloxide::types::{
    ButtonRequest, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
    KeyboardRemove, ReplyMarkup,
};

pub fn inline_markup(rows: &[Vec<InlineButton>]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(rows.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.text.clone(), b.payload.clone()))
            .collect::<Vec<_>>()
    }))
}

fn text_rows(rows: &[Vec<String>]) -> Vec<Vec<KeyboardButton>> {
    rows.iter()
        .map(|row| row.iter().map(KeyboardButton::new).collect())
        .collect()
}

pub fn reply_markup(keyboard: &Keyboard) -> ReplyMarkup {
    match keyboard {
        Keyboard::Inline(rows) => ReplyMarkup::InlineKeyboard(inline_markup(rows)),
        Keyboard::Reply { rows, one_time } => {
            let mut markup = KeyboardMarkup::new(text_rows(rows)).resize_keyboard();
            if *one_time {
                markup = markup.one_time_keyboard();
            }
            ReplyMarkup::Keyboard(markup)
        }
        Keyboard::ContactRequest { share, rows } => {
            let mut buttons =
                vec![vec![KeyboardButton::new(share.clone()).request(ButtonRequest::Contact)]];
            buttons.extend(text_rows(rows));
            ReplyMarkup::Keyboard(KeyboardMarkup::new(buttons).resize_keyboard())
        }
        Keyboard::RemoveReply => ReplyMarkup::KeyboardRemove(KeyboardRemove::new()),
    }
}

/// Telegram parse mode, `None` for plain text.
pub fn parse_mode(mode: ParseMode) -> Option<teloxide::types::ParseMode> {
    match mode {
        ParseMode::Plain => None,
        ParseMode::Html => Some(teloxide::types::ParseMode::Html),
    }
}
