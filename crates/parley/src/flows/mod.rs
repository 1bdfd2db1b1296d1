// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Application dialogs and menus.

pub mod admin;
pub mod catalog;
pub mod catalog_admin;
pub mod lessons;
pub mod notifications;
pub mod recording;
pub mod settings;
pub mod survey;

use parley_core::{Content, Keyboard};
use parley_dialog::{DialogEngine, FollowUp, reply_keyboard};

use crate::app::Services;

pub const REMINDERS_LABEL: &str = "🔔 Reminders";
pub const ACCOUNT_LABEL: &str = "⚙️ Account";
pub const EXERCISES_LABEL: &str = "🎵 Exercises";
pub const LESSON_LABEL: &str = "📝 Book a lesson";

/// Persistent reply keyboard shown to registered users.
pub fn main_keyboard() -> Keyboard {
    reply_keyboard(
        [EXERCISES_LABEL, LESSON_LABEL, REMINDERS_LABEL, ACCOUNT_LABEL],
        2,
        false,
    )
}

/// Follow-up of every menu's cancel button.
pub fn cancel_follow_up() -> FollowUp {
    FollowUp::Reset {
        keep_vars: false,
        notice: Some(Content::text("OK").with_keyboard(main_keyboard())),
    }
}

/// Registers every dialog state and menu, then checks cross references.
pub fn register_all(
    engine: &mut DialogEngine,
    services: &Services,
) -> Result<(), parley_core::ParleyError> {
    survey::register(engine, services)?;
    settings::register(engine, services)?;
    notifications::register(engine, services)?;
    admin::register(engine, services)?;
    catalog::register(engine, services)?;
    catalog_admin::register(engine, services)?;
    lessons::register(engine, services)?;
    engine.validate()
}

/// Title-cases each whitespace separated word.
pub fn title_case(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_case_normalizes_words() {
        assert_eq!(title_case("  new   YORK "), "New York");
        assert_eq!(title_case("санкт-петербург"), "Санкт-петербург");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn main_keyboard_pairs_the_labels() {
        match main_keyboard() {
            Keyboard::Reply { rows, one_time } => {
                assert_eq!(
                    rows,
                    vec![
                        vec![EXERCISES_LABEL.to_string(), LESSON_LABEL.to_string()],
                        vec![REMINDERS_LABEL.to_string(), ACCOUNT_LABEL.to_string()],
                    ]
                );
                assert!(!one_time);
            }
            other => panic!("expected reply keyboard, got {other:?}"),
        }
    }
}
