// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dialog state machine and inline menus for Parley.
//!
//! [`DialogEngine`] drives multi-step dialogs whose progress is persisted in a
//! [`StateStore`](parley_core::StateStore). [`MenuRegistry`] renders inline
//! menus and keeps the most recent one editable in place. Both are built once
//! at startup and then shared read-only.

pub mod callback;
pub mod context;
pub mod engine;
pub mod layout;
pub mod locks;
pub mod menu;
pub mod state;

pub use context::DialogContext;
pub use engine::{ClickOutcome, DialogEngine, UpdateOutcome};
pub use layout::{ROW_BREAK, pack_rows, reply_keyboard};
pub use locks::UserLocks;
pub use menu::{
    ButtonTemplate, ButtonText, ClickAction, DataMap, FollowUp, MenuDefinition, MenuRegistry,
    TextFallback,
};
pub use state::{DialogState, MutatorOutcome};
