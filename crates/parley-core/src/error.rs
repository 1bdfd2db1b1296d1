// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Parley bot framework.

use thiserror::Error;

use crate::types::{MenuName, StateName, UserId};

/// The primary error type used across stores, transports, the dialog engine
/// and the notification scheduler.
#[derive(Debug, Error)]
pub enum ParleyError {
    /// Configuration errors (invalid TOML, missing handler, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// A dialog state with this name is already registered.
    #[error("dialog state `{0}` is already registered")]
    DuplicateState(StateName),

    /// A menu with this name is already registered.
    #[error("menu `{0}` is already registered")]
    DuplicateMenu(MenuName),

    /// A chain registration was attempted with no states.
    #[error("cannot register an empty state chain")]
    EmptyChain,

    /// A menu definition is malformed (bad name, duplicate button ids).
    #[error("invalid menu `{menu}`: {reason}")]
    InvalidMenu { menu: MenuName, reason: String },

    /// No dialog state is registered under this name.
    #[error("unknown dialog state `{0}`")]
    UnknownState(StateName),

    /// No menu is registered under this name.
    #[error("unknown menu `{0}`")]
    UnknownMenu(MenuName),

    /// The persisted state name of a user is not in the registry.
    #[error("user {user} is in state `{state}` which is not registered")]
    CorruptedState { user: UserId, state: StateName },

    /// An in-place menu edit was requested but no message is tracked.
    #[error("no tracked message for user {user} to refresh menu `{menu}`")]
    MissingTrackedMessage { user: UserId, menu: MenuName },

    /// A dynamic menu has no rows to display.
    #[error("no buttons available")]
    NoButtonsAvailable,

    /// Store I/O failure (state store, queue store, relational store).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Transport errors (send failure, edit rejected, bad identifiers).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ParleyError {
    /// Wraps any error as a storage failure.
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Storage {
            source: source.into(),
        }
    }

    /// Builds a transport error without an underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Registration errors abort startup; everything else is per-request.
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateState(_)
                | Self::DuplicateMenu(_)
                | Self::EmptyChain
                | Self::InvalidMenu { .. }
        )
    }
}
