// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Parley bot framework.
//!
//! This crate provides the error type, identifier newtypes, the outgoing
//! content and inbound event model, weekly schedule math, and the trait
//! seams (state store, queue store, occurrence source, transport) that the
//! dialog engine and scheduler are built against.

pub mod error;
pub mod recording;
pub mod schedule;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ParleyError;
pub use types::{
    Content, EditOutcome, HealthStatus, InboundEvent, InboundKind, InlineButton, Invoice, Keyboard,
    Media, MediaKind, MenuName, MessageId, ParseMode, StateName, UserId,
};

pub use traits::{
    Adapter, ChannelAdapter, NotificationHandler, OccurrenceSource, QueueStore, StateStore,
    Transport,
};
