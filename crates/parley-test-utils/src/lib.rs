// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Parley.
//!
//! Provides in-memory doubles for every trait seam so dialog, menu and
//! scheduler behavior can be tested without SQLite or Telegram.
//!
//! # Components
//!
//! - [`MockChannel`] - Transport that records sends, edits and click answers
//! - [`MemoryStateStore`] - Dialog records in a hash map
//! - [`MemoryQueueStore`] - Keyed sorted sets in a hash map
//! - [`FixedOccurrences`] - Occurrence source with scripted timestamps
//! - [`RecordingNotifier`] - Notification handler that records or fails users

pub mod memory;
pub mod mock_channel;
pub mod scheduling;

pub use memory::{MemoryQueueStore, MemoryStateStore};
pub use mock_channel::{EditRecord, MockChannel, SentMessage};
pub use scheduling::{FixedOccurrences, RecordingNotifier};
