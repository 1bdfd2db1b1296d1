// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delayed per-user notifications for Parley.
//!
//! Users wait in a score-ordered queue keyed by their next fire timestamp.
//! A background tick hands every due user to a [`NotificationHandler`] and
//! then reschedules them from the authoritative [`OccurrenceSource`].
//!
//! [`NotificationHandler`]: parley_core::NotificationHandler
//! [`OccurrenceSource`]: parley_core::OccurrenceSource

pub mod scheduler;

pub use scheduler::{NotificationScheduler, TickReport};
