// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each function takes a [`Database`](crate::Database)
//! and runs on its single background connection.

pub mod catalog;
pub mod cheer_ups;
pub mod dialog_states;
pub mod lesson_requests;
pub mod notifications;
pub mod sorted_sets;
pub mod users;
