// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authoritative "next notification instant" lookups.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ParleyError;
use crate::types::UserId;

/// Read-only view of the relational store's notification settings.
#[async_trait]
pub trait OccurrenceSource: Send + Sync + 'static {
    /// Next fire timestamp (UNIX seconds) for one user, `None` when not eligible.
    async fn next_occurrence(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>, ParleyError>;

    /// Bulk variant over all eligible users, or only over `users` when given.
    /// Ineligible users are omitted.
    async fn next_occurrences(
        &self,
        users: Option<&[UserId]>,
        now: DateTime<Utc>,
    ) -> Result<Vec<(UserId, i64)>, ParleyError>;
}
