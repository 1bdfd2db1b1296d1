// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sorted-set store backing the notification queue.

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::types::UserId;

/// Sorted set of users scored by UNIX timestamp, grouped under a key.
///
/// A member appears at most once per key; `zadd` on an existing member
/// overwrites its score.
#[async_trait]
pub trait QueueStore: Send + Sync + 'static {
    async fn zadd(&self, key: &str, member: UserId, score: i64) -> Result<(), ParleyError>;

    async fn zscore(&self, key: &str, member: UserId) -> Result<Option<i64>, ParleyError>;

    async fn zrem(&self, key: &str, member: UserId) -> Result<(), ParleyError>;

    /// Members with `min <= score <= max`, ascending by score.
    async fn zrange_by_score(
        &self,
        key: &str,
        min: i64,
        max: i64,
    ) -> Result<Vec<UserId>, ParleyError>;

    /// Number of members under `key`.
    async fn zcard(&self, key: &str) -> Result<u64, ParleyError>;

    /// Removes the whole set.
    async fn del(&self, key: &str) -> Result<(), ParleyError>;
}
