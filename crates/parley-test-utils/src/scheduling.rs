// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted occurrence source and recording notification handler.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use parley_core::{NotificationHandler, OccurrenceSource, ParleyError, UserId};

/// Returns whatever timestamps the test configured, ignoring `now`.
#[derive(Default)]
pub struct FixedOccurrences {
    next: Mutex<HashMap<UserId, i64>>,
    bulk_calls: Mutex<Vec<Option<Vec<UserId>>>>,
}

impl FixedOccurrences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets (`Some`) or removes (`None`) the user's next occurrence.
    pub async fn set(&self, user: UserId, next: Option<i64>) {
        let mut map = self.next.lock().await;
        match next {
            Some(ts) => map.insert(user, ts),
            None => map.remove(&user),
        };
    }

    /// The `users` argument of every bulk call, in order.
    pub async fn bulk_calls(&self) -> Vec<Option<Vec<UserId>>> {
        self.bulk_calls.lock().await.clone()
    }
}

#[async_trait]
impl OccurrenceSource for FixedOccurrences {
    async fn next_occurrence(
        &self,
        user: UserId,
        _now: DateTime<Utc>,
    ) -> Result<Option<i64>, ParleyError> {
        Ok(self.next.lock().await.get(&user).copied())
    }

    async fn next_occurrences(
        &self,
        users: Option<&[UserId]>,
        _now: DateTime<Utc>,
    ) -> Result<Vec<(UserId, i64)>, ParleyError> {
        self.bulk_calls.lock().await.push(users.map(<[UserId]>::to_vec));
        let next = self.next.lock().await;
        let mut out: Vec<(UserId, i64)> = match users {
            Some(users) => users
                .iter()
                .filter_map(|u| next.get(u).map(|ts| (*u, *ts)))
                .collect(),
            None => next.iter().map(|(u, ts)| (*u, *ts)).collect(),
        };
        out.sort();
        Ok(out)
    }
}

/// Records every notified user. Users marked failing get an error instead.
#[derive(Default)]
pub struct RecordingNotifier {
    notified: Mutex<Vec<UserId>>,
    failing: Mutex<HashSet<UserId>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_for(&self, user: UserId, fail: bool) {
        let mut failing = self.failing.lock().await;
        if fail {
            failing.insert(user);
        } else {
            failing.remove(&user);
        }
    }

    /// Users successfully notified, in call order.
    pub async fn notified(&self) -> Vec<UserId> {
        self.notified.lock().await.clone()
    }
}

#[async_trait]
impl NotificationHandler for RecordingNotifier {
    async fn notify(&self, user: UserId) -> Result<(), ParleyError> {
        if self.failing.lock().await.contains(&user) {
            return Err(ParleyError::transport(format!("user {user} unreachable")));
        }
        self.notified.lock().await.push(user);
        Ok(())
    }
}
