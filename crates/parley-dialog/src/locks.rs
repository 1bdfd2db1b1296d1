// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user async mutexes for serializing one user's events.

use std::sync::Arc;

use dashmap::DashMap;
use parley_core::UserId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Hands out one mutex per user. Clones share the same table.
#[derive(Clone, Default)]
pub struct UserLocks {
    inner: Arc<DashMap<UserId, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other event of `user` is being handled.
    pub async fn lock(&self, user: UserId) -> OwnedMutexGuard<()> {
        let mutex = self.inner.entry(user).or_default().clone();
        mutex.lock_owned().await
    }

    /// Drops entries nobody holds or waits on.
    pub fn prune(&self) {
        self.inner.retain(|_, m| Arc::strong_count(m) > 1);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_user_is_serialized() {
        let locks = UserLocks::new();
        let guard = locks.lock(UserId(1)).await;

        let other = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = other.lock(UserId(1)).await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn different_users_do_not_block() {
        let locks = UserLocks::new();
        let _a = locks.lock(UserId(1)).await;
        let _b = tokio::time::timeout(Duration::from_millis(100), locks.lock(UserId(2)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn prune_keeps_held_locks() {
        let locks = UserLocks::new();
        let held = locks.lock(UserId(1)).await;
        drop(locks.lock(UserId(2)).await);
        locks.prune();
        assert_eq!(locks.len(), 1);
        drop(held);
        locks.prune();
        assert!(locks.is_empty());
    }
}
