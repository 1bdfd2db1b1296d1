// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory state and queue stores.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use parley_core::{MenuName, MessageId, ParleyError, QueueStore, StateName, StateStore, UserId};

#[derive(Debug, Clone, Default)]
struct Record {
    state: Option<StateName>,
    vars: HashMap<String, String>,
    message_id: Option<MessageId>,
    return_menu: Option<MenuName>,
}

/// Dialog records kept in a map. Counts writes so tests can assert that a
/// code path touched nothing.
#[derive(Default)]
pub struct MemoryStateStore {
    records: Mutex<HashMap<UserId, Record>>,
    writes: AtomicUsize,
    fail: AtomicBool,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mutating calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Makes every following call fail with a storage error until reset.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), ParleyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ParleyError::storage("memory store unavailable"));
        }
        Ok(())
    }

    async fn write<R>(&self, user: UserId, f: impl FnOnce(&mut Record) -> R) -> Result<R, ParleyError> {
        self.check()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock().await;
        Ok(f(records.entry(user).or_default()))
    }

    async fn read<R>(&self, user: UserId, f: impl FnOnce(&Record) -> R) -> Result<Option<R>, ParleyError> {
        self.check()?;
        Ok(self.records.lock().await.get(&user).map(f))
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get_state(&self, user: UserId) -> Result<Option<StateName>, ParleyError> {
        Ok(self.read(user, |r| r.state.clone()).await?.flatten())
    }

    async fn set_state(&self, user: UserId, state: Option<&StateName>) -> Result<(), ParleyError> {
        let state = state.cloned();
        self.write(user, |r| r.state = state).await
    }

    async fn get_var(&self, user: UserId, key: &str) -> Result<Option<String>, ParleyError> {
        Ok(self.read(user, |r| r.vars.get(key).cloned()).await?.flatten())
    }

    async fn set_var(&self, user: UserId, key: &str, value: &str) -> Result<(), ParleyError> {
        self.write(user, |r| {
            r.vars.insert(key.to_string(), value.to_string());
        })
        .await
    }

    async fn get_all_vars(&self, user: UserId) -> Result<HashMap<String, String>, ParleyError> {
        Ok(self.read(user, |r| r.vars.clone()).await?.unwrap_or_default())
    }

    async fn clear_vars(&self, user: UserId) -> Result<(), ParleyError> {
        self.write(user, |r| r.vars.clear()).await
    }

    async fn get_tracked_message_id(
        &self,
        user: UserId,
    ) -> Result<Option<MessageId>, ParleyError> {
        Ok(self.read(user, |r| r.message_id.clone()).await?.flatten())
    }

    async fn set_tracked_message_id(
        &self,
        user: UserId,
        message: &MessageId,
    ) -> Result<(), ParleyError> {
        let message = message.clone();
        self.write(user, |r| r.message_id = Some(message)).await
    }

    async fn get_return_menu(&self, user: UserId) -> Result<Option<MenuName>, ParleyError> {
        Ok(self.read(user, |r| r.return_menu.clone()).await?.flatten())
    }

    async fn set_return_menu(
        &self,
        user: UserId,
        menu: Option<&MenuName>,
    ) -> Result<(), ParleyError> {
        let menu = menu.cloned();
        self.write(user, |r| r.return_menu = menu).await
    }
}

/// Keyed sorted sets kept in a map.
#[derive(Default)]
pub struct MemoryQueueStore {
    sets: Mutex<HashMap<String, HashMap<UserId, i64>>>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All `(member, score)` pairs of `key`, ascending by score then member.
    pub async fn snapshot(&self, key: &str) -> Vec<(UserId, i64)> {
        let sets = self.sets.lock().await;
        let mut entries: Vec<(UserId, i64)> = sets
            .get(key)
            .map(|set| set.iter().map(|(u, s)| (*u, *s)).collect())
            .unwrap_or_default();
        entries.sort_by_key(|(u, s)| (*s, *u));
        entries
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn zadd(&self, key: &str, member: UserId, score: i64) -> Result<(), ParleyError> {
        self.sets
            .lock()
            .await
            .entry(key.to_string())
            .or_default()
            .insert(member, score);
        Ok(())
    }

    async fn zscore(&self, key: &str, member: UserId) -> Result<Option<i64>, ParleyError> {
        Ok(self
            .sets
            .lock()
            .await
            .get(key)
            .and_then(|set| set.get(&member).copied()))
    }

    async fn zrem(&self, key: &str, member: UserId) -> Result<(), ParleyError> {
        if let Some(set) = self.sets.lock().await.get_mut(key) {
            set.remove(&member);
        }
        Ok(())
    }

    async fn zrange_by_score(
        &self,
        key: &str,
        min: i64,
        max: i64,
    ) -> Result<Vec<UserId>, ParleyError> {
        Ok(self
            .snapshot(key)
            .await
            .into_iter()
            .filter(|(_, score)| (min..=max).contains(score))
            .map(|(user, _)| user)
            .collect())
    }

    async fn zcard(&self, key: &str) -> Result<u64, ParleyError> {
        Ok(self.sets.lock().await.get(key).map_or(0, |set| set.len() as u64))
    }

    async fn del(&self, key: &str) -> Result<(), ParleyError> {
        self.sets.lock().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_do_not_count_as_writes() {
        let store = MemoryStateStore::new();
        assert_eq!(store.get_state(UserId(1)).await.unwrap(), None);
        assert!(store.get_all_vars(UserId(1)).await.unwrap().is_empty());
        assert_eq!(store.write_count(), 0);

        store.set_var(UserId(1), "k", "v").await.unwrap();
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.get_var(UserId(1), "k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn failing_store_errors() {
        let store = MemoryStateStore::new();
        store.set_failing(true);
        assert!(store.get_state(UserId(1)).await.is_err());
    }

    #[tokio::test]
    async fn range_is_inclusive() {
        let queue = MemoryQueueStore::new();
        queue.zadd("q", UserId(1), 5).await.unwrap();
        queue.zadd("q", UserId(2), 10).await.unwrap();
        queue.zadd("q", UserId(3), 11).await.unwrap();
        assert_eq!(
            queue.zrange_by_score("q", 1, 10).await.unwrap(),
            vec![UserId(1), UserId(2)]
        );
    }
}
