// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the store traits.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use tokio::sync::OnceCell;
use tracing::debug;

use parley_config::model::StorageConfig;
use parley_core::{
    Adapter, HealthStatus, MenuName, MessageId, OccurrenceSource, ParleyError, QueueStore,
    StateStore, StateName, UserId,
};

use crate::database::Database;
use crate::models::{
    CheerUp, Exercise, LessonRequest, Pack, PackOffer, Purchase, RecordedPart, UserProfile,
};
use crate::queries;

/// SQLite-backed store.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules. The
/// database is opened by [`SqliteStorage::initialize`]; every other call fails
/// with a storage error until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// The database is not opened until [`initialize`](Self::initialize) is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    pub async fn initialize(&self) -> Result<(), ParleyError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db
            .set(db)
            .map_err(|_| ParleyError::storage("storage already initialized"))?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    fn db(&self) -> Result<&Database, ParleyError> {
        self.db
            .get()
            .ok_or_else(|| ParleyError::storage("storage not initialized -- call initialize() first"))
    }

    async fn checkpoint(&self) -> Result<(), ParleyError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(crate::database::map_tr_err)?;
            debug!("WAL checkpoint complete");
        }
        Ok(())
    }

    // --- Dialog records ---

    /// Users currently inside a dialog.
    pub async fn active_dialogs(&self) -> Result<Vec<(UserId, StateName)>, ParleyError> {
        queries::dialog_states::list_active_users(self.db()?).await
    }

    // --- Users ---

    /// Saves the profile and makes sure notification settings exist.
    pub async fn save_user(&self, profile: &UserProfile) -> Result<(), ParleyError> {
        let db = self.db()?;
        queries::users::upsert_user(db, profile).await?;
        queries::notifications::seed_defaults(db, profile.user_id).await
    }

    pub async fn get_user(&self, user: UserId) -> Result<Option<UserProfile>, ParleyError> {
        queries::users::get_user(self.db()?, user).await
    }

    pub async fn list_user_ids(&self) -> Result<Vec<UserId>, ParleyError> {
        queries::users::list_user_ids(self.db()?).await
    }

    pub async fn delete_user(&self, user: UserId) -> Result<bool, ParleyError> {
        queries::users::delete_user(self.db()?, user).await
    }

    // --- Notification settings ---

    pub async fn schedule(
        &self,
        user: UserId,
    ) -> Result<Option<parley_core::schedule::WeekSchedule>, ParleyError> {
        queries::notifications::load_schedule(self.db()?, user).await
    }

    pub async fn toggle_day(&self, user: UserId, day: Weekday) -> Result<bool, ParleyError> {
        queries::notifications::toggle_day(self.db()?, user, day).await
    }

    pub async fn set_day_time(
        &self,
        user: UserId,
        day: Weekday,
        time: NaiveTime,
    ) -> Result<(), ParleyError> {
        queries::notifications::set_day_time(self.db()?, user, day, time).await
    }

    pub async fn toggle_global(&self, user: UserId) -> Result<bool, ParleyError> {
        queries::notifications::toggle_global(self.db()?, user).await
    }

    // --- Cheer-ups ---

    pub async fn add_cheer_up(&self, body: &str) -> Result<i64, ParleyError> {
        queries::cheer_ups::add_cheer_up(self.db()?, body).await
    }

    pub async fn list_cheer_ups(&self) -> Result<Vec<CheerUp>, ParleyError> {
        queries::cheer_ups::list_cheer_ups(self.db()?).await
    }

    pub async fn delete_cheer_up(&self, id: i64) -> Result<bool, ParleyError> {
        queries::cheer_ups::delete_cheer_up(self.db()?, id).await
    }

    pub async fn random_cheer_up(&self) -> Result<Option<String>, ParleyError> {
        queries::cheer_ups::random_cheer_up(self.db()?).await
    }

    // --- Catalog ---

    pub async fn add_pack(&self, name: &str, price: u32) -> Result<i64, ParleyError> {
        queries::catalog::add_pack(self.db()?, name, price).await
    }

    pub async fn list_packs(&self) -> Result<Vec<Pack>, ParleyError> {
        queries::catalog::list_packs(self.db()?).await
    }

    pub async fn get_pack(&self, id: i64) -> Result<Option<Pack>, ParleyError> {
        queries::catalog::get_pack(self.db()?, id).await
    }

    pub async fn rename_pack(&self, id: i64, name: &str) -> Result<bool, ParleyError> {
        queries::catalog::rename_pack(self.db()?, id, name).await
    }

    pub async fn set_pack_price(&self, id: i64, price: u32) -> Result<bool, ParleyError> {
        queries::catalog::set_pack_price(self.db()?, id, price).await
    }

    pub async fn delete_pack(&self, id: i64) -> Result<bool, ParleyError> {
        queries::catalog::delete_pack(self.db()?, id).await
    }

    /// Non-empty packs as `user` sees them.
    pub async fn pack_offers(&self, user: UserId) -> Result<Vec<PackOffer>, ParleyError> {
        queries::catalog::offers_for(self.db()?, user).await
    }

    pub async fn pack_offer(&self, user: UserId, pack: i64) -> Result<Option<PackOffer>, ParleyError> {
        queries::catalog::offer(self.db()?, user, pack).await
    }

    pub async fn record_purchase(&self, purchase: &Purchase) -> Result<bool, ParleyError> {
        queries::catalog::record_purchase(self.db()?, purchase).await
    }

    pub async fn add_exercise(
        &self,
        pack: i64,
        name: &str,
        parts: Vec<RecordedPart>,
    ) -> Result<i64, ParleyError> {
        queries::catalog::add_exercise(self.db()?, pack, name, parts).await
    }

    pub async fn list_exercises(&self, pack: i64) -> Result<Vec<Exercise>, ParleyError> {
        queries::catalog::list_exercises(self.db()?, pack).await
    }

    pub async fn get_exercise(&self, id: i64) -> Result<Option<Exercise>, ParleyError> {
        queries::catalog::get_exercise(self.db()?, id).await
    }

    pub async fn delete_exercise(&self, id: i64) -> Result<bool, ParleyError> {
        queries::catalog::delete_exercise(self.db()?, id).await
    }

    pub async fn exercise_parts(&self, id: i64) -> Result<Vec<RecordedPart>, ParleyError> {
        queries::catalog::exercise_parts(self.db()?, id).await
    }

    // --- Lesson requests ---

    pub async fn add_lesson_request(
        &self,
        user: UserId,
        username: Option<&str>,
        phone: Option<&str>,
    ) -> Result<bool, ParleyError> {
        queries::lesson_requests::add_request(self.db()?, user, username, phone).await
    }

    pub async fn lesson_request(&self, user: UserId) -> Result<Option<LessonRequest>, ParleyError> {
        queries::lesson_requests::get_request(self.db()?, user).await
    }

    pub async fn open_lesson_requests(&self) -> Result<Vec<LessonRequest>, ParleyError> {
        queries::lesson_requests::open_requests(self.db()?).await
    }

    pub async fn resolve_lesson_request(&self, user: UserId) -> Result<bool, ParleyError> {
        queries::lesson_requests::resolve_request(self.db()?, user).await
    }
}

#[async_trait]
impl Adapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        let Ok(db) = self.db() else {
            return Ok(HealthStatus::Unhealthy("storage not initialized".into()));
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        self.checkpoint().await
    }
}

#[async_trait]
impl StateStore for SqliteStorage {
    async fn get_state(&self, user: UserId) -> Result<Option<StateName>, ParleyError> {
        queries::dialog_states::get_state(self.db()?, user).await
    }

    async fn set_state(&self, user: UserId, state: Option<&StateName>) -> Result<(), ParleyError> {
        queries::dialog_states::set_state(self.db()?, user, state).await
    }

    async fn get_var(&self, user: UserId, key: &str) -> Result<Option<String>, ParleyError> {
        queries::dialog_states::get_var(self.db()?, user, key).await
    }

    async fn set_var(&self, user: UserId, key: &str, value: &str) -> Result<(), ParleyError> {
        queries::dialog_states::set_var(self.db()?, user, key, value).await
    }

    async fn get_all_vars(&self, user: UserId) -> Result<HashMap<String, String>, ParleyError> {
        queries::dialog_states::get_all_vars(self.db()?, user).await
    }

    async fn clear_vars(&self, user: UserId) -> Result<(), ParleyError> {
        queries::dialog_states::clear_vars(self.db()?, user).await
    }

    async fn get_tracked_message_id(
        &self,
        user: UserId,
    ) -> Result<Option<MessageId>, ParleyError> {
        queries::dialog_states::get_tracked_message_id(self.db()?, user).await
    }

    async fn set_tracked_message_id(
        &self,
        user: UserId,
        message: &MessageId,
    ) -> Result<(), ParleyError> {
        queries::dialog_states::set_tracked_message_id(self.db()?, user, message).await
    }

    async fn get_return_menu(&self, user: UserId) -> Result<Option<MenuName>, ParleyError> {
        queries::dialog_states::get_return_menu(self.db()?, user).await
    }

    async fn set_return_menu(
        &self,
        user: UserId,
        menu: Option<&MenuName>,
    ) -> Result<(), ParleyError> {
        queries::dialog_states::set_return_menu(self.db()?, user, menu).await
    }
}

#[async_trait]
impl QueueStore for SqliteStorage {
    async fn zadd(&self, key: &str, member: UserId, score: i64) -> Result<(), ParleyError> {
        queries::sorted_sets::zadd(self.db()?, key, member, score).await
    }

    async fn zscore(&self, key: &str, member: UserId) -> Result<Option<i64>, ParleyError> {
        queries::sorted_sets::zscore(self.db()?, key, member).await
    }

    async fn zrem(&self, key: &str, member: UserId) -> Result<(), ParleyError> {
        queries::sorted_sets::zrem(self.db()?, key, member).await
    }

    async fn zrange_by_score(
        &self,
        key: &str,
        min: i64,
        max: i64,
    ) -> Result<Vec<UserId>, ParleyError> {
        queries::sorted_sets::zrange_by_score(self.db()?, key, min, max).await
    }

    async fn zcard(&self, key: &str) -> Result<u64, ParleyError> {
        queries::sorted_sets::zcard(self.db()?, key).await
    }

    async fn del(&self, key: &str) -> Result<(), ParleyError> {
        queries::sorted_sets::del(self.db()?, key).await
    }
}

/// Occurrences are computed from the stored weekly settings.
#[async_trait]
impl OccurrenceSource for SqliteStorage {
    async fn next_occurrence(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>, ParleyError> {
        let schedule = queries::notifications::load_schedule(self.db()?, user).await?;
        Ok(schedule
            .and_then(|s| s.next_occurrence(now))
            .map(|t| t.timestamp()))
    }

    async fn next_occurrences(
        &self,
        users: Option<&[UserId]>,
        now: DateTime<Utc>,
    ) -> Result<Vec<(UserId, i64)>, ParleyError> {
        let schedules = queries::notifications::load_schedules(self.db()?, users).await?;
        Ok(schedules
            .into_iter()
            .filter_map(|(user, s)| s.next_occurrence(now).map(|t| (user, t.timestamp())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    async fn setup() -> (SqliteStorage, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("parley.db").to_string_lossy().into_owned(),
            ..StorageConfig::default()
        };
        let storage = SqliteStorage::new(config);
        storage.initialize().await.unwrap();
        (storage, dir)
    }

    #[tokio::test]
    async fn calls_before_initialize_fail() {
        let storage = SqliteStorage::new(StorageConfig::default());
        assert!(storage.get_state(UserId(1)).await.is_err());
        assert!(matches!(
            storage.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
    }

    #[tokio::test]
    async fn double_initialize_fails() {
        let (storage, _dir) = setup().await;
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn health_and_shutdown() {
        let (storage, _dir) = setup().await;
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
        storage.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn occurrences_follow_stored_settings() {
        let (storage, _dir) = setup().await;
        let mut profile = UserProfile::new(UserId(5), "Eve");
        profile.utc_offset_minutes = 0;
        storage.save_user(&profile).await.unwrap();
        storage.save_user(&UserProfile::new(UserId(6), "Mallory")).await.unwrap();

        let now = Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap();
        assert_eq!(storage.next_occurrence(UserId(5), now).await.unwrap(), None);

        storage.toggle_day(UserId(5), Weekday::Wed).await.unwrap();
        storage
            .set_day_time(UserId(5), Weekday::Wed, NaiveTime::from_hms_opt(18, 0, 0).unwrap())
            .await
            .unwrap();

        let expected = Utc.with_ymd_and_hms(2026, 3, 4, 18, 0, 0).unwrap().timestamp();
        assert_eq!(
            storage.next_occurrence(UserId(5), now).await.unwrap(),
            Some(expected)
        );
        assert_eq!(
            storage.next_occurrences(None, now).await.unwrap(),
            vec![(UserId(5), expected)]
        );

        storage.toggle_global(UserId(5)).await.unwrap();
        assert!(storage.next_occurrences(None, now).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn queue_store_round_trip() {
        let (storage, _dir) = setup().await;
        storage.zadd("q", UserId(1), 10).await.unwrap();
        storage.zadd("q", UserId(2), 5).await.unwrap();
        assert_eq!(
            storage.zrange_by_score("q", 1, 10).await.unwrap(),
            vec![UserId(2), UserId(1)]
        );
        assert_eq!(storage.zcard("q").await.unwrap(), 2);
        storage.del("q").await.unwrap();
        assert_eq!(storage.zcard("q").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn active_dialogs_lists_users_mid_dialog() {
        let (storage, _dir) = setup().await;
        storage
            .set_state(UserId(3), Some(&StateName::new("Ask-Age")))
            .await
            .unwrap();
        storage.set_var(UserId(4), "k", "v").await.unwrap();
        assert_eq!(
            storage.active_dialogs().await.unwrap(),
            vec![(UserId(3), StateName::new("Ask-Age"))]
        );
    }
}
