// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tick processing, rebuild and rescheduling against in-memory and SQLite stores.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc, Weekday};
use parley_config::model::{SchedulerConfig, StorageConfig};
use parley_core::UserId;
use parley_scheduler::{NotificationScheduler, TickReport};
use parley_storage::{SqliteStorage, UserProfile};
use parley_test_utils::{FixedOccurrences, MemoryQueueStore, RecordingNotifier};

const KEY: &str = "delayed_notifications";

struct Harness {
    sched: NotificationScheduler,
    queue: Arc<MemoryQueueStore>,
    occurrences: Arc<FixedOccurrences>,
    notifier: Arc<RecordingNotifier>,
}

fn harness() -> Harness {
    let queue = Arc::new(MemoryQueueStore::new());
    let occurrences = Arc::new(FixedOccurrences::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let sched = NotificationScheduler::new(queue.clone(), occurrences.clone(), &SchedulerConfig::default())
        .with_handler(notifier.clone());
    Harness {
        sched,
        queue,
        occurrences,
        notifier,
    }
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

#[tokio::test]
async fn due_users_fire_and_are_rescheduled() {
    let h = harness();
    h.sched.add_user_at(UserId(1), 1_000).await.unwrap();
    h.sched.add_user_at(UserId(2), 9_000).await.unwrap();
    h.occurrences.set(UserId(1), Some(5_000)).await;

    let report = h.sched.process_due(at(2_000)).await.unwrap();
    assert_eq!(
        report,
        TickReport {
            fired: vec![UserId(1)],
            failed: vec![],
            rescheduled: 1,
        }
    );
    assert_eq!(h.notifier.notified().await, vec![UserId(1)]);
    assert_eq!(
        h.queue.snapshot(KEY).await,
        vec![(UserId(1), 5_000), (UserId(2), 9_000)]
    );
    assert_eq!(h.occurrences.bulk_calls().await, vec![Some(vec![UserId(1)])]);
}

#[tokio::test]
async fn nothing_due_is_a_quiet_tick() {
    let h = harness();
    h.sched.add_user_at(UserId(1), 10_000).await.unwrap();
    let report = h.sched.process_due(at(9_999)).await.unwrap();
    assert_eq!(report, TickReport::default());
    assert!(h.notifier.notified().await.is_empty());
    assert!(h.occurrences.bulk_calls().await.is_empty());
}

#[tokio::test]
async fn entry_due_exactly_now_fires() {
    let h = harness();
    h.sched.add_user_at(UserId(4), 3_000).await.unwrap();
    let report = h.sched.process_due(at(3_000)).await.unwrap();
    assert_eq!(report.fired, vec![UserId(4)]);
}

#[tokio::test]
async fn failed_handler_keeps_user_queued_for_retry() {
    let h = harness();
    h.sched.add_user_at(UserId(1), 1_000).await.unwrap();
    h.sched.add_user_at(UserId(2), 1_200).await.unwrap();
    h.occurrences.set(UserId(2), Some(8_000)).await;
    h.notifier.fail_for(UserId(1), true).await;

    let report = h.sched.process_due(at(2_000)).await.unwrap();
    assert_eq!(report.failed, vec![UserId(1)]);
    assert_eq!(report.fired, vec![UserId(2)]);
    assert_eq!(
        h.queue.snapshot(KEY).await,
        vec![(UserId(1), 1_000), (UserId(2), 8_000)]
    );

    h.notifier.fail_for(UserId(1), false).await;
    let report = h.sched.process_due(at(2_010)).await.unwrap();
    assert_eq!(report.fired, vec![UserId(1)]);
    assert!(report.failed.is_empty());
}

#[tokio::test]
async fn ineligible_user_drops_out_after_fire() {
    let h = harness();
    h.sched.add_user_at(UserId(3), 100).await.unwrap();
    assert_eq!(h.sched.queue_len().await.unwrap(), 1);
    let report = h.sched.process_due(at(200)).await.unwrap();
    assert_eq!(report.fired, vec![UserId(3)]);
    assert_eq!(report.rescheduled, 0);
    assert!(h.queue.snapshot(KEY).await.is_empty());
    assert_eq!(h.sched.queue_len().await.unwrap(), 0);
}

#[tokio::test]
async fn rebuild_replaces_stale_entries() {
    let h = harness();
    h.sched.add_user_at(UserId(9), 100).await.unwrap();
    h.occurrences.set(UserId(1), Some(500)).await;
    h.occurrences.set(UserId(2), Some(300)).await;

    let queued = h.sched.rebuild_queue(at(0)).await.unwrap();
    assert_eq!(queued, 2);
    assert_eq!(
        h.queue.snapshot(KEY).await,
        vec![(UserId(2), 300), (UserId(1), 500)]
    );
    assert_eq!(h.occurrences.bulk_calls().await, vec![None]);
}

#[tokio::test]
async fn add_user_never_moves_later_but_reschedule_does() {
    let h = harness();
    let user = UserId(5);
    h.occurrences.set(user, Some(1_000)).await;
    h.sched.add_user(user, at(0)).await.unwrap();

    h.occurrences.set(user, Some(2_000)).await;
    h.sched.add_user(user, at(0)).await.unwrap();
    assert_eq!(h.sched.scheduled_at(user).await.unwrap(), Some(1_000));

    h.sched.reschedule_user(user, at(0)).await.unwrap();
    assert_eq!(h.sched.scheduled_at(user).await.unwrap(), Some(2_000));

    // Disabled user: rescheduling removes the entry.
    h.occurrences.set(user, None).await;
    h.sched.reschedule_user(user, at(0)).await.unwrap();
    assert_eq!(h.sched.scheduled_at(user).await.unwrap(), None);
}

#[tokio::test]
async fn del_user_removes_entry() {
    let h = harness();
    h.sched.add_user_at(UserId(7), 50).await.unwrap();
    h.sched.del_user(UserId(7)).await.unwrap();
    h.sched.del_user(UserId(7)).await.unwrap();
    assert!(h.queue.snapshot(KEY).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn background_tick_fires_due_users() {
    let h = harness();
    h.sched.add_user_at(UserId(1), 1).await.unwrap();
    h.sched.start().await.unwrap();

    for _ in 0..5 {
        tokio::time::sleep(h.sched.tick_interval() + Duration::from_millis(10)).await;
        if !h.notifier.notified().await.is_empty() {
            break;
        }
    }
    h.sched.stop().await;
    assert_eq!(h.notifier.notified().await, vec![UserId(1)]);
}

#[tokio::test]
async fn sqlite_backed_queue_follows_week_schedule() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(SqliteStorage::new(StorageConfig {
        database_path: dir.path().join("parley.db").to_string_lossy().into_owned(),
        ..StorageConfig::default()
    }));
    storage.initialize().await.unwrap();

    let user = UserId(100);
    storage.save_user(&UserProfile::new(user, "Alice")).await.unwrap();
    assert!(storage.toggle_day(user, Weekday::Mon).await.unwrap());

    let notifier = Arc::new(RecordingNotifier::new());
    let sched = NotificationScheduler::new(storage.clone(), storage.clone(), &SchedulerConfig::default())
        .with_handler(notifier.clone());

    // 2026-03-04 is a Wednesday; Monday 10:00 UTC is five days out.
    let now = Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap();
    let monday = Utc.with_ymd_and_hms(2026, 3, 9, 10, 0, 0).unwrap();
    assert_eq!(sched.rebuild_queue(now).await.unwrap(), 1);
    assert_eq!(sched.scheduled_at(user).await.unwrap(), Some(monday.timestamp()));

    let report = sched.process_due(monday).await.unwrap();
    assert_eq!(report.fired, vec![user]);
    assert_eq!(report.rescheduled, 1);
    let next_monday = Utc.with_ymd_and_hms(2026, 3, 16, 10, 0, 0).unwrap();
    assert_eq!(sched.scheduled_at(user).await.unwrap(), Some(next_monday.timestamp()));

    // Global switch off: the user is not eligible any more.
    assert!(!storage.toggle_global(user).await.unwrap());
    sched.reschedule_user(user, now).await.unwrap();
    assert_eq!(sched.scheduled_at(user).await.unwrap(), None);
}
