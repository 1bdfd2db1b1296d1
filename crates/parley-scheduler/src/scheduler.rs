// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The notification queue and its tick loop.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use parley_config::model::SchedulerConfig;
use parley_core::recording;
use parley_core::{NotificationHandler, OccurrenceSource, ParleyError, QueueStore, UserId};

/// Outcome of one pass over the due users.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Users whose handler succeeded and who left the queue.
    pub fired: Vec<UserId>,
    /// Users whose handler failed. They stay queued for the next tick.
    pub failed: Vec<UserId>,
    /// Fired users queued again for their next occurrence.
    pub rescheduled: usize,
}

/// Shared handles used by both the public API and the tick task.
#[derive(Clone)]
struct Queue {
    store: Arc<dyn QueueStore>,
    occurrences: Arc<dyn OccurrenceSource>,
    handler: Option<Arc<dyn NotificationHandler>>,
    key: String,
}

struct Running {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Sorted-set backed notification queue plus the background tick task.
pub struct NotificationScheduler {
    queue: Queue,
    tick: Duration,
    running: Mutex<Option<Running>>,
}

impl NotificationScheduler {
    pub fn new(
        store: Arc<dyn QueueStore>,
        occurrences: Arc<dyn OccurrenceSource>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            queue: Queue {
                store,
                occurrences,
                handler: None,
                key: config.queue_key.clone(),
            },
            tick: Duration::from_secs(config.tick_secs.max(1)),
            running: Mutex::new(None),
        }
    }

    /// Sets the per-user callback invoked for every due user.
    pub fn with_handler(mut self, handler: Arc<dyn NotificationHandler>) -> Self {
        self.queue.handler = Some(handler);
        self
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick
    }

    pub fn queue_key(&self) -> &str {
        &self.queue.key
    }

    /// Spawns the tick task. A second call while running does nothing.
    pub async fn start(&self) -> Result<(), ParleyError> {
        if self.queue.handler.is_none() {
            return Err(ParleyError::Config(
                "notification handler is not set".to_string(),
            ));
        }
        let mut running = self.running.lock().await;
        if running.is_some() {
            debug!("notification scheduler already running");
            return Ok(());
        }

        let cancel = CancellationToken::new();
        let queue = self.queue.clone();
        let tick = self.tick;
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            // Skip the first immediate tick.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match queue.process_due(Utc::now()).await {
                            Ok(report) if !report.fired.is_empty() || !report.failed.is_empty() => {
                                info!(
                                    fired = report.fired.len(),
                                    failed = report.failed.len(),
                                    rescheduled = report.rescheduled,
                                    "notification tick processed"
                                );
                            }
                            Ok(_) => {}
                            Err(e) => {
                                error!(error = %e, "notification tick aborted, retrying next tick");
                            }
                        }
                    }
                    _ = token.cancelled() => {
                        info!("notification scheduler shutting down");
                        break;
                    }
                }
            }
        });

        info!(tick_secs = tick.as_secs(), queue = %self.queue.key, "notification scheduler started");
        *running = Some(Running { cancel, task });
        Ok(())
    }

    /// Cancels the tick task and waits for it to finish.
    pub async fn stop(&self) {
        let Some(Running { cancel, task }) = self.running.lock().await.take() else {
            return;
        };
        cancel.cancel();
        if let Err(e) = task.await {
            warn!(error = %e, "notification tick task ended abnormally");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Clears the queue and re-inserts every eligible user.
    pub async fn rebuild_queue(&self, now: DateTime<Utc>) -> Result<usize, ParleyError> {
        self.queue.rebuild(now).await
    }

    /// Queues the user's next occurrence. Ineligible users are left untouched.
    pub async fn add_user(&self, user: UserId, now: DateTime<Utc>) -> Result<(), ParleyError> {
        match self.queue.occurrences.next_occurrence(user, now).await? {
            Some(ts) => {
                self.queue.add_at(user, ts).await?;
            }
            None => debug!(user_id = %user, "user has no upcoming notification"),
        }
        Ok(())
    }

    /// Queues `user` at `timestamp` unless an earlier or equal entry exists.
    ///
    /// Returns whether the queue was written. Non-positive timestamps are ignored.
    pub async fn add_user_at(&self, user: UserId, timestamp: i64) -> Result<bool, ParleyError> {
        self.queue.add_at(user, timestamp).await
    }

    pub async fn del_user(&self, user: UserId) -> Result<(), ParleyError> {
        self.queue.store.zrem(&self.queue.key, user).await
    }

    /// Drops the current entry and queues the freshly computed one.
    ///
    /// Settings changes use this so a later slot can replace an earlier one.
    pub async fn reschedule_user(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<(), ParleyError> {
        self.del_user(user).await?;
        self.add_user(user, now).await
    }

    /// Queued fire timestamp of one user.
    pub async fn scheduled_at(&self, user: UserId) -> Result<Option<i64>, ParleyError> {
        self.queue.store.zscore(&self.queue.key, user).await
    }

    /// Number of users currently queued.
    pub async fn queue_len(&self) -> Result<u64, ParleyError> {
        self.queue.store.zcard(&self.queue.key).await
    }

    /// Runs one tick against `now`. Used by the background task and by tests.
    pub async fn process_due(&self, now: DateTime<Utc>) -> Result<TickReport, ParleyError> {
        self.queue.process_due(now).await
    }
}

impl Queue {
    async fn add_at(&self, user: UserId, timestamp: i64) -> Result<bool, ParleyError> {
        if timestamp <= 0 {
            return Ok(false);
        }
        if let Some(current) = self.store.zscore(&self.key, user).await? {
            if current > 0 && current <= timestamp {
                debug!(user_id = %user, current, timestamp, "earlier notification kept");
                return Ok(false);
            }
        }
        self.store.zadd(&self.key, user, timestamp).await?;
        debug!(user_id = %user, timestamp, "notification queued");
        Ok(true)
    }

    async fn rebuild(&self, now: DateTime<Utc>) -> Result<usize, ParleyError> {
        self.store.del(&self.key).await?;
        let upcoming = self.occurrences.next_occurrences(None, now).await?;
        let mut queued = 0;
        for (user, ts) in upcoming {
            match self.add_at(user, ts).await {
                Ok(true) => queued += 1,
                Ok(false) => {}
                Err(e) => warn!(user_id = %user, error = %e, "user not queued during rebuild"),
            }
        }
        recording::set_queue_size(queued);
        info!(queued, queue = %self.key, "notification queue rebuilt");
        Ok(queued)
    }

    async fn process_due(&self, now: DateTime<Utc>) -> Result<TickReport, ParleyError> {
        let report = self.fire_due(now).await?;
        match self.store.zcard(&self.key).await {
            Ok(size) => recording::set_queue_size(size as usize),
            Err(e) => debug!(error = %e, "queue size unavailable"),
        }
        Ok(report)
    }

    async fn fire_due(&self, now: DateTime<Utc>) -> Result<TickReport, ParleyError> {
        let handler = self
            .handler
            .as_ref()
            .ok_or_else(|| ParleyError::Config("notification handler is not set".to_string()))?;

        let due = self
            .store
            .zrange_by_score(&self.key, 1, now.timestamp())
            .await?;
        let mut report = TickReport::default();
        if due.is_empty() {
            return Ok(report);
        }

        for user in due {
            if let Err(e) = handler.notify(user).await {
                warn!(user_id = %user, error = %e, "notification handler failed");
                report.failed.push(user);
                continue;
            }
            if let Err(e) = self.store.zrem(&self.key, user).await {
                warn!(user_id = %user, error = %e, "fired user not removed from queue");
                continue;
            }
            report.fired.push(user);
        }
        recording::record_notifications(report.fired.len(), report.failed.len());

        if report.fired.is_empty() {
            return Ok(report);
        }

        // Refresh after fire so nobody falls out of the queue.
        let upcoming = match self.occurrences.next_occurrences(Some(&report.fired), now).await {
            Ok(upcoming) => upcoming,
            Err(e) => {
                error!(error = %e, "next occurrences unavailable, fired users not rescheduled");
                return Ok(report);
            }
        };
        for user in &report.fired {
            let Some((_, ts)) = upcoming.iter().find(|(u, _)| u == user) else {
                debug!(user_id = %user, "no next occurrence after fire");
                continue;
            };
            match self.add_at(*user, *ts).await {
                Ok(true) => report.rescheduled += 1,
                Ok(false) => {}
                Err(e) => warn!(user_id = %user, error = %e, "fired user not rescheduled"),
            }
        }
        Ok(report)
    }
}

impl fmt::Debug for NotificationScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationScheduler")
            .field("queue_key", &self.queue.key)
            .field("tick", &self.tick)
            .field("has_handler", &self.queue.handler.is_some())
            .finish_non_exhaustive()
    }
}
