// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring of storage, transport, dialog engine and scheduler.

use std::sync::Arc;

use parley_config::model::{CatalogConfig, ParleyConfig};
use parley_core::{ParleyError, Transport};
use parley_dialog::{DialogEngine, UserLocks};
use parley_scheduler::NotificationScheduler;
use parley_storage::SqliteStorage;
use parley_telegram::AccessList;

use crate::flows;
use crate::notifier::ReminderNotifier;
use crate::router::Router;

/// Handles captured by flow callbacks.
#[derive(Clone)]
pub struct Services {
    pub storage: Arc<SqliteStorage>,
    pub scheduler: Arc<NotificationScheduler>,
    pub catalog: CatalogConfig,
}

/// Builds the scheduler on top of SQLite with the reminder handler attached.
pub fn build_scheduler(
    config: &ParleyConfig,
    storage: Arc<SqliteStorage>,
    transport: Arc<dyn Transport>,
) -> NotificationScheduler {
    let notifier = ReminderNotifier::new(storage.clone(), transport);
    NotificationScheduler::new(storage.clone(), storage, &config.scheduler)
        .with_handler(Arc::new(notifier))
}

/// Builds the engine with every application flow registered.
pub fn build_engine(
    config: &ParleyConfig,
    services: &Services,
    transport: Arc<dyn Transport>,
) -> Result<DialogEngine, ParleyError> {
    let mut engine = DialogEngine::new(services.storage.clone(), transport)
        .with_apology(config.dialog.apology_text.clone());
    flows::register_all(&mut engine, services)?;
    Ok(engine)
}

/// Builds the full event router.
pub fn build_router(
    config: &ParleyConfig,
    services: Services,
    transport: Arc<dyn Transport>,
) -> Result<Router, ParleyError> {
    let engine = build_engine(config, &services, transport)?;
    let locks = config.dialog.serialize_per_user.then(UserLocks::new);
    Ok(Router::new(
        engine,
        services,
        AccessList::from_config(&config.telegram),
        locks,
    ))
}
