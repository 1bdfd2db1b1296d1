// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley serve` and `parley rebuild-queue` implementations.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use parley_config::model::ParleyConfig;
use parley_core::{Adapter, ChannelAdapter, ParleyError, Transport};
use parley_scheduler::NotificationScheduler;
use parley_storage::SqliteStorage;
use parley_telegram::TelegramChannel;

use crate::app::{self, Services};
use crate::shutdown;

/// Runs the bot until SIGINT/SIGTERM.
pub async fn run_serve(config: ParleyConfig) -> Result<(), ParleyError> {
    init_tracing(&config.bot.log_level);
    parley_core::recording::register_metrics();

    info!(bot = %config.bot.name, "starting parley serve");

    let storage = open_storage(&config).await?;

    let mut telegram = TelegramChannel::new(&config.telegram).map_err(|e| {
        error!(error = %e, "failed to initialize Telegram channel");
        eprintln!("error: Telegram bot token required. Set telegram.bot_token or PARLEY_TELEGRAM_BOT_TOKEN.");
        e
    })?;
    telegram.connect().await?;
    let channel = Arc::new(telegram);
    let transport: Arc<dyn Transport> = channel.clone();

    let scheduler = Arc::new(app::build_scheduler(&config, storage.clone(), transport.clone()));
    let services = Services {
        storage: storage.clone(),
        scheduler: scheduler.clone(),
        catalog: config.catalog.clone(),
    };
    let router = Arc::new(app::build_router(&config, services, transport)?);

    let queued = scheduler.rebuild_queue(Utc::now()).await?;
    let resumed = storage.active_dialogs().await?.len();
    info!(queued, resumed, "notification queue ready");
    if config.scheduler.enabled {
        scheduler.start().await?;
    } else {
        info!("notification scheduler disabled by configuration");
    }

    let cancel = shutdown::install_signal_handler();
    info!("parley is running");

    loop {
        tokio::select! {
            event = channel.receive() => {
                match event {
                    Ok(event) => {
                        let router = router.clone();
                        tokio::spawn(async move {
                            let user = event.user_id;
                            if let Err(e) = router.handle(event).await {
                                error!(user_id = %user, error = %e, "failed to handle inbound event");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "channel receive error");
                        if e.to_string().contains("closed") {
                            break;
                        }
                    }
                }
            }
            _ = cancel.cancelled() => {
                info!("shutdown signal received, stopping");
                break;
            }
        }
    }

    scheduler.stop().await;
    match scheduler.queue_len().await {
        Ok(queued) => info!(queued, "users left in the notification queue"),
        Err(e) => warn!(error = %e, "queue size unavailable at shutdown"),
    }
    if let Err(e) = channel.shutdown().await {
        warn!(error = %e, "telegram shutdown failed");
    }
    storage.shutdown().await?;
    info!("parley stopped");
    Ok(())
}

/// Recomputes the notification queue from stored settings and exits.
pub async fn run_rebuild_queue(config: ParleyConfig) -> Result<(), ParleyError> {
    init_tracing(&config.bot.log_level);
    let storage = open_storage(&config).await?;
    let scheduler = NotificationScheduler::new(storage.clone(), storage.clone(), &config.scheduler);
    let queued = scheduler.rebuild_queue(Utc::now()).await?;
    storage.shutdown().await?;
    println!("queue `{}` rebuilt: {queued} users scheduled", config.scheduler.queue_key);
    Ok(())
}

async fn open_storage(config: &ParleyConfig) -> Result<Arc<SqliteStorage>, ParleyError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    info!(path = %config.storage.database_path, "storage initialized");
    Ok(Arc::new(storage))
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parley={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
