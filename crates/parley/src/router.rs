// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound event routing: clicks, slash commands, dialog input.

use std::str::FromStr;

use chrono::Utc;
use strum::{Display, EnumString};
use tracing::{debug, info, warn};

use parley_core::{Content, InboundEvent, InboundKind, Keyboard, ParleyError, UserId};
use parley_dialog::{DialogEngine, UpdateOutcome, UserLocks};
use parley_telegram::AccessList;

use crate::app::Services;
use crate::flows::{
    self, admin, catalog, catalog_admin, lessons, main_keyboard, notifications, settings, survey,
};

pub const REGISTER_FIRST: &str = "Please register first with /start.";
pub const ADMIN_ONLY: &str = "This command is for administrators.";
pub const UNKNOWN_COMMAND: &str = "Unknown command. Try /help.";

/// Slash commands understood by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Command {
    Start,
    Settings,
    Notifications,
    Cancel,
    Help,
    Exercises,
    Lesson,
    Broadcast,
    CheerUps,
    AddCheerUp,
    Packs,
    AddPack,
    AddExercise,
    Requests,
    Rebuild,
}

impl Command {
    pub fn is_admin_only(self) -> bool {
        matches!(
            self,
            Self::Broadcast
                | Self::CheerUps
                | Self::AddCheerUp
                | Self::Packs
                | Self::AddPack
                | Self::AddExercise
                | Self::Requests
                | Self::Rebuild
        )
    }
}

/// Splits `/name@bot args` into the command and its argument text.
///
/// Returns `None` for text that is not a slash command at all, and
/// `Some(Err(name))` for an unrecognized one.
pub fn parse_command(text: &str) -> Option<Result<(Command, &str), &str>> {
    let rest = text.trim().strip_prefix('/')?;
    let (head, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let name = head.split_once('@').map_or(head, |(name, _)| name);
    if name.is_empty() {
        return None;
    }
    Some(Command::from_str(name).map(|c| (c, args.trim())).map_err(|_| name))
}

/// Owns the dialog engine and dispatches every inbound event.
pub struct Router {
    engine: DialogEngine,
    services: Services,
    access: AccessList,
    locks: Option<UserLocks>,
}

impl Router {
    pub fn new(
        engine: DialogEngine,
        services: Services,
        access: AccessList,
        locks: Option<UserLocks>,
    ) -> Self {
        Self {
            engine,
            services,
            access,
            locks,
        }
    }

    /// Handles one event, serialized per user when locking is enabled.
    ///
    /// A failed event still earns the user the engine's apology; the error
    /// is returned for logging.
    pub async fn handle(&self, event: InboundEvent) -> Result<(), ParleyError> {
        let result = match &self.locks {
            Some(locks) => {
                let guard = locks.lock(event.user_id).await;
                let result = self.dispatch(&event).await;
                drop(guard);
                locks.prune();
                result
            }
            None => self.dispatch(&event).await,
        };
        if result.is_err() {
            let apology = self.engine.apology().clone();
            if let Err(e) = self.engine.transport().send(event.user_id, apology).await {
                warn!(user_id = %event.user_id, error = %e, "failed to send apology");
            }
        }
        result
    }

    async fn dispatch(&self, event: &InboundEvent) -> Result<(), ParleyError> {
        if let InboundKind::Click { .. } = event.kind {
            let outcome = self.engine.handle_click(event).await?;
            debug!(user_id = %event.user_id, ?outcome, "click routed");
            return Ok(());
        }
        if let InboundKind::Checkout { .. } = event.kind {
            return catalog::handle_checkout(&self.services, self.engine.transport(), event).await;
        }

        if let Some(parsed) = event.text_content().and_then(parse_command) {
            return match parsed {
                Ok((command, _)) => self.run_command(command, event).await,
                Err(name) => {
                    debug!(user_id = %event.user_id, command = name, "unknown command");
                    self.reply(event.user_id, UNKNOWN_COMMAND).await
                }
            };
        }

        match self.engine.update(event).await? {
            UpdateOutcome::Idle => self.idle_text(event).await,
            outcome => {
                debug!(user_id = %event.user_id, ?outcome, "dialog updated");
                Ok(())
            }
        }
    }

    /// Free text outside any dialog: only the main keyboard labels mean something.
    async fn idle_text(&self, event: &InboundEvent) -> Result<(), ParleyError> {
        match event.text_content() {
            Some(flows::REMINDERS_LABEL) => self.run_command(Command::Notifications, event).await,
            Some(flows::ACCOUNT_LABEL) => self.run_command(Command::Settings, event).await,
            Some(flows::EXERCISES_LABEL) => self.run_command(Command::Exercises, event).await,
            Some(flows::LESSON_LABEL) => self.run_command(Command::Lesson, event).await,
            _ => Ok(()),
        }
    }

    async fn run_command(&self, command: Command, event: &InboundEvent) -> Result<(), ParleyError> {
        let user = event.user_id;
        let username = event.username.as_deref();
        info!(user_id = %user, %command, "command received");

        if command.is_admin_only() && !self.access.is_admin(user, username) {
            return self.reply(user, ADMIN_ONLY).await;
        }
        // A command always abandons the dialog in progress.
        self.engine.reset(user, false).await?;

        let registered = self.services.storage.get_user(user).await?.is_some();
        let menus = self.engine.menus();
        match command {
            Command::Start if registered => {
                self.reply(user, Content::text("Welcome back!").with_keyboard(main_keyboard()))
                    .await
            }
            Command::Start => survey::start(&self.engine, user).await,
            Command::Cancel => {
                let keyboard = if registered {
                    main_keyboard()
                } else {
                    Keyboard::RemoveReply
                };
                self.reply(user, Content::text("OK").with_keyboard(keyboard)).await
            }
            Command::Help => self.reply(user, help_text(self.access.is_admin(user, username))).await,
            _ if !registered && !command.is_admin_only() => self.reply(user, REGISTER_FIRST).await,
            Command::Settings => menus.show(user, &settings::menu_name()).await.map(drop),
            Command::Notifications => menus.show(user, &notifications::menu_name()).await.map(drop),
            Command::Exercises => menus.show(user, &catalog::packs_menu()).await.map(drop),
            Command::Lesson => self.engine.trigger(user, &lessons::request_lesson_state(), None).await,
            Command::Packs => menus.show(user, &catalog_admin::admin_packs_menu()).await.map(drop),
            Command::AddPack => self.engine.trigger(user, &catalog_admin::add_pack_state(), None).await,
            Command::AddExercise => {
                self.engine
                    .trigger(user, &catalog_admin::add_exercise_state(), None)
                    .await
            }
            Command::Requests => menus.show(user, &lessons::requests_menu()).await.map(drop),
            Command::Broadcast => self.engine.trigger(user, &admin::broadcast_state(), None).await,
            Command::AddCheerUp => self.engine.trigger(user, &admin::add_cheer_up_state(), None).await,
            Command::CheerUps => menus.show(user, &admin::cheer_ups_menu()).await.map(drop),
            Command::Rebuild => {
                let count = self.services.scheduler.rebuild_queue(Utc::now()).await?;
                self.reply(user, format!("Queue rebuilt: {count} users scheduled."))
                    .await
            }
        }
    }

    async fn reply(&self, user: UserId, content: impl Into<Content>) -> Result<(), ParleyError> {
        self.engine.transport().send(user, content.into()).await.map(drop)
    }
}

fn help_text(admin: bool) -> String {
    let mut text = String::from(
        "/start - register or say hello\n\
         /settings - your account\n\
         /notifications - reminder days and times\n\
         /exercises - exercise packs\n\
         /lesson - book a personal lesson\n\
         /cancel - stop what you're doing",
    );
    if admin {
        text.push_str(
            "\n\n/broadcast - message every user\n\
             /cheerups - manage cheer-ups\n\
             /addcheerup - add a cheer-up\n\
             /packs - manage exercise packs\n\
             /addpack - create an exercise pack\n\
             /addexercise - record an exercise\n\
             /requests - open lesson requests\n\
             /rebuild - rebuild the reminder queue",
        );
    }
    text
}
