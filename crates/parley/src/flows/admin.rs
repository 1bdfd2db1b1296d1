// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Administrator tools: cheer-up library and broadcasts of recorded messages.

use tracing::{info, warn};

use parley_core::{Content, MenuName, ParleyError, StateName};
use parley_dialog::{
    ButtonTemplate, ClickAction, DialogContext, DialogEngine, DialogState, FollowUp,
    MenuDefinition, MutatorOutcome,
};

use parley_storage::RecordedPart;

use crate::app::Services;
use crate::flows::main_keyboard;
use crate::flows::recording::{self, CANCEL_WORD, STOP_WORD};

pub const CHEER_UPS_MENU: &str = "CheerUps";
pub const ADD_CHEER_UP: &str = "Admin-Add-CheerUp";
pub const BROADCAST: &str = "Admin-Broadcast";

const BROADCAST_VAR: &str = "broadcast";

const LABEL_CHARS: usize = 40;

pub fn cheer_ups_menu() -> MenuName {
    MenuName::new(CHEER_UPS_MENU)
}

pub fn add_cheer_up_state() -> StateName {
    StateName::new(ADD_CHEER_UP)
}

pub fn broadcast_state() -> StateName {
    StateName::new(BROADCAST)
}

/// Button label for a cheer-up: the first characters of its body.
pub fn cheer_up_label(body: &str) -> String {
    let mut label: String = body.chars().take(LABEL_CHARS).collect();
    if body.chars().count() > LABEL_CHARS {
        label.push('…');
    }
    format!("🗑 {label}")
}

async fn collect_broadcast(services: Services, ctx: DialogContext) -> MutatorOutcome {
    let result = match recording::command(&ctx) {
        recording::Command::Stop => send_broadcast(&services, &ctx)
            .await
            .map(|_| MutatorOutcome::Success),
        recording::Command::Cancel => ctx
            .send(Content::text("Broadcast discarded.").with_keyboard(main_keyboard()))
            .await
            .map(|_| MutatorOutcome::Success),
        recording::Command::Record => append_part(&ctx).await.map(|_| MutatorOutcome::Continue),
    };
    result.unwrap_or_else(MutatorOutcome::Failure)
}

async fn append_part(ctx: &DialogContext) -> Result<(), ParleyError> {
    let count = recording::append(ctx, BROADCAST_VAR).await?;
    ctx.send(format!(
        "Part {count} saved. Send more, {STOP_WORD} to deliver or {CANCEL_WORD} to discard."
    ))
    .await?;
    Ok(())
}

async fn send_broadcast(services: &Services, ctx: &DialogContext) -> Result<(), ParleyError> {
    let parts: Vec<Content> = recording::parts(ctx, BROADCAST_VAR)
        .await?
        .iter()
        .map(RecordedPart::to_content)
        .collect();
    if parts.is_empty() {
        ctx.send(Content::text("Nothing to send.").with_keyboard(main_keyboard()))
            .await?;
        return Ok(());
    }

    let users = services.storage.list_user_ids().await?;
    let mut delivered = 0usize;
    for &user in &users {
        let mut ok = true;
        for part in &parts {
            if let Err(e) = ctx.transport().send(user, part.clone()).await {
                warn!(user_id = %user, error = %e, "broadcast delivery failed");
                ok = false;
                break;
            }
        }
        if ok {
            delivered += 1;
        }
    }
    info!(admin = %ctx.user(), delivered, total = users.len(), "broadcast sent");
    ctx.send(
        Content::text(format!("Delivered to {delivered} of {} users.", users.len()))
            .with_keyboard(main_keyboard()),
    )
    .await?;
    Ok(())
}

pub fn register(engine: &mut DialogEngine, services: &Services) -> Result<(), ParleyError> {
    let s = services.clone();
    engine.register_one_shot(
        DialogState::new(ADD_CHEER_UP)
            .on_trigger("Send the text of the new cheer-up.")
            .validator(|ctx| match ctx.text().map(str::trim) {
                Some(text) if !text.is_empty() => None,
                _ => Some("A cheer-up needs some text.".to_string()),
            })
            .mutator(move |ctx| {
                let services = s.clone();
                async move {
                    let body = ctx.text().unwrap_or_default().trim().to_string();
                    services.storage.add_cheer_up(&body).await.map(|_| ()).into()
                }
            })
            .on_success("Cheer-up saved."),
    )?;

    let fetch = services.clone();
    let select = services.clone();
    engine.register_menu(
        MenuDefinition::new(CHEER_UPS_MENU)
            .header("Cheer-ups appended to reminders. Tap one to delete it.")
            .max_per_row(1)
            .dynamic(move |_| {
                let services = fetch.clone();
                async move {
                    let cheer_ups = services.storage.list_cheer_ups().await?;
                    Ok(cheer_ups
                        .into_iter()
                        .map(|c| (c.id.to_string(), cheer_up_label(&c.body)))
                        .collect())
                }
            })
            .on_select(move |_, id| {
                let services = select.clone();
                async move {
                    let id: i64 = id
                        .parse()
                        .map_err(|_| ParleyError::Internal(format!("bad cheer-up id `{id}`")))?;
                    services.storage.delete_cheer_up(id).await?;
                    Ok(FollowUp::RefreshMenu)
                }
            })
            .button(ButtonTemplate::new("add", "➕ Add", ClickAction::goto(ADD_CHEER_UP)))
            .empty_notice("No cheer-ups yet. Add one with /addcheerup."),
    )?;

    let s = services.clone();
    engine.register_one_shot(
        DialogState::new(BROADCAST)
            .on_trigger(format!(
                "Send the broadcast, one message at a time. {STOP_WORD} delivers it, \
                 {CANCEL_WORD} discards it."
            ))
            .validator(recording::validate)
            .mutator(move |ctx| collect_broadcast(s.clone(), ctx)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_truncated() {
        assert_eq!(cheer_up_label("Keep going"), "🗑 Keep going");
        let long = "x".repeat(60);
        let label = cheer_up_label(&long);
        assert!(label.ends_with('…'));
        assert_eq!(label.chars().count(), 2 + LABEL_CHARS + 1);
    }
}
