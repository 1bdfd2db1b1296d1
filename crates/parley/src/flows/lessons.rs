// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Personal lesson requests: users leave a phone number or ask to be
//! messaged, administrators work through the open requests.

use tracing::info;

use parley_core::{Content, InboundKind, Keyboard, MenuName, ParleyError, StateName, UserId};
use parley_dialog::{DialogContext, DialogEngine, DialogState, FollowUp, MenuDefinition};
use parley_storage::LessonRequest;

use crate::app::Services;
use crate::flows::main_keyboard;

pub const REQUEST_LESSON: &str = "Lesson-Request";
pub const REQUESTS_MENU: &str = "LessonRequests";

pub const CALL_ME: &str = "📞 Call me";
pub const MESSAGE_ME: &str = "✉️ Message me";
pub const CANCEL: &str = "Cancel";

pub fn request_lesson_state() -> StateName {
    StateName::new(REQUEST_LESSON)
}

pub fn requests_menu() -> MenuName {
    MenuName::new(REQUESTS_MENU)
}

fn request_keyboard() -> Keyboard {
    Keyboard::ContactRequest {
        share: CALL_ME.to_string(),
        rows: vec![vec![MESSAGE_ME.to_string()], vec![CANCEL.to_string()]],
    }
}

/// How the user answered the booking prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Reply {
    Call(String),
    Message,
    Cancel,
}

fn reply(ctx: &DialogContext) -> Option<Reply> {
    match ctx.event().map(|e| &e.kind) {
        Some(InboundKind::Contact { phone }) => Some(Reply::Call(phone.clone())),
        _ => match ctx.text() {
            Some(MESSAGE_ME) => Some(Reply::Message),
            Some(CANCEL) => Some(Reply::Cancel),
            _ => None,
        },
    }
}

/// Who asked, as shown to administrators.
pub fn requester_label(request: &LessonRequest) -> String {
    let who = match &request.username {
        Some(name) => format!("@{name}"),
        None => format!("user {}", request.user_id),
    };
    let day = request.created_at.get(..10).unwrap_or(&request.created_at);
    format!("{who} · {day}")
}

fn request_details(request: &LessonRequest) -> String {
    let contact = match &request.phone {
        Some(phone) => format!("Call them at {phone}."),
        None => "They asked to be messaged.".to_string(),
    };
    format!(
        "Lesson request from {} (id {}). {contact} Marked as resolved.",
        requester_label(request),
        request.user_id
    )
}

async fn file_request(services: &Services, ctx: &DialogContext) -> Result<(), ParleyError> {
    let phone = match reply(ctx) {
        Some(Reply::Call(phone)) => Some(phone),
        Some(Reply::Message) => None,
        Some(Reply::Cancel) | None => {
            ctx.send(Content::text("OK").with_keyboard(main_keyboard()))
                .await?;
            return Ok(());
        }
    };
    let user = ctx.user();
    let answer = match services.storage.lesson_request(user).await? {
        Some(existing) if existing.resolved => {
            "We already handled a request from you. Write to the coach directly to book again."
        }
        Some(_) => "Your request is already in. We'll be in touch soon!",
        None => {
            let username = ctx.event().and_then(|e| e.username.as_deref());
            services
                .storage
                .add_lesson_request(user, username, phone.as_deref())
                .await?;
            info!(user_id = %user, call = phone.is_some(), "lesson requested");
            "Thanks! We'll get back to you soon."
        }
    };
    ctx.send(Content::text(answer).with_keyboard(main_keyboard()))
        .await?;
    Ok(())
}

async fn resolve(services: &Services, ctx: &DialogContext, id: &str) -> Result<FollowUp, ParleyError> {
    let user = UserId(
        id.parse()
            .map_err(|_| ParleyError::Internal(format!("bad request id `{id}`")))?,
    );
    let Some(request) = services.storage.lesson_request(user).await? else {
        return Ok(FollowUp::RefreshMenu);
    };
    if services.storage.resolve_lesson_request(user).await? {
        ctx.send(request_details(&request)).await?;
        info!(admin = %ctx.user(), user_id = %user, "lesson request resolved");
    }
    Ok(FollowUp::RefreshMenu)
}

pub fn register(engine: &mut DialogEngine, services: &Services) -> Result<(), ParleyError> {
    let s = services.clone();
    engine.register_one_shot(
        DialogState::new(REQUEST_LESSON)
            .on_trigger(
                Content::text(
                    "Want a personal lesson? Share your phone number and we'll call you, \
                     or ask us to message you here.",
                )
                .with_keyboard(request_keyboard()),
            )
            .validator(|ctx| match reply(ctx) {
                Some(_) => None,
                None => Some("Please use the buttons below.".to_string()),
            })
            .mutator(move |ctx| {
                let services = s.clone();
                async move { file_request(&services, &ctx).await.into() }
            }),
    )?;

    let fetch = services.clone();
    let select = services.clone();
    engine.register_menu(
        MenuDefinition::new(REQUESTS_MENU)
            .header("Open lesson requests. Tap one to see the contact and resolve it.")
            .max_per_row(1)
            .dynamic(move |_| {
                let services = fetch.clone();
                async move {
                    let requests = services.storage.open_lesson_requests().await?;
                    Ok(requests
                        .iter()
                        .map(|r| (r.user_id.0.to_string(), requester_label(r)))
                        .collect())
                }
            })
            .on_select(move |ctx, id| {
                let services = select.clone();
                async move { resolve(&services, &ctx, &id).await }
            })
            .empty_notice("No open lesson requests."),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(username: Option<&str>, phone: Option<&str>) -> LessonRequest {
        LessonRequest {
            user_id: UserId(42),
            username: username.map(str::to_string),
            phone: phone.map(str::to_string),
            resolved: false,
            created_at: "2026-03-01T10:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn labels_prefer_the_username() {
        assert_eq!(requester_label(&request(Some("alice"), None)), "@alice · 2026-03-01");
        assert_eq!(requester_label(&request(None, None)), "user 42 · 2026-03-01");
    }

    #[test]
    fn details_carry_the_phone() {
        let details = request_details(&request(Some("alice"), Some("+4790000000")));
        assert!(details.contains("+4790000000"));
        assert!(request_details(&request(None, None)).contains("messaged"));
    }

    #[test]
    fn keyboard_offers_contact_sharing() {
        match request_keyboard() {
            Keyboard::ContactRequest { share, rows } => {
                assert_eq!(share, CALL_ME);
                assert_eq!(rows.len(), 2);
            }
            other => panic!("expected contact keyboard, got {other:?}"),
        }
    }
}
