// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reminder settings: a weekday grid with per-day switches and times.

use chrono::{Utc, Weekday};

use parley_core::schedule::{WEEK, WeekSchedule, format_hhmm, parse_hhmm, weekday_code, weekday_from_code};
use parley_core::{MenuName, ParleyError, StateName, UserId};
use parley_dialog::{
    ButtonTemplate, ButtonText, ClickAction, DataMap, DialogContext, DialogEngine, DialogState,
    FollowUp, MenuDefinition, TextFallback,
};

use crate::app::Services;
use crate::flows::cancel_follow_up;

pub const MENU: &str = "Notifications";
pub const SET_TIME: &str = "Notify-Set-Time";
/// Dialog variable holding the weekday code whose time is being edited.
pub const DAY_VAR: &str = "day";

pub fn menu_name() -> MenuName {
    MenuName::new(MENU)
}

fn switch_mark(on: bool) -> &'static str {
    if on { "✅" } else { "❌" }
}

pub fn schedule_data(schedule: &WeekSchedule) -> DataMap {
    let mut data = DataMap::new();
    for slot in &schedule.days {
        let code = weekday_code(slot.weekday);
        data.insert(format!("{code}On"), slot.enabled.to_string());
        data.insert(format!("{code}Time"), format_hhmm(slot.time));
    }
    data.insert("globalOn".into(), schedule.global_enabled.to_string());
    data
}

fn day_switch_text(day: Weekday) -> ButtonText {
    let key = format!("{}On", weekday_code(day));
    ButtonText::dynamic(move |_, data| match data.get(&key) {
        Some(on) => Ok(format!("{} {day}", switch_mark(on == "true"))),
        None => Err(TextFallback::new(day.to_string(), format!("no data for `{key}`"))),
    })
}

fn day_time_text(day: Weekday) -> ButtonText {
    let key = format!("{}Time", weekday_code(day));
    ButtonText::dynamic(move |_, data| {
        data.get(&key)
            .map(|time| format!("🕒 {time}"))
            .ok_or_else(|| TextFallback::missing(&key))
    })
}

fn global_text() -> ButtonText {
    ButtonText::dynamic(|_, data| match data.get("globalOn").map(String::as_str) {
        Some("true") => Ok("🔔 Reminders on".to_string()),
        Some(_) => Ok("🔕 Reminders off".to_string()),
        None => Err(TextFallback::missing("globalOn")),
    })
}

async fn toggle_day(services: Services, user: UserId, day: Weekday) -> Result<FollowUp, ParleyError> {
    services.storage.toggle_day(user, day).await?;
    services.scheduler.reschedule_user(user, Utc::now()).await?;
    Ok(FollowUp::RefreshMenu)
}

async fn toggle_global(services: Services, user: UserId) -> Result<FollowUp, ParleyError> {
    services.storage.toggle_global(user).await?;
    services.scheduler.reschedule_user(user, Utc::now()).await?;
    Ok(FollowUp::RefreshMenu)
}

async fn ask_time(ctx: DialogContext, day: Weekday) -> Result<FollowUp, ParleyError> {
    ctx.set_var(DAY_VAR, weekday_code(day)).await?;
    Ok(FollowUp::Trigger(StateName::new(SET_TIME)))
}

async fn save_time(services: &Services, ctx: &DialogContext) -> Result<(), ParleyError> {
    let user = ctx.user();
    let day = ctx
        .get_var(DAY_VAR)
        .await?
        .as_deref()
        .and_then(weekday_from_code)
        .ok_or_else(|| ParleyError::Internal("no weekday selected".into()))?;
    let time = ctx
        .text()
        .and_then(parse_hhmm)
        .ok_or_else(|| ParleyError::Internal("validated time no longer parses".into()))?;
    services.storage.set_day_time(user, day, time).await?;
    services.scheduler.reschedule_user(user, Utc::now()).await
}

pub fn register(engine: &mut DialogEngine, services: &Services) -> Result<(), ParleyError> {
    let fetch = services.clone();
    let mut menu = MenuDefinition::new(MENU)
        .header("Reminder days. Tap a day to switch it, or its time to change it.")
        .max_per_row(2)
        .data(move |ctx| {
            let services = fetch.clone();
            async move {
                let schedule = services.storage.schedule(ctx.user()).await?;
                Ok(schedule.as_ref().map(schedule_data).unwrap_or_default())
            }
        });

    for day in WEEK {
        let code = weekday_code(day);
        let s = services.clone();
        menu = menu
            .button(ButtonTemplate::new(
                format!("switch_{code}"),
                day_switch_text(day),
                ClickAction::callback(move |ctx| toggle_day(s.clone(), ctx.user(), day)),
            ))
            .button(ButtonTemplate::new(
                format!("time_{code}"),
                day_time_text(day),
                ClickAction::callback(move |ctx| ask_time(ctx, day)),
            ));
    }

    let s = services.clone();
    menu = menu
        .row_break()
        .button(ButtonTemplate::new(
            "switch_global",
            global_text(),
            ClickAction::callback(move |ctx| toggle_global(s.clone(), ctx.user())),
        ))
        .button(ButtonTemplate::new(
            "cancel",
            "✖ Close",
            ClickAction::callback(|_| async { Ok(cancel_follow_up()) }),
        ));
    engine.register_menu(menu)?;

    let s = services.clone();
    engine.register_one_shot(
        DialogState::new(SET_TIME)
            .on_trigger("Send the new time as HH:MM.")
            .validator(|ctx| match ctx.text().and_then(parse_hhmm) {
                Some(_) => None,
                None => Some("That's not a time. Use HH:MM, for example 08:30.".to_string()),
            })
            .mutator(move |ctx| {
                let services = s.clone();
                async move { save_time(&services, &ctx).await.into() }
            })
            .on_success("Time saved."),
    )
}
