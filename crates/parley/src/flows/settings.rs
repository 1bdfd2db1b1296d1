// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account settings menu and its one-step edit dialogs.

use chrono::Utc;

use parley_core::{Content, MenuName, ParleyError, UserId};
use parley_dialog::{
    ButtonTemplate, ButtonText, ClickAction, DataMap, DialogContext, DialogEngine, DialogState,
    MenuDefinition, TextFallback,
};
use parley_storage::UserProfile;

use crate::app::Services;
use crate::flows::survey::{
    experience_keyboard, normalize_experience, timezone_from_local, validate_age, validate_city,
    validate_experience, validate_local_time, validate_name,
};
use crate::flows::{cancel_follow_up, main_keyboard, title_case};

pub const MENU: &str = "AccountSettings";
pub const EDIT_NAME: &str = "Settings-Name";
pub const EDIT_AGE: &str = "Settings-Age";
pub const EDIT_CITY: &str = "Settings-City";
pub const EDIT_TIMEZONE: &str = "Settings-Timezone";
pub const EDIT_EXPERIENCE: &str = "Settings-Experience";

pub fn menu_name() -> MenuName {
    MenuName::new(MENU)
}

fn profile_data(profile: &UserProfile) -> DataMap {
    let mut data = DataMap::new();
    data.insert("name".into(), profile.display_name.clone());
    if let Some(age) = profile.age {
        data.insert("age".into(), age.to_string());
    }
    if let Some(city) = &profile.city {
        data.insert("city".into(), city.clone());
    }
    data.insert("timezone".into(), profile.timezone_label.clone());
    if let Some(experience) = &profile.experience {
        data.insert("experience".into(), experience.clone());
    }
    data
}

fn labelled(label: &'static str, key: &'static str) -> ButtonText {
    ButtonText::dynamic(move |_, data| match data.get(key) {
        Some(value) => Ok(format!("{label}: {value}")),
        None => Err(TextFallback::new(
            format!("{label}: not set"),
            format!("profile has no `{key}`"),
        )),
    })
}

/// Loads the profile, applies `edit` and writes it back.
async fn edit_profile(
    services: &Services,
    user: UserId,
    edit: impl FnOnce(&mut UserProfile),
) -> Result<(), ParleyError> {
    let mut profile = services
        .storage
        .get_user(user)
        .await?
        .ok_or_else(|| ParleyError::Internal(format!("user {user} has no profile")))?;
    edit(&mut profile);
    services.storage.save_user(&profile).await
}

fn input(ctx: &DialogContext) -> String {
    ctx.text().unwrap_or_default().to_string()
}

pub fn register(engine: &mut DialogEngine, services: &Services) -> Result<(), ParleyError> {
    let fetch = services.clone();
    engine.register_menu(
        MenuDefinition::new(MENU)
            .header("Your account. Tap a field to change it.")
            .max_per_row(1)
            .data(move |ctx| {
                let services = fetch.clone();
                async move {
                    let profile = services.storage.get_user(ctx.user()).await?;
                    Ok(profile.as_ref().map(profile_data).unwrap_or_default())
                }
            })
            .button(ButtonTemplate::new("name", labelled("Name", "name"), ClickAction::goto(EDIT_NAME)))
            .button(ButtonTemplate::new("age", labelled("Age", "age"), ClickAction::goto(EDIT_AGE)))
            .button(ButtonTemplate::new("city", labelled("City", "city"), ClickAction::goto(EDIT_CITY)))
            .button(ButtonTemplate::new(
                "timezone",
                labelled("Time zone", "timezone"),
                ClickAction::goto(EDIT_TIMEZONE),
            ))
            .button(ButtonTemplate::new(
                "experience",
                labelled("Experience", "experience"),
                ClickAction::goto(EDIT_EXPERIENCE),
            ))
            .button(ButtonTemplate::new(
                "cancel",
                "✖ Close",
                ClickAction::callback(|_| async { Ok(cancel_follow_up()) }),
            )),
    )?;

    let s = services.clone();
    engine.register_one_shot(
        DialogState::new(EDIT_NAME)
            .on_trigger("What should I call you?")
            .validator(|ctx| validate_name(ctx.text()))
            .mutator(move |ctx| {
                let services = s.clone();
                async move {
                    let name = input(&ctx);
                    edit_profile(&services, ctx.user(), |p| p.display_name = name)
                        .await
                        .into()
                }
            })
            .on_success("Name updated."),
    )?;

    let s = services.clone();
    engine.register_one_shot(
        DialogState::new(EDIT_AGE)
            .on_trigger("How old are you?")
            .validator(|ctx| validate_age(ctx.text()))
            .mutator(move |ctx| {
                let services = s.clone();
                async move {
                    let age = input(&ctx).parse().ok();
                    edit_profile(&services, ctx.user(), |p| p.age = age).await.into()
                }
            })
            .on_success("Age updated."),
    )?;

    let s = services.clone();
    engine.register_one_shot(
        DialogState::new(EDIT_CITY)
            .on_trigger("Which city do you live in now?")
            .validator(|ctx| validate_city(ctx.text()))
            .mutator(move |ctx| {
                let services = s.clone();
                async move {
                    let city = title_case(&input(&ctx));
                    edit_profile(&services, ctx.user(), |p| p.city = Some(city))
                        .await
                        .into()
                }
            })
            .on_success("City updated."),
    )?;

    let s = services.clone();
    engine.register_one_shot(
        DialogState::new(EDIT_TIMEZONE)
            .on_trigger("What time is it on your clock? (HH:MM)")
            .validator(|ctx| validate_local_time(ctx.text()))
            .mutator(move |ctx| {
                let services = s.clone();
                async move { change_timezone(&services, &ctx).await.into() }
            })
            .on_success("Time zone updated. Reminders follow your new clock."),
    )?;

    let s = services.clone();
    engine.register_one_shot(
        DialogState::new(EDIT_EXPERIENCE)
            .on_trigger(
                Content::text("How long have you been training your voice?")
                    .with_keyboard(experience_keyboard()),
            )
            .validator(|ctx| validate_experience(ctx.text()))
            .mutator(move |ctx| {
                let services = s.clone();
                async move {
                    let experience = ctx.text().and_then(normalize_experience).map(str::to_string);
                    edit_profile(&services, ctx.user(), |p| p.experience = experience)
                        .await
                        .into()
                }
            })
            .on_success("Experience updated.")
            .exit_keyboard(main_keyboard()),
    )
}

async fn change_timezone(services: &Services, ctx: &DialogContext) -> Result<(), ParleyError> {
    let (offset, label) = timezone_from_local(&input(ctx))
        .ok_or_else(|| ParleyError::Internal("validated time no longer parses".into()))?;
    let user = ctx.user();
    edit_profile(services, user, |p| {
        p.utc_offset_minutes = offset;
        p.timezone_label = label;
    })
    .await?;
    services.scheduler.reschedule_user(user, Utc::now()).await
}
