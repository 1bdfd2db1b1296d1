// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registration survey: name, age, city, time zone and training experience.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use tracing::info;

use parley_core::schedule::{format_utc_offset, offset_from_local_time, parse_hhmm};
use parley_core::{Content, Keyboard, ParleyError, StateName, UserId};
use parley_dialog::{DialogContext, DialogEngine, DialogState, MutatorOutcome, reply_keyboard};
use parley_storage::UserProfile;

use crate::app::Services;
use crate::flows::{main_keyboard, title_case};

pub const ASK_NAME: &str = "Ask-Name";
pub const ASK_AGE: &str = "Ask-Age";
pub const ASK_CITY: &str = "Ask-City";
pub const ASK_TIMEZONE: &str = "Ask-Timezone";
pub const ASK_EXPERIENCE: &str = "Ask-Experience";

/// Accepted answers to the experience question, shown as a reply keyboard.
pub const EXPERIENCE_ANSWERS: [&str; 6] = [
    "no experience",
    "under 1 year",
    "1-2 years",
    "2-3 years",
    "3-5 years",
    "over 5 years",
];

pub const UNRECOGNIZED: &str = "I can't make that out. Please try again.";

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}][\p{L} -]{1,49}$").expect("valid name regex"));

pub fn validate_name(input: Option<&str>) -> Option<String> {
    match input {
        None | Some("") => Some(UNRECOGNIZED.to_string()),
        Some(name) if NAME_RE.is_match(name) => None,
        Some(_) => Some("A name is 2 to 50 letters; spaces and hyphens are fine.".to_string()),
    }
}

pub fn validate_age(input: Option<&str>) -> Option<String> {
    let Some(text) = input.filter(|t| !t.is_empty()) else {
        return Some(UNRECOGNIZED.to_string());
    };
    match text.parse::<i64>() {
        Ok(age) if (1..=150).contains(&age) => None,
        Ok(age) if age > 150 => Some("Come on, how old are you really?".to_string()),
        _ => Some("Age is a number greater than zero. Try again.".to_string()),
    }
}

pub fn validate_city(input: Option<&str>) -> Option<String> {
    match input {
        Some(city) if !city.is_empty() => None,
        _ => Some(UNRECOGNIZED.to_string()),
    }
}

pub fn validate_local_time(input: Option<&str>) -> Option<String> {
    match input.and_then(parse_hhmm) {
        Some(_) => None,
        None => Some("Please answer as HH:MM, for example 20:55.".to_string()),
    }
}

pub fn validate_experience(input: Option<&str>) -> Option<String> {
    match input.and_then(normalize_experience) {
        Some(_) => None,
        None => Some("Please pick one of the answers on the keyboard.".to_string()),
    }
}

/// The canonical answer matching `input`, ignoring case.
pub fn normalize_experience(input: &str) -> Option<&'static str> {
    let input = input.trim();
    EXPERIENCE_ANSWERS
        .into_iter()
        .find(|answer| answer.eq_ignore_ascii_case(input))
}

pub fn experience_keyboard() -> Keyboard {
    reply_keyboard(EXPERIENCE_ANSWERS, 2, true)
}

/// UTC offset and its label for a reported local wall-clock time.
pub fn timezone_from_local(input: &str) -> Option<(i32, String)> {
    let local = parse_hhmm(input)?;
    let offset = offset_from_local_time(Utc::now(), local);
    Some((offset, format_utc_offset(offset)))
}

fn text_of(ctx: &DialogContext) -> String {
    ctx.text().unwrap_or_default().to_string()
}

async fn store_var(ctx: DialogContext, key: &'static str, value: String) -> MutatorOutcome {
    ctx.set_var(key, &value).await.into()
}

async fn store_timezone(ctx: DialogContext) -> Result<(), ParleyError> {
    let (offset, label) = timezone_from_local(&text_of(&ctx))
        .ok_or_else(|| ParleyError::Internal("validated time no longer parses".into()))?;
    ctx.set_var("Offset", &offset.to_string()).await?;
    ctx.set_var("Timezone", &label).await?;
    ctx.send(format!("So your time zone is {label}.")).await?;
    Ok(())
}

async fn finish_survey(ctx: DialogContext, services: Services) -> Result<(), ParleyError> {
    let vars = ctx.vars().await?;
    let user = ctx.user();
    let mut profile = UserProfile::new(user, vars.get("Name").cloned().unwrap_or_default());
    profile.username = ctx.event().and_then(|e| e.username.clone());
    profile.age = vars.get("Age").and_then(|a| a.parse().ok());
    profile.city = vars.get("City").cloned();
    profile.utc_offset_minutes = vars.get("Offset").and_then(|o| o.parse().ok()).unwrap_or(0);
    if let Some(label) = vars.get("Timezone") {
        profile.timezone_label = label.clone();
    }
    profile.experience = ctx.text().and_then(normalize_experience).map(str::to_string);

    services.storage.save_user(&profile).await?;
    services.scheduler.add_user(user, Utc::now()).await?;
    info!(user_id = %user, "user registered");
    Ok(())
}

pub fn register(engine: &mut DialogEngine, services: &Services) -> Result<(), ParleyError> {
    let services = services.clone();
    engine.register_chain(vec![
        DialogState::new(ASK_NAME)
            .on_trigger(
                Content::text("Hi! Before we start, a few quick questions.\n\n(1/5) What's your name?")
                    .with_keyboard(Keyboard::RemoveReply),
            )
            .validator(|ctx| validate_name(ctx.text()))
            .mutator(|ctx| {
                let name = text_of(&ctx);
                store_var(ctx, "Name", name)
            }),
        DialogState::new(ASK_AGE)
            .on_trigger("(2/5) Great! How old are you?")
            .validator(|ctx| validate_age(ctx.text()))
            .mutator(|ctx| {
                let age = text_of(&ctx);
                store_var(ctx, "Age", age)
            }),
        DialogState::new(ASK_CITY)
            .on_trigger("(3/5) Which city do you live in?")
            .validator(|ctx| validate_city(ctx.text()))
            .mutator(|ctx| {
                let city = title_case(&text_of(&ctx));
                store_var(ctx, "City", city)
            }),
        DialogState::new(ASK_TIMEZONE)
            .on_trigger(
                "(4/5) What time is it on your clock? Answer as HH:MM, for example 23:15. \
                 This tells me your time zone.",
            )
            .validator(|ctx| validate_local_time(ctx.text()))
            .mutator(|ctx| async move { store_timezone(ctx).await.into() }),
        DialogState::new(ASK_EXPERIENCE)
            .on_trigger(
                Content::text("(5/5) Last one: how long have you been training your voice?")
                    .with_keyboard(experience_keyboard()),
            )
            .validator(|ctx| validate_experience(ctx.text()))
            .mutator(move |ctx| {
                let services = services.clone();
                async move { finish_survey(ctx, services).await.into() }
            })
            .on_success("Thanks! You're registered and can use everything now.")
            .exit_keyboard(main_keyboard()),
    ])
}

/// Starts the survey from its first question.
pub async fn start(engine: &DialogEngine, user: UserId) -> Result<(), ParleyError> {
    engine.reset(user, false).await?;
    engine.trigger(user, &StateName::new(ASK_NAME), None).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(validate_name(Some("Alice")), None);
        assert_eq!(validate_name(Some("Mary-Jane Watson")), None);
        assert_eq!(validate_name(Some("Юлия")), None);
        assert!(validate_name(Some("A")).is_some());
        assert!(validate_name(Some("R2D2")).is_some());
        assert!(validate_name(Some(&"a".repeat(51))).is_some());
        assert_eq!(validate_name(None).as_deref(), Some(UNRECOGNIZED));
        assert_eq!(validate_name(Some("")).as_deref(), Some(UNRECOGNIZED));
    }

    #[test]
    fn ages() {
        assert_eq!(validate_age(Some("1")), None);
        assert_eq!(validate_age(Some("150")), None);
        assert!(validate_age(Some("0")).is_some());
        assert!(validate_age(Some("-3")).is_some());
        assert!(validate_age(Some("151")).unwrap().contains("really"));
        assert!(validate_age(Some("thirty")).is_some());
        assert_eq!(validate_age(Some("")).as_deref(), Some(UNRECOGNIZED));
    }

    #[test]
    fn cities_and_times() {
        assert_eq!(validate_city(Some("Oslo")), None);
        assert!(validate_city(None).is_some());
        assert_eq!(validate_local_time(Some("7:05")), None);
        assert!(validate_local_time(Some("25:00")).is_some());
        assert!(validate_local_time(Some("noon")).is_some());
    }

    #[test]
    fn experience_answers_come_from_the_keyboard() {
        assert_eq!(validate_experience(Some("1-2 years")), None);
        assert_eq!(normalize_experience(" No Experience "), Some("no experience"));
        assert!(validate_experience(Some("a decade")).is_some());
        assert!(validate_experience(None).is_some());
        match experience_keyboard() {
            Keyboard::Reply { rows, one_time } => {
                assert_eq!(rows.len(), 3);
                assert!(one_time);
            }
            other => panic!("expected reply keyboard, got {other:?}"),
        }
    }

    #[test]
    fn timezone_labels_follow_offset() {
        let (offset, label) = timezone_from_local("12:00").unwrap();
        assert_eq!(offset % 30, 0);
        assert!((-720..=840).contains(&offset));
        assert_eq!(label, format_utc_offset(offset));
        assert!(timezone_from_local("12:75").is_none());
    }
}
