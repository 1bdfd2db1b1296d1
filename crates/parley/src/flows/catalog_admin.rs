// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catalog management for administrators: packs, their prices and the
//! recorded exercises inside them.

use tracing::info;

use parley_core::{Content, MenuName, ParleyError, StateName};
use parley_dialog::{
    ButtonTemplate, ButtonText, ClickAction, DataMap, DialogContext, DialogEngine, DialogState,
    FollowUp, MenuDefinition, MutatorOutcome, TextFallback,
};

use crate::app::Services;
use crate::flows::recording::{self, CANCEL_WORD, STOP_WORD};
use crate::flows::{cancel_follow_up, main_keyboard};

pub const ADMIN_PACKS_MENU: &str = "AdminPacks";
pub const PACK_EDIT_MENU: &str = "PackEdit";
pub const PACK_EXERCISES_MENU: &str = "PackExercises";
pub const PACK_PICKER_MENU: &str = "PackPicker";

pub const ADD_PACK_NAME: &str = "Admin-Pack-Name";
pub const ADD_PACK_PRICE: &str = "Admin-Pack-Price";
pub const RENAME_PACK: &str = "Admin-Pack-Rename";
pub const REPRICE_PACK: &str = "Admin-Pack-Price-Edit";
pub const EXERCISE_PACK: &str = "Admin-Exercise-Pack";
pub const EXERCISE_NAME: &str = "Admin-Exercise-Name";
pub const EXERCISE_CONTENT: &str = "Admin-Exercise-Content";

pub const MAX_TITLE_CHARS: usize = 50;
pub const MAX_PRICE: u32 = 100_000;

const PACK_VAR: &str = "pack";
const PACK_NAME_VAR: &str = "pack_name";
const EXERCISE_NAME_VAR: &str = "exercise_name";
const EXERCISE_VAR: &str = "exercise";

pub fn admin_packs_menu() -> MenuName {
    MenuName::new(ADMIN_PACKS_MENU)
}

pub fn add_pack_state() -> StateName {
    StateName::new(ADD_PACK_NAME)
}

pub fn add_exercise_state() -> StateName {
    StateName::new(EXERCISE_PACK)
}

pub fn validate_title(input: Option<&str>) -> Option<String> {
    match input {
        Some(t) if !t.is_empty() && t.chars().count() <= MAX_TITLE_CHARS => None,
        _ => Some(format!("Please send a name of 1 to {MAX_TITLE_CHARS} characters.")),
    }
}

pub fn validate_price(input: Option<&str>) -> Option<String> {
    match input.and_then(|t| t.parse::<u32>().ok()) {
        Some(p) if p <= MAX_PRICE => None,
        _ => Some(format!("Please send a whole number between 0 and {MAX_PRICE}.")),
    }
}

fn price_label(price: u32) -> String {
    if price == 0 {
        "free".to_string()
    } else {
        price.to_string()
    }
}

fn input(ctx: &DialogContext) -> String {
    ctx.text().unwrap_or_default().to_string()
}

async fn pack_var(ctx: &DialogContext) -> Result<i64, ParleyError> {
    ctx.get_var(PACK_VAR)
        .await?
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| ParleyError::Internal("no pack selected".into()))
}

/// Pack names are unique; a taken name keeps the admin in the step.
async fn name_is_taken(services: &Services, name: &str) -> Result<bool, ParleyError> {
    Ok(services
        .storage
        .list_packs()
        .await?
        .iter()
        .any(|p| p.name == name))
}

async fn store_pack_name(services: Services, ctx: DialogContext) -> MutatorOutcome {
    let name = input(&ctx);
    let result = async {
        if name_is_taken(&services, &name).await? {
            ctx.send("A pack with that name already exists. Try another one.")
                .await?;
            return Ok::<_, ParleyError>(MutatorOutcome::Continue);
        }
        ctx.set_var(PACK_NAME_VAR, &name).await?;
        Ok(MutatorOutcome::Success)
    };
    result.await.unwrap_or_else(MutatorOutcome::Failure)
}

async fn create_pack(services: &Services, ctx: &DialogContext) -> Result<(), ParleyError> {
    let name = ctx
        .get_var(PACK_NAME_VAR)
        .await?
        .ok_or_else(|| ParleyError::Internal("pack name missing".into()))?;
    let price = input(ctx).parse().unwrap_or_default();
    let id = services.storage.add_pack(&name, price).await?;
    info!(admin = %ctx.user(), pack = id, price, "pack created");
    Ok(())
}

async fn rename_pack(services: Services, ctx: DialogContext) -> MutatorOutcome {
    let name = input(&ctx);
    let result = async {
        if name_is_taken(&services, &name).await? {
            ctx.send("A pack with that name already exists. Try another one.")
                .await?;
            return Ok::<_, ParleyError>(MutatorOutcome::Continue);
        }
        services.storage.rename_pack(pack_var(&ctx).await?, &name).await?;
        Ok(MutatorOutcome::Success)
    };
    result.await.unwrap_or_else(MutatorOutcome::Failure)
}

async fn collect_exercise(services: Services, ctx: DialogContext) -> MutatorOutcome {
    let result = match recording::command(&ctx) {
        recording::Command::Stop => save_exercise(&services, &ctx).await,
        recording::Command::Cancel => ctx
            .send(Content::text("Exercise discarded.").with_keyboard(main_keyboard()))
            .await
            .map(|_| MutatorOutcome::Success),
        recording::Command::Record => match recording::append(&ctx, EXERCISE_VAR).await {
            Ok(count) => ctx
                .send(format!(
                    "Part {count} saved. Send more, {STOP_WORD} to save the exercise or \
                     {CANCEL_WORD} to discard it."
                ))
                .await
                .map(|_| MutatorOutcome::Continue),
            Err(e) => Err(e),
        },
    };
    result.unwrap_or_else(MutatorOutcome::Failure)
}

async fn save_exercise(services: &Services, ctx: &DialogContext) -> Result<MutatorOutcome, ParleyError> {
    let parts = recording::parts(ctx, EXERCISE_VAR).await?;
    if parts.is_empty() {
        ctx.send("Send at least one message before saving.").await?;
        return Ok(MutatorOutcome::Continue);
    }
    let pack = pack_var(ctx).await?;
    let name = ctx
        .get_var(EXERCISE_NAME_VAR)
        .await?
        .ok_or_else(|| ParleyError::Internal("exercise name missing".into()))?;
    let count = parts.len();
    let id = services.storage.add_exercise(pack, &name, parts).await?;
    recording::clear(ctx, EXERCISE_VAR).await?;
    info!(admin = %ctx.user(), pack, exercise = id, parts = count, "exercise saved");
    ctx.send(Content::text("Exercise saved.").with_keyboard(main_keyboard()))
        .await?;
    Ok(MutatorOutcome::Success)
}

fn pack_data(name: &str, price: u32) -> DataMap {
    let mut data = DataMap::new();
    data.insert("name".into(), name.to_string());
    data.insert("price".into(), price_label(price));
    data
}

fn field(label: &'static str, key: &'static str) -> ButtonText {
    ButtonText::dynamic(move |_, data| {
        data.get(key)
            .map(|value| format!("{label}: {value}"))
            .ok_or_else(|| TextFallback::missing(key))
    })
}

fn all_packs_menu(name: &str, services: &Services) -> MenuDefinition {
    let fetch = services.clone();
    MenuDefinition::new(name).max_per_row(1).dynamic(move |_| {
        let services = fetch.clone();
        async move {
            let packs = services.storage.list_packs().await?;
            Ok(packs
                .into_iter()
                .map(|p| (p.id.to_string(), format!("{} · {}", p.name, price_label(p.price))))
                .collect())
        }
    })
}

pub fn register(engine: &mut DialogEngine, services: &Services) -> Result<(), ParleyError> {
    engine.register_menu(
        all_packs_menu(ADMIN_PACKS_MENU, services)
            .header("Exercise packs. Tap one to edit it.")
            .on_select(|ctx, id| async move {
                ctx.set_var(PACK_VAR, &id).await?;
                Ok(FollowUp::Show(MenuName::new(PACK_EDIT_MENU)))
            })
            .button(ButtonTemplate::new("add", "➕ New pack", ClickAction::goto(ADD_PACK_NAME)))
            .empty_notice("No packs yet. Create one with /addpack."),
    )?;

    let fetch = services.clone();
    let delete = services.clone();
    engine.register_menu(
        MenuDefinition::new(PACK_EDIT_MENU)
            .header("Pack settings.")
            .max_per_row(1)
            .data(move |ctx| {
                let services = fetch.clone();
                async move {
                    let Ok(id) = pack_var(&ctx).await else {
                        return Ok(DataMap::new());
                    };
                    let pack = services.storage.get_pack(id).await?;
                    Ok(pack.map(|p| pack_data(&p.name, p.price)).unwrap_or_default())
                }
            })
            .button(ButtonTemplate::new("name", field("Name", "name"), ClickAction::goto(RENAME_PACK)))
            .button(ButtonTemplate::new(
                "price",
                field("Price", "price"),
                ClickAction::goto(REPRICE_PACK),
            ))
            .button(ButtonTemplate::new(
                "exercises",
                "📋 Exercises",
                ClickAction::callback(|_| async {
                    Ok(FollowUp::Show(MenuName::new(PACK_EXERCISES_MENU)))
                }),
            ))
            .button(ButtonTemplate::new(
                "add",
                "➕ Add exercise",
                ClickAction::goto(EXERCISE_NAME),
            ))
            .button(ButtonTemplate::new(
                "delete",
                "🗑 Delete pack",
                ClickAction::callback(move |ctx| {
                    let services = delete.clone();
                    async move {
                        let id = pack_var(&ctx).await?;
                        services.storage.delete_pack(id).await?;
                        info!(admin = %ctx.user(), pack = id, "pack deleted");
                        Ok(FollowUp::Reset {
                            keep_vars: false,
                            notice: Some(
                                Content::text("Pack deleted with its exercises.")
                                    .with_keyboard(main_keyboard()),
                            ),
                        })
                    }
                }),
            ))
            .button(ButtonTemplate::new(
                "close",
                "✖ Close",
                ClickAction::callback(|_| async { Ok(cancel_follow_up()) }),
            )),
    )?;

    let fetch = services.clone();
    let select = services.clone();
    engine.register_menu(
        MenuDefinition::new(PACK_EXERCISES_MENU)
            .header("Exercises of this pack. Tap one to delete it.")
            .max_per_row(1)
            .dynamic(move |ctx| {
                let services = fetch.clone();
                async move {
                    let pack = pack_var(&ctx)
                        .await
                        .map_err(|_| ParleyError::NoButtonsAvailable)?;
                    let exercises = services.storage.list_exercises(pack).await?;
                    Ok(exercises
                        .into_iter()
                        .map(|e| (e.id.to_string(), format!("🗑 {}", e.name)))
                        .collect())
                }
            })
            .on_select(move |_, id| {
                let services = select.clone();
                async move {
                    let id: i64 = id
                        .parse()
                        .map_err(|_| ParleyError::Internal(format!("bad exercise id `{id}`")))?;
                    services.storage.delete_exercise(id).await?;
                    Ok(FollowUp::RefreshMenu)
                }
            })
            .empty_notice("This pack has no exercises yet."),
    )?;

    engine.register_menu(
        all_packs_menu(PACK_PICKER_MENU, services)
            .header("Which pack does the exercise go into?")
            .on_select(|ctx, id| async move {
                ctx.set_var(PACK_VAR, &id).await?;
                Ok(FollowUp::Trigger(StateName::new(EXERCISE_NAME)))
            })
            .empty_notice("There are no packs yet. Create one with /addpack first."),
    )?;

    let s = services.clone();
    let p = services.clone();
    engine.register_chain(vec![
        DialogState::new(ADD_PACK_NAME)
            .on_trigger(format!("Name of the new pack? Up to {MAX_TITLE_CHARS} characters."))
            .validator(|ctx| validate_title(ctx.text()))
            .mutator(move |ctx| store_pack_name(s.clone(), ctx)),
        DialogState::new(ADD_PACK_PRICE)
            .on_trigger(format!(
                "Price in {}? Send 0 to make the pack free.",
                services.catalog.currency
            ))
            .validator(|ctx| validate_price(ctx.text()))
            .mutator(move |ctx| {
                let services = p.clone();
                async move { create_pack(&services, &ctx).await.into() }
            })
            .on_success("Pack created. Add exercises to it with /addexercise."),
    ])?;

    let s = services.clone();
    engine.register_one_shot(
        DialogState::new(RENAME_PACK)
            .on_trigger("New name of the pack?")
            .validator(|ctx| validate_title(ctx.text()))
            .mutator(move |ctx| rename_pack(s.clone(), ctx))
            .on_success("Pack renamed.")
            .keep_vars_on_exit(),
    )?;

    let s = services.clone();
    engine.register_one_shot(
        DialogState::new(REPRICE_PACK)
            .on_trigger(format!(
                "New price in {}? Send 0 to make the pack free.",
                services.catalog.currency
            ))
            .validator(|ctx| validate_price(ctx.text()))
            .mutator(move |ctx| {
                let services = s.clone();
                async move {
                    let result = async {
                        let price = input(&ctx).parse().unwrap_or_default();
                        services.storage.set_pack_price(pack_var(&ctx).await?, price).await?;
                        Ok::<(), ParleyError>(())
                    };
                    result.await.into()
                }
            })
            .on_success("Price updated. Earlier buyers keep their access.")
            .keep_vars_on_exit(),
    )?;

    engine.register_one_shot(
        DialogState::new(EXERCISE_PACK)
            .on_trigger_menu(PACK_PICKER_MENU)
            .validator(|_| Some("Pick a pack from the list above.".to_string())),
    )?;

    let s = services.clone();
    engine.register_chain(vec![
        DialogState::new(EXERCISE_NAME)
            .on_trigger(format!("Name of the exercise? Up to {MAX_TITLE_CHARS} characters."))
            .validator(|ctx| validate_title(ctx.text()))
            .mutator(|ctx| async move {
                let result = async {
                    recording::clear(&ctx, EXERCISE_VAR).await?;
                    ctx.set_var(EXERCISE_NAME_VAR, &input(&ctx)).await?;
                    Ok::<(), ParleyError>(())
                };
                result.await.into()
            }),
        DialogState::new(EXERCISE_CONTENT)
            .on_trigger(format!(
                "Now send the exercise, one message at a time: text, voice, audio, video, \
                 photos or documents. {STOP_WORD} saves it, {CANCEL_WORD} discards it."
            ))
            .validator(recording::validate)
            .mutator(move |ctx| collect_exercise(s.clone(), ctx))
            .keep_vars_on_exit(),
    ])
}
