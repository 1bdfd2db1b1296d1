// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exercise catalog for users: pack and exercise menus, invoices for paid
//! packs, and checkout verification.

use std::sync::Arc;

use tracing::{info, warn};

use parley_core::{Content, InboundEvent, InboundKind, Invoice, MenuName, ParleyError, Transport};
use parley_dialog::{
    ButtonTemplate, ClickAction, DialogContext, DialogEngine, FollowUp, MenuDefinition,
};
use parley_storage::{Pack, PackOffer, Purchase};

use crate::app::Services;
use crate::flows::cancel_follow_up;

pub const PACKS_MENU: &str = "Packs";
pub const EXERCISES_MENU: &str = "Exercises";

/// Invoice payloads look like `pack:<id>`.
pub const PAYLOAD_PREFIX: &str = "pack";

pub const PAYMENT_DECLINED: &str =
    "Sorry, this payment can't be accepted right now. You have not been charged.";

/// Variable holding the pack whose exercises are listed.
const PACK_VAR: &str = "pack";

pub fn packs_menu() -> MenuName {
    MenuName::new(PACKS_MENU)
}

/// Button label of a pack: unlocked packs are marked, others show the price.
pub fn offer_label(offer: &PackOffer, currency: &str) -> String {
    let pack = &offer.pack;
    if offer.purchased {
        format!("✅ {}", pack.name)
    } else if pack.is_free() {
        format!("🎁 {}", pack.name)
    } else {
        format!("{} · {} {currency}", pack.name, pack.price)
    }
}

/// Payment request for a pack. Prices are whole units, invoices use cents.
pub fn invoice_for(pack: &Pack, currency: &str) -> Invoice {
    Invoice {
        title: "Exercise pack".to_string(),
        description: format!("Exercise pack '{}'", pack.name),
        payload: format!("{PAYLOAD_PREFIX}:{}", pack.id),
        currency: currency.to_string(),
        amount: pack.price.saturating_mul(100),
    }
}

/// Pack id of an invoice payload produced by [`invoice_for`].
pub fn parse_payload(payload: &str) -> Option<i64> {
    let (prefix, id) = payload.split_once(':')?;
    if prefix != PAYLOAD_PREFIX {
        return None;
    }
    id.parse().ok()
}

fn parse_id(id: &str) -> Result<i64, ParleyError> {
    id.parse()
        .map_err(|_| ParleyError::Internal(format!("bad catalog id `{id}`")))
}

async fn selected_pack(ctx: &DialogContext) -> Result<Option<i64>, ParleyError> {
    Ok(ctx.get_var(PACK_VAR).await?.and_then(|id| id.parse().ok()))
}

/// Opens an unlocked pack, or sends its invoice.
async fn select_pack(services: Services, ctx: DialogContext, id: String) -> Result<FollowUp, ParleyError> {
    let pack_id = parse_id(&id)?;
    let Some(offer) = services.storage.pack_offer(ctx.user(), pack_id).await? else {
        return Ok(FollowUp::RefreshMenu);
    };
    if offer.unlocked() {
        ctx.set_var(PACK_VAR, &id).await?;
        return Ok(FollowUp::Show(MenuName::new(EXERCISES_MENU)));
    }
    let invoice = invoice_for(&offer.pack, &services.catalog.currency);
    ctx.transport().send_invoice(ctx.user(), &invoice).await?;
    info!(user_id = %ctx.user(), pack = pack_id, amount = invoice.amount, "invoice sent");
    Ok(FollowUp::None)
}

/// Replays an exercise, protected from forwarding, if its pack is unlocked.
async fn play_exercise(services: Services, ctx: DialogContext, id: String) -> Result<FollowUp, ParleyError> {
    let storage = &services.storage;
    let Some(exercise) = storage.get_exercise(parse_id(&id)?).await? else {
        return Ok(FollowUp::RefreshMenu);
    };
    let unlocked = storage
        .pack_offer(ctx.user(), exercise.pack_id)
        .await?
        .is_some_and(|offer| offer.unlocked());
    if !unlocked {
        warn!(user_id = %ctx.user(), exercise = exercise.id, "exercise of a locked pack requested");
        return Ok(FollowUp::Show(packs_menu()));
    }
    for part in storage.exercise_parts(exercise.id).await? {
        ctx.send(part.to_content().protected()).await?;
    }
    Ok(FollowUp::None)
}

pub fn register(engine: &mut DialogEngine, services: &Services) -> Result<(), ParleyError> {
    let fetch = services.clone();
    let select = services.clone();
    engine.register_menu(
        MenuDefinition::new(PACKS_MENU)
            .header("Exercise packs. Tap one to open it.")
            .max_per_row(1)
            .dynamic(move |ctx| {
                let services = fetch.clone();
                async move {
                    let currency = services.catalog.currency.clone();
                    let offers = services.storage.pack_offers(ctx.user()).await?;
                    Ok(offers
                        .iter()
                        .map(|offer| (offer.pack.id.to_string(), offer_label(offer, &currency)))
                        .collect())
                }
            })
            .on_select(move |ctx, id| select_pack(select.clone(), ctx, id))
            .button(ButtonTemplate::new(
                "close",
                "✖ Close",
                ClickAction::callback(|_| async { Ok(cancel_follow_up()) }),
            ))
            .empty_notice("No exercises here yet. New ones are on the way!"),
    )?;

    let fetch = services.clone();
    let select = services.clone();
    engine.register_menu(
        MenuDefinition::new(EXERCISES_MENU)
            .header("Pick an exercise.")
            .max_per_row(1)
            .dynamic(move |ctx| {
                let services = fetch.clone();
                async move {
                    let Some(pack) = selected_pack(&ctx).await? else {
                        return Err(ParleyError::NoButtonsAvailable);
                    };
                    let unlocked = services
                        .storage
                        .pack_offer(ctx.user(), pack)
                        .await?
                        .is_some_and(|offer| offer.unlocked());
                    if !unlocked {
                        return Err(ParleyError::NoButtonsAvailable);
                    }
                    let exercises = services.storage.list_exercises(pack).await?;
                    Ok(exercises
                        .into_iter()
                        .map(|e| (e.id.to_string(), format!("🎵 {}", e.name)))
                        .collect())
                }
            })
            .on_select(move |ctx, id| play_exercise(select.clone(), ctx, id))
            .button(ButtonTemplate::new(
                "back",
                "⬅ All packs",
                ClickAction::callback(|_| async { Ok(FollowUp::Show(packs_menu())) }),
            ))
            .empty_notice("This pack is empty."),
    )
}

/// Answers a pre-checkout query: the payload must name an existing pack and
/// the total must match its current price.
pub async fn handle_checkout(
    services: &Services,
    transport: &Arc<dyn Transport>,
    event: &InboundEvent,
) -> Result<(), ParleyError> {
    let InboundKind::Checkout {
        checkout_id,
        payload,
        total,
        currency,
    } = &event.kind
    else {
        return Ok(());
    };
    let user = event.user_id;

    let Some(pack_id) = parse_payload(payload) else {
        warn!(user_id = %user, %checkout_id, %payload, "checkout with unknown payload");
        return transport.answer_checkout(checkout_id, Some(PAYMENT_DECLINED)).await;
    };
    let Some(pack) = services.storage.get_pack(pack_id).await? else {
        warn!(user_id = %user, %checkout_id, pack = pack_id, "checkout for a missing pack");
        return transport.answer_checkout(checkout_id, Some(PAYMENT_DECLINED)).await;
    };
    let expected = invoice_for(&pack, &services.catalog.currency);
    if *total != expected.amount || *currency != expected.currency {
        warn!(
            user_id = %user,
            %checkout_id,
            pack = pack_id,
            expected = expected.amount,
            total = *total,
            %currency,
            "checkout total does not match the pack price"
        );
        return transport.answer_checkout(checkout_id, Some(PAYMENT_DECLINED)).await;
    }

    let purchase = Purchase {
        user_id: user,
        pack_id,
        checkout_id: checkout_id.clone(),
        paid: format!("{total}{currency}"),
    };
    if let Err(e) = services.storage.record_purchase(&purchase).await {
        if let Err(answer_err) = transport.answer_checkout(checkout_id, Some(PAYMENT_DECLINED)).await {
            warn!(user_id = %user, error = %answer_err, "failed to decline checkout");
        }
        return Err(e);
    }
    transport.answer_checkout(checkout_id, None).await?;
    info!(user_id = %user, pack = pack_id, paid = %purchase.paid, "pack purchased");
    transport
        .send(
            user,
            Content::text(format!(
                "The pack '{}' is yours! Find it under /exercises.",
                pack.name
            )),
        )
        .await
        .map(drop)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(price: u32) -> Pack {
        Pack {
            id: 4,
            name: "Morning".into(),
            price,
        }
    }

    #[test]
    fn labels_reflect_ownership_and_price() {
        let offer = |price, purchased| PackOffer {
            pack: pack(price),
            purchased,
        };
        assert_eq!(offer_label(&offer(5, false), "EUR"), "Morning · 5 EUR");
        assert_eq!(offer_label(&offer(5, true), "EUR"), "✅ Morning");
        assert_eq!(offer_label(&offer(0, false), "EUR"), "🎁 Morning");
    }

    #[test]
    fn invoices_charge_cents_and_name_the_pack() {
        let invoice = invoice_for(&pack(5), "EUR");
        assert_eq!(invoice.amount, 500);
        assert_eq!(invoice.payload, "pack:4");
        assert_eq!(parse_payload(&invoice.payload), Some(4));
    }

    #[test]
    fn foreign_payloads_are_rejected() {
        assert_eq!(parse_payload("donation:4"), None);
        assert_eq!(parse_payload("pack:four"), None);
        assert_eq!(parse_payload("pack"), None);
    }
}
