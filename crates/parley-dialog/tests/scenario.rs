// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end dialog and menu behavior against in-memory doubles.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parley_core::{InboundEvent, MenuName, MessageId, ParleyError, StateName, StateStore, UserId};
use parley_dialog::{
    ButtonTemplate, ButtonText, ClickAction, ClickOutcome, DataMap, DialogEngine, DialogState,
    FollowUp, MenuDefinition, MutatorOutcome, UpdateOutcome,
};
use parley_test_utils::{MemoryStateStore, MockChannel};

fn setup() -> (DialogEngine, Arc<MemoryStateStore>, Arc<MockChannel>) {
    let store = Arc::new(MemoryStateStore::new());
    let channel = Arc::new(MockChannel::new());
    let engine = DialogEngine::new(store.clone(), channel.clone());
    (engine, store, channel)
}

fn text(user: i64, s: &str) -> InboundEvent {
    InboundEvent::text(UserId(user), s)
}

fn survey() -> Vec<DialogState> {
    vec![
        DialogState::new("Ask-Name")
            .on_trigger("What's your name?")
            .validator(|ctx| match ctx.text() {
                Some(name) if !name.is_empty() => None,
                _ => Some("Please tell me your name.".to_string()),
            })
            .mutator(|ctx| async move {
                let name = ctx.text().unwrap_or_default().to_string();
                ctx.set_var("Name", &name).await.into()
            }),
        DialogState::new("Ask-Age")
            .on_trigger("How old are you?")
            .validator(|ctx| match ctx.text().and_then(|t| t.parse::<u32>().ok()) {
                Some(age) if (1..=150).contains(&age) => None,
                _ => Some("Age must be between 1 and 150.".to_string()),
            })
            .mutator(|ctx| async move {
                let age = ctx.text().unwrap_or_default().to_string();
                ctx.set_var("Age", &age).await.into()
            })
            .on_success("Thanks!")
            .keep_vars_on_exit(),
    ]
}

#[tokio::test]
async fn survey_scenario() {
    let (mut engine, store, channel) = setup();
    engine.register_chain(survey()).unwrap();
    let user = UserId(42);

    engine
        .trigger(user, &StateName::new("Ask-Name"), None)
        .await
        .unwrap();
    assert_eq!(
        engine.current_state(user).await.unwrap(),
        Some(StateName::new("Ask-Name"))
    );

    // Empty name is rejected and the state stays.
    let outcome = engine.update(&text(42, "")).await.unwrap();
    assert_eq!(outcome, UpdateOutcome::Rejected);
    assert_eq!(
        channel.last_sent().await.unwrap().content.text,
        "Please tell me your name."
    );
    assert_eq!(
        engine.current_state(user).await.unwrap(),
        Some(StateName::new("Ask-Name"))
    );

    let outcome = engine.update(&text(42, "Alice")).await.unwrap();
    assert_eq!(outcome, UpdateOutcome::Advanced(StateName::new("Ask-Age")));
    assert_eq!(engine.get_var(user, "Name").await.unwrap().as_deref(), Some("Alice"));
    assert_eq!(channel.last_sent().await.unwrap().content.text, "How old are you?");

    let outcome = engine.update(&text(42, "999")).await.unwrap();
    assert_eq!(outcome, UpdateOutcome::Rejected);
    assert_eq!(
        engine.current_state(user).await.unwrap(),
        Some(StateName::new("Ask-Age"))
    );

    let outcome = engine.update(&text(42, "30")).await.unwrap();
    assert_eq!(outcome, UpdateOutcome::Completed);
    assert_eq!(engine.current_state(user).await.unwrap(), None);
    assert_eq!(engine.get_var(user, "Age").await.unwrap().as_deref(), Some("30"));
    assert_eq!(store.get_var(user, "Name").await.unwrap().as_deref(), Some("Alice"));
    assert_eq!(channel.last_sent().await.unwrap().content.text, "Thanks!");
}

#[tokio::test]
async fn idle_update_is_a_no_op() {
    let (mut engine, store, channel) = setup();
    engine.register_chain(survey()).unwrap();
    for user in [1, 42, -7, i64::MAX] {
        let outcome = engine.update(&text(user, "hello")).await.unwrap();
        assert_eq!(outcome, UpdateOutcome::Idle);
    }
    assert_eq!(store.write_count(), 0);
    assert_eq!(channel.sent_count().await, 0);
}

#[tokio::test]
async fn validation_rejection_sends_exactly_the_message() {
    let (mut engine, _store, channel) = setup();
    engine
        .register_one_shot(
            DialogState::new("Pick")
                .validator(|ctx| (ctx.text() == Some("x")).then(|| "not x".to_string()))
                .mutator(|_| async { MutatorOutcome::Success }),
        )
        .unwrap();
    engine
        .trigger(UserId(1), &StateName::new("Pick"), None)
        .await
        .unwrap();
    channel.clear().await;

    assert_eq!(engine.update(&text(1, "x")).await.unwrap(), UpdateOutcome::Rejected);
    assert_eq!(channel.texts_to(UserId(1)).await, vec!["not x".to_string()]);
    assert_eq!(
        engine.current_state(UserId(1)).await.unwrap(),
        Some(StateName::new("Pick"))
    );

    assert_eq!(engine.update(&text(1, "y")).await.unwrap(), UpdateOutcome::Completed);
}

#[tokio::test]
async fn continue_keeps_collecting_until_success() {
    let (mut engine, store, _channel) = setup();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    engine
        .register_chain(vec![
            DialogState::new("Collect").mutator(move |ctx| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    if ctx.text() == Some("STOP") {
                        return MutatorOutcome::Success;
                    }
                    MutatorOutcome::Continue
                }
            }),
            DialogState::new("After").on_trigger("collected"),
        ])
        .unwrap();

    let user = UserId(9);
    engine
        .trigger(user, &StateName::new("Collect"), None)
        .await
        .unwrap();
    for i in 0..4 {
        let outcome = engine.update(&text(9, &format!("msg {i}"))).await.unwrap();
        assert_eq!(outcome, UpdateOutcome::Continued);
        assert_eq!(
            store.get_state(user).await.unwrap(),
            Some(StateName::new("Collect"))
        );
    }
    let outcome = engine.update(&text(9, "STOP")).await.unwrap();
    assert_eq!(outcome, UpdateOutcome::Advanced(StateName::new("After")));
    assert_eq!(calls.load(Ordering::SeqCst), 5);
    // "After" is passive, so it completed on entry.
    assert_eq!(store.get_state(user).await.unwrap(), None);
}

#[tokio::test]
async fn chain_of_three_reaches_idle() {
    let (mut engine, _store, _channel) = setup();
    let step = |n: &str| DialogState::new(n).mutator(|_| async { MutatorOutcome::Success });
    engine
        .register_chain(vec![step("A"), step("B"), step("C")])
        .unwrap();
    let user = UserId(3);
    engine.trigger(user, &StateName::new("A"), None).await.unwrap();

    assert_eq!(
        engine.update(&text(3, "1")).await.unwrap(),
        UpdateOutcome::Advanced(StateName::new("B"))
    );
    assert_eq!(
        engine.update(&text(3, "2")).await.unwrap(),
        UpdateOutcome::Advanced(StateName::new("C"))
    );
    assert_eq!(engine.update(&text(3, "3")).await.unwrap(), UpdateOutcome::Completed);
    assert_eq!(engine.current_state(user).await.unwrap(), None);
}

#[tokio::test]
async fn reset_clears_variables_unless_kept() {
    let (engine, store, _channel) = setup();
    let user = UserId(6);
    store.set_var(user, "k", "v").await.unwrap();
    engine.reset(user, true).await.unwrap();
    assert_eq!(
        store.get_all_vars(user).await.unwrap().get("k").map(String::as_str),
        Some("v")
    );

    engine.reset(user, false).await.unwrap();
    assert!(store.get_all_vars(user).await.unwrap().is_empty());
    // Idempotent.
    engine.reset(user, false).await.unwrap();
    assert_eq!(engine.current_state(user).await.unwrap(), None);
}

fn settings_menu() -> MenuDefinition {
    MenuDefinition::new("Settings")
        .header("Your settings")
        .max_per_row(1)
        .data(|ctx| async move {
            let mut data = DataMap::new();
            if let Some(city) = ctx.get_var("city").await? {
                data.insert("city".into(), city);
            }
            Ok::<_, ParleyError>(data)
        })
        .button(ButtonTemplate::new(
            "city",
            ButtonText::dynamic(|_, data| {
                Ok(format!(
                    "City: {}",
                    data.get("city").map(String::as_str).unwrap_or("unset")
                ))
            }),
            ClickAction::goto("Edit-City"),
        ))
        .button(ButtonTemplate::new(
            "close",
            "Close",
            ClickAction::callback(|_| async {
                Ok(FollowUp::Reset {
                    keep_vars: true,
                    notice: Some("Closed.".into()),
                })
            }),
        ))
}

fn edit_city() -> DialogState {
    DialogState::new("Edit-City")
        .on_trigger("Which city?")
        .mutator(|ctx| async move {
            let city = ctx.text().unwrap_or_default().to_string();
            ctx.set_var("city", &city).await.into()
        })
        .keep_vars_on_exit()
}

#[tokio::test]
async fn state_entered_from_menu_refreshes_it_on_completion() {
    let (mut engine, store, channel) = setup();
    engine.register_menu(settings_menu()).unwrap();
    engine.register_one_shot(edit_city()).unwrap();
    engine.validate().unwrap();

    let user = UserId(11);
    let menu = MenuName::new("Settings");
    let menu_msg = engine.menus().show(user, &menu).await.unwrap().unwrap();
    assert_eq!(
        channel.last_sent().await.unwrap().inline_rows(),
        vec![vec!["City: unset".to_string()], vec!["Close".to_string()]]
    );

    let click = InboundEvent::click(user, Some(menu_msg.clone()), "city|Settings", "cb-1");
    let outcome = engine.handle_click(&click).await.unwrap();
    assert_eq!(outcome, ClickOutcome::Triggered(StateName::new("Edit-City")));
    assert_eq!(store.get_return_menu(user).await.unwrap(), Some(menu.clone()));
    assert_eq!(channel.answered_clicks().await.len(), 1);

    let outcome = engine.update(&text(11, "Oslo")).await.unwrap();
    assert_eq!(outcome, UpdateOutcome::Completed);

    let edits = channel.edits().await;
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].message, menu_msg);
    let content = channel.content_of(&menu_msg).await.unwrap();
    assert_eq!(
        content.keyboard,
        settings_rendered("City: Oslo"),
    );
    assert_eq!(store.get_return_menu(user).await.unwrap(), None);
}

fn settings_rendered(city: &str) -> Option<parley_core::Keyboard> {
    use parley_core::{InlineButton, Keyboard};
    Some(Keyboard::Inline(vec![
        vec![InlineButton {
            text: city.to_string(),
            payload: "city|Settings".to_string(),
        }],
        vec![InlineButton {
            text: "Close".to_string(),
            payload: "close|Settings".to_string(),
        }],
    ]))
}

#[tokio::test]
async fn trigger_menu_from_menu_keeps_tracked_message() {
    let (mut engine, store, channel) = setup();
    engine.register_menu(settings_menu()).unwrap();
    engine
        .register_menu(MenuDefinition::new("Hints").header("Hints").button(
            ButtonTemplate::new("ok", "OK", ClickAction::callback(|_| async { Ok(FollowUp::None) })),
        ))
        .unwrap();
    engine
        .register_one_shot(
            DialogState::new("Open-Hints")
                .on_trigger("Some hints:")
                .on_trigger_menu("Hints")
                .mutator(|_| async { MutatorOutcome::Success }),
        )
        .unwrap();
    engine.validate().unwrap();

    let user = UserId(12);
    let menu_msg = MessageId("500".into());
    store.set_tracked_message_id(user, &menu_msg).await.unwrap();

    engine
        .trigger(user, &StateName::new("Open-Hints"), Some(&MenuName::new("Settings")))
        .await
        .unwrap();
    assert_eq!(channel.sent_count().await, 2);
    assert_eq!(
        store.get_tracked_message_id(user).await.unwrap(),
        Some(menu_msg.clone())
    );

    // Entered directly, the sibling menu becomes the tracked message.
    engine
        .trigger(user, &StateName::new("Open-Hints"), None)
        .await
        .unwrap();
    let tracked = store.get_tracked_message_id(user).await.unwrap().unwrap();
    assert_ne!(tracked, menu_msg);
    assert_eq!(channel.last_sent().await.unwrap().id, tracked);
}

#[tokio::test]
async fn callback_follow_up_resets_with_notice() {
    let (mut engine, store, channel) = setup();
    engine.register_menu(settings_menu()).unwrap();
    engine.register_one_shot(edit_city()).unwrap();
    let user = UserId(13);
    engine
        .trigger(user, &StateName::new("Edit-City"), None)
        .await
        .unwrap();

    let click = InboundEvent::click(user, Some(MessageId("77".into())), "close|Settings", "cb-9");
    assert_eq!(engine.handle_click(&click).await.unwrap(), ClickOutcome::Handled);
    assert_eq!(engine.current_state(user).await.unwrap(), None);
    assert_eq!(channel.last_sent().await.unwrap().content.text, "Closed.");
    // The clicked message became the tracked one.
    assert_eq!(
        store.get_tracked_message_id(user).await.unwrap(),
        Some(MessageId("77".into()))
    );
}

#[tokio::test]
async fn dynamic_menu_selection_routes_to_handler() {
    let (mut engine, _store, channel) = setup();
    let items = Arc::new(tokio::sync::Mutex::new(vec![
        ("1".to_string(), "First".to_string()),
        ("2".to_string(), "Second".to_string()),
    ]));
    let source = items.clone();
    let sink = items.clone();
    engine
        .register_menu(
            MenuDefinition::new("Pool")
                .header("Pool")
                .max_per_row(1)
                .dynamic(move |_| {
                    let source = source.clone();
                    async move { Ok(source.lock().await.clone()) }
                })
                .on_select(move |_, id| {
                    let sink = sink.clone();
                    async move {
                        sink.lock().await.retain(|(item, _)| *item != id);
                        Ok(FollowUp::RefreshMenu)
                    }
                })
                .empty_notice("Pool is empty."),
        )
        .unwrap();

    let user = UserId(20);
    let pool = MenuName::new("Pool");
    let msg = engine.menus().show(user, &pool).await.unwrap().unwrap();

    let click = InboundEvent::click(user, Some(msg.clone()), "1|Pool", "cb");
    assert_eq!(
        engine.handle_click(&click).await.unwrap(),
        ClickOutcome::Selected("1".to_string())
    );
    assert_eq!(
        channel.content_of(&msg).await.unwrap().keyboard,
        Some(parley_core::Keyboard::Inline(vec![vec![parley_core::InlineButton {
            text: "Second".into(),
            payload: "2|Pool".into(),
        }]]))
    );

    let click = InboundEvent::click(user, Some(msg.clone()), "2|Pool", "cb");
    engine.handle_click(&click).await.unwrap();
    let content = channel.content_of(&msg).await.unwrap();
    assert_eq!(content.text, "Pool is empty.");
    assert_eq!(content.keyboard, None);
}

#[tokio::test]
async fn menu_refresh_without_tracked_message_is_not_fatal() {
    let (mut engine, _store, channel) = setup();
    engine.register_menu(settings_menu()).unwrap();
    engine.register_one_shot(edit_city()).unwrap();
    let user = UserId(14);

    // Bound to a menu that was never shown to this user.
    engine
        .trigger(user, &StateName::new("Edit-City"), Some(&MenuName::new("Settings")))
        .await
        .unwrap();
    let outcome = engine.update(&text(14, "Rome")).await.unwrap();
    assert_eq!(outcome, UpdateOutcome::Completed);
    assert!(channel.edits().await.is_empty());
}

#[tokio::test]
async fn lost_success_notice_does_not_rerun_the_mutator() {
    let (mut engine, store, channel) = setup();
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    engine
        .register_one_shot(
            DialogState::new("Pay")
                .mutator(move |_| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        MutatorOutcome::Success
                    }
                })
                .on_success("Paid"),
        )
        .unwrap();
    let user = UserId(15);
    engine.trigger(user, &StateName::new("Pay"), None).await.unwrap();

    channel.set_fail_sends(true);
    let outcome = engine.update(&text(15, "yes")).await.unwrap();
    channel.set_fail_sends(false);

    assert_eq!(outcome, UpdateOutcome::Completed);
    assert_eq!(store.get_state(user).await.unwrap(), None);
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    // A repeated message finds no dialog to feed.
    assert_eq!(engine.update(&text(15, "yes")).await.unwrap(), UpdateOutcome::Idle);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn lost_prompt_still_enters_the_state() {
    let (mut engine, store, channel) = setup();
    engine.register_chain(survey()).unwrap();
    let user = UserId(16);

    channel.set_fail_sends(true);
    engine
        .trigger(user, &StateName::new("Ask-Name"), None)
        .await
        .unwrap();
    channel.set_fail_sends(false);

    assert_eq!(
        store.get_state(user).await.unwrap(),
        Some(StateName::new("Ask-Name"))
    );
    assert_eq!(channel.sent_count().await, 0);
}
