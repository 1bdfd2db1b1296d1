// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The dialog state machine.
//!
//! The engine keeps only templates in memory. A user's current state, their
//! variable bag, the tracked menu message and the return-to menu all live in
//! the [`StateStore`], so any worker can continue any dialog.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, error, info, warn};

use parley_core::recording;
use parley_core::{
    Content, InboundEvent, InboundKind, MenuName, ParleyError, StateName, StateStore, Transport,
    UserId,
};

use crate::callback;
use crate::context::DialogContext;
use crate::menu::{ClickAction, ClickTarget, FollowUp, MenuDefinition, MenuRegistry};
use crate::state::{DialogState, MutatorOutcome};

pub const DEFAULT_APOLOGY: &str = "Sorry, something went wrong. Please try again later.";

/// Toast shown when a clicked button no longer exists.
pub const STALE_CLICK_NOTICE: &str = "This menu is out of date.";

/// What [`DialogEngine::update`] did with an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The user is not in a dialog (or was in an unregistered one).
    Idle,
    /// The validator rejected the input; the state is unchanged.
    Rejected,
    /// The mutator asked for more input; the state is unchanged.
    Continued,
    /// The mutator failed; the user got an apology and the dialog was reset.
    Failed,
    /// The step succeeded and the next state was entered.
    Advanced(StateName),
    /// The step succeeded and it was the last one.
    Completed,
}

/// What [`DialogEngine::handle_click`] did with a click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The event was not a click.
    NotAClick,
    /// A state-transition button entered this state.
    Triggered(StateName),
    /// A callback button ran.
    Handled,
    /// A fetched button of a dynamic menu was selected.
    Selected(String),
    /// The payload did not resolve to a registered button.
    Stale,
}

/// Registry of dialog states and menus plus the handles to drive them.
///
/// Register everything with `&mut self` at startup, then share the engine
/// behind an `Arc`.
pub struct DialogEngine {
    states: HashMap<StateName, Arc<DialogState>>,
    menus: MenuRegistry,
    store: Arc<dyn StateStore>,
    transport: Arc<dyn Transport>,
    apology: Content,
}

impl DialogEngine {
    pub fn new(store: Arc<dyn StateStore>, transport: Arc<dyn Transport>) -> Self {
        Self {
            states: HashMap::new(),
            menus: MenuRegistry::new(store.clone(), transport.clone()),
            store,
            transport,
            apology: Content::text(DEFAULT_APOLOGY),
        }
    }

    /// Message sent when a mutator fails.
    pub fn with_apology(mut self, apology: impl Into<Content>) -> Self {
        self.apology = apology.into();
        self
    }

    /// Registers states whose `next` pointers follow list order.
    ///
    /// Nothing is registered if any name is already taken or repeated.
    pub fn register_chain(&mut self, states: Vec<DialogState>) -> Result<(), ParleyError> {
        if states.is_empty() {
            return Err(ParleyError::EmptyChain);
        }
        let mut names = std::collections::HashSet::new();
        for state in &states {
            if self.states.contains_key(&state.name) || !names.insert(state.name.clone()) {
                return Err(ParleyError::DuplicateState(state.name.clone()));
            }
        }

        let following: Vec<Option<StateName>> = states
            .iter()
            .skip(1)
            .map(|s| Some(s.name.clone()))
            .chain(std::iter::once(None))
            .collect();
        for (mut state, next) in states.into_iter().zip(following) {
            state.next = next;
            debug!(state = %state.name, next = ?state.next, "dialog state registered");
            self.states.insert(state.name.clone(), Arc::new(state));
        }
        Ok(())
    }

    /// Registers a terminal state.
    pub fn register_one_shot(&mut self, mut state: DialogState) -> Result<(), ParleyError> {
        if self.states.contains_key(&state.name) {
            return Err(ParleyError::DuplicateState(state.name.clone()));
        }
        state.next = None;
        debug!(state = %state.name, "one-shot dialog state registered");
        self.states.insert(state.name.clone(), Arc::new(state));
        Ok(())
    }

    pub fn register_menu(&mut self, menu: MenuDefinition) -> Result<(), ParleyError> {
        self.menus.register(menu)
    }

    /// Checks that every state and menu referenced by a registration exists.
    pub fn validate(&self) -> Result<(), ParleyError> {
        for state in self.states.values() {
            if let Some(menu) = state.trigger_menu().filter(|m| !self.menus.contains(m)) {
                return Err(ParleyError::UnknownMenu(menu.clone()));
            }
        }
        for menu in self.menus.menus() {
            if let Some(target) = menu.goto_targets().find(|s| !self.states.contains_key(*s)) {
                return Err(ParleyError::UnknownState(target.clone()));
            }
        }
        info!(states = self.states.len(), "dialog registry validated");
        Ok(())
    }

    /// Message sent to a user whose request failed.
    pub fn apology(&self) -> &Content {
        &self.apology
    }

    pub fn state(&self, name: &StateName) -> Option<&DialogState> {
        self.states.get(name).map(AsRef::as_ref)
    }

    pub fn menus(&self) -> &MenuRegistry {
        &self.menus
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn context(&self, user: UserId, event: Option<InboundEvent>) -> DialogContext {
        DialogContext::new(user, event, self.store.clone(), self.transport.clone())
    }

    pub async fn current_state(&self, user: UserId) -> Result<Option<StateName>, ParleyError> {
        self.store.get_state(user).await
    }

    pub async fn get_var(&self, user: UserId, key: &str) -> Result<Option<String>, ParleyError> {
        self.store.get_var(user, key).await
    }

    pub async fn set_var(&self, user: UserId, key: &str, value: &str) -> Result<(), ParleyError> {
        self.store.set_var(user, key, value).await
    }

    /// Enters `state` for `user` and sends its trigger content.
    ///
    /// `by_menu` is the menu the user clicked to get here; it is refreshed
    /// when the dialog step completes. States without validator and mutator
    /// complete immediately.
    pub async fn trigger(
        &self,
        user: UserId,
        state: &StateName,
        by_menu: Option<&MenuName>,
    ) -> Result<(), ParleyError> {
        self.trigger_boxed(user, state.clone(), by_menu.cloned()).await
    }

    fn trigger_boxed(
        &self,
        user: UserId,
        name: StateName,
        by_menu: Option<MenuName>,
    ) -> BoxFuture<'_, Result<(), ParleyError>> {
        async move {
            let Some(state) = self.states.get(&name).cloned() else {
                warn!(user_id = %user, state = %name, "trigger of unregistered dialog state");
                return Err(ParleyError::UnknownState(name));
            };

            self.store.set_state(user, Some(&name)).await?;
            self.store.set_return_menu(user, by_menu.as_ref()).await?;
            recording::record_transition(name.as_str());
            debug!(user_id = %user, state = %name, by_menu = ?by_menu, "dialog state entered");

            let ctx = self.context(user, None);
            if let Some(content) = &state.on_trigger {
                if let Err(e) = ctx.send(content.clone()).await {
                    warn!(user_id = %user, state = %name, error = %e, "failed to send state prompt");
                }
            }
            if let Some(menu) = &state.on_trigger_menu {
                // Entered from a menu: that menu's message stays the tracked one.
                if by_menu.is_some() {
                    self.menus.send_untracked(user, menu).await?;
                } else {
                    self.menus.show(user, menu).await?;
                }
            }

            if state.is_passive() {
                self.finish(&ctx, &state).await?;
            }
            Ok(())
        }
        .boxed()
    }

    /// Feeds an inbound event to the user's current state.
    pub async fn update(&self, event: &InboundEvent) -> Result<UpdateOutcome, ParleyError> {
        let user = event.user_id;
        let Some(name) = self.store.get_state(user).await? else {
            return Ok(UpdateOutcome::Idle);
        };
        let Some(state) = self.states.get(&name).cloned() else {
            let err = ParleyError::CorruptedState {
                user,
                state: name,
            };
            warn!(user_id = %user, error = %err, "clearing unregistered dialog state");
            self.store.set_state(user, None).await?;
            return Ok(UpdateOutcome::Idle);
        };

        let ctx = self.context(user, Some(event.clone()));

        let rejection = state
            .validator
            .as_ref()
            .and_then(|validator| validator(&ctx))
            .filter(|m| !m.is_empty());
        if let Some(rejection) = rejection {
            debug!(user_id = %user, state = %name, "input rejected");
            if let Err(e) = ctx.send(rejection).await {
                warn!(user_id = %user, state = %name, error = %e, "failed to send rejection");
            }
            return Ok(UpdateOutcome::Rejected);
        }

        if let Some(mutator) = &state.mutator {
            match mutator(ctx.clone()).await {
                MutatorOutcome::Success => {}
                MutatorOutcome::Continue => {
                    debug!(user_id = %user, state = %name, "dialog waiting for more input");
                    return Ok(UpdateOutcome::Continued);
                }
                MutatorOutcome::Failure(e) => {
                    error!(user_id = %user, state = %name, error = %e, "dialog step failed");
                    recording::record_dialog_failure(name.as_str());
                    let apology = self
                        .apology
                        .clone()
                        .or_keyboard(state.exit_keyboard.as_ref());
                    if let Err(send_err) = ctx.send(apology).await {
                        warn!(user_id = %user, error = %send_err, "failed to send apology");
                    }
                    self.reset(user, state.keep_vars_on_exit).await?;
                    return Ok(UpdateOutcome::Failed);
                }
            }
        }

        self.finish(&ctx, &state).await
    }

    /// Menu refresh, success notice, then advance or reset.
    async fn finish(
        &self,
        ctx: &DialogContext,
        state: &DialogState,
    ) -> Result<UpdateOutcome, ParleyError> {
        let user = ctx.user();
        let return_menu = self.store.get_return_menu(user).await?;
        if let Some(menu) = &return_menu {
            if let Err(e) = self.menus.update(user, menu).await {
                warn!(user_id = %user, menu = %menu, error = %e, "return menu not refreshed");
            }
        }

        // The mutator has committed by now; a lost notice must not stall the dialog.
        if let Some(success) = &state.on_success {
            let notice = success.clone().or_keyboard(state.exit_keyboard.as_ref());
            if let Err(e) = ctx.send(notice).await {
                warn!(user_id = %user, state = %state.name, error = %e, "failed to send success notice");
            }
        }

        match &state.next {
            Some(next) if should_retrigger(Some(&state.name), next) => {
                self.trigger_boxed(user, next.clone(), return_menu).await?;
                Ok(UpdateOutcome::Advanced(next.clone()))
            }
            Some(_) => Ok(UpdateOutcome::Continued),
            None => {
                self.reset(user, state.keep_vars_on_exit).await?;
                debug!(user_id = %user, state = %state.name, "dialog completed");
                Ok(UpdateOutcome::Completed)
            }
        }
    }

    /// Leaves any dialog. Variables are cleared unless `keep_vars`.
    pub async fn reset(&self, user: UserId, keep_vars: bool) -> Result<(), ParleyError> {
        self.store.set_state(user, None).await?;
        self.store.set_return_menu(user, None).await?;
        if !keep_vars {
            self.store.clear_vars(user).await?;
        }
        Ok(())
    }

    /// Routes an inline button click and acknowledges it on the transport.
    pub async fn handle_click(&self, event: &InboundEvent) -> Result<ClickOutcome, ParleyError> {
        let InboundKind::Click {
            payload,
            callback_id,
        } = &event.kind
        else {
            return Ok(ClickOutcome::NotAClick);
        };

        let result = self.route_click(event, payload).await;
        let notice = matches!(result, Ok(ClickOutcome::Stale)).then_some(STALE_CLICK_NOTICE);
        if let Err(e) = self.transport.answer_click(callback_id, notice).await {
            warn!(user_id = %event.user_id, error = %e, "failed to acknowledge click");
        }
        result
    }

    async fn route_click(
        &self,
        event: &InboundEvent,
        payload: &str,
    ) -> Result<ClickOutcome, ParleyError> {
        let user = event.user_id;
        let Some((button_id, menu_name)) = callback::decode(payload) else {
            warn!(user_id = %user, payload, "malformed click payload");
            return Ok(ClickOutcome::Stale);
        };
        let Ok(menu) = self.menus.get(&menu_name) else {
            warn!(user_id = %user, menu = %menu_name, "click on unregistered menu");
            return Ok(ClickOutcome::Stale);
        };
        let Some(target) = menu.click_target(button_id) else {
            warn!(user_id = %user, menu = %menu_name, button = button_id, "click on unknown button");
            return Ok(ClickOutcome::Stale);
        };

        // The clicked message is the live copy of this menu.
        if let Some(message) = &event.message_id {
            self.store.set_tracked_message_id(user, message).await?;
        }

        let ctx = self.context(user, Some(event.clone()));
        match target {
            ClickTarget::Action(ClickAction::GotoState(state)) => {
                self.trigger(user, &state, Some(&menu_name)).await?;
                Ok(ClickOutcome::Triggered(state))
            }
            ClickTarget::Action(ClickAction::Callback(handler)) => {
                let follow_up = handler(ctx).await?;
                self.apply_follow_up(user, &menu_name, follow_up).await?;
                Ok(ClickOutcome::Handled)
            }
            ClickTarget::Select(handler, id) => {
                let follow_up = handler(ctx, id.clone()).await?;
                self.apply_follow_up(user, &menu_name, follow_up).await?;
                Ok(ClickOutcome::Selected(id))
            }
        }
    }

    async fn apply_follow_up(
        &self,
        user: UserId,
        menu: &MenuName,
        follow_up: FollowUp,
    ) -> Result<(), ParleyError> {
        match follow_up {
            FollowUp::None => {}
            FollowUp::RefreshMenu => {
                if let Err(e) = self.menus.update(user, menu).await {
                    warn!(user_id = %user, menu = %menu, error = %e, "menu not refreshed");
                }
            }
            FollowUp::Trigger(state) => {
                let current = self.store.get_state(user).await?;
                if should_retrigger(current.as_ref(), &state) {
                    self.trigger(user, &state, Some(menu)).await?;
                }
            }
            FollowUp::Show(other) => {
                self.menus.show(user, &other).await?;
            }
            FollowUp::Reset { keep_vars, notice } => {
                self.reset(user, keep_vars).await?;
                if let Some(notice) = notice {
                    self.transport.send(user, notice).await?;
                }
            }
        }
        Ok(())
    }
}

/// A transition re-enters a state only when it differs from the current one.
fn should_retrigger(current: Option<&StateName>, target: &StateName) -> bool {
    current != Some(target)
}

impl fmt::Debug for DialogEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&StateName> = self.states.keys().collect();
        names.sort();
        f.debug_struct("DialogEngine")
            .field("states", &names)
            .field("menus", &self.menus)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_test_utils::{MemoryStateStore, MockChannel};

    fn engine() -> (DialogEngine, Arc<MemoryStateStore>, Arc<MockChannel>) {
        let store = Arc::new(MemoryStateStore::new());
        let channel = Arc::new(MockChannel::new());
        (
            DialogEngine::new(store.clone(), channel.clone()),
            store,
            channel,
        )
    }

    fn step(name: &str) -> DialogState {
        DialogState::new(name)
            .on_trigger(format!("{name}?"))
            .mutator(|_| async { MutatorOutcome::Success })
    }

    #[test]
    fn chain_wires_next_pointers() {
        let (mut engine, _, _) = engine();
        engine
            .register_chain(vec![step("A"), step("B"), step("C")])
            .unwrap();
        let next = |n: &str| engine.state(&StateName::new(n)).unwrap().next().cloned();
        assert_eq!(next("A"), Some(StateName::new("B")));
        assert_eq!(next("B"), Some(StateName::new("C")));
        assert_eq!(next("C"), None);
    }

    #[test]
    fn empty_chain_is_rejected() {
        let (mut engine, _, _) = engine();
        assert!(matches!(
            engine.register_chain(Vec::new()),
            Err(ParleyError::EmptyChain)
        ));
    }

    #[test]
    fn duplicates_leave_registry_untouched() {
        let (mut engine, _, _) = engine();
        engine
            .register_one_shot(DialogState::new("A").on_trigger("original"))
            .unwrap();

        let err = engine.register_chain(vec![step("X"), step("A")]).unwrap_err();
        assert!(matches!(err, ParleyError::DuplicateState(ref n) if n.as_str() == "A"));
        // The partially valid chain was not applied.
        assert!(engine.state(&StateName::new("X")).is_none());

        let err = engine.register_one_shot(step("A")).unwrap_err();
        assert!(matches!(err, ParleyError::DuplicateState(_)));
        assert_eq!(
            engine.state(&StateName::new("A")).unwrap().on_trigger,
            Some(Content::text("original"))
        );

        let err = engine.register_chain(vec![step("Y"), step("Y")]).unwrap_err();
        assert!(matches!(err, ParleyError::DuplicateState(_)));
        assert!(engine.state(&StateName::new("Y")).is_none());
    }

    #[test]
    fn one_shot_after_chain_is_duplicate() {
        let (mut engine, _, _) = engine();
        engine.register_chain(vec![step("A"), step("B")]).unwrap();
        assert!(engine.register_one_shot(step("B")).is_err());
        assert_eq!(
            engine.state(&StateName::new("A")).unwrap().next(),
            Some(&StateName::new("B"))
        );
    }

    #[test]
    fn validate_catches_dangling_references() {
        let (mut engine, _, _) = engine();
        engine
            .register_one_shot(DialogState::new("A").on_trigger_menu("Missing"))
            .unwrap();
        assert!(matches!(engine.validate(), Err(ParleyError::UnknownMenu(_))));

        let (mut engine, _, _) = self::engine();
        engine
            .register_menu(MenuDefinition::new("M").button(crate::ButtonTemplate::new(
                "go",
                "Go",
                ClickAction::goto("Nowhere"),
            )))
            .unwrap();
        assert!(matches!(engine.validate(), Err(ParleyError::UnknownState(_))));
    }

    #[tokio::test]
    async fn trigger_unknown_state_fails_without_writes() {
        let (engine, store, channel) = engine();
        let err = engine
            .trigger(UserId(1), &StateName::new("Nope"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::UnknownState(_)));
        assert_eq!(store.write_count(), 0);
        assert_eq!(channel.sent_count().await, 0);
    }

    #[tokio::test]
    async fn passive_state_completes_on_trigger() {
        let (mut engine, store, channel) = engine();
        engine
            .register_one_shot(
                DialogState::new("Info")
                    .on_trigger("Here is some info")
                    .on_success("Done"),
            )
            .unwrap();
        store.set_var(UserId(1), "k", "v").await.unwrap();

        engine
            .trigger(UserId(1), &StateName::new("Info"), None)
            .await
            .unwrap();
        assert_eq!(engine.current_state(UserId(1)).await.unwrap(), None);
        assert!(store.get_all_vars(UserId(1)).await.unwrap().is_empty());
        assert_eq!(
            channel.texts_to(UserId(1)).await,
            vec!["Here is some info".to_string(), "Done".to_string()]
        );
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn corrupted_state_is_cleared() {
        let (engine, store, channel) = engine();
        store
            .set_state(UserId(5), Some(&StateName::new("Removed")))
            .await
            .unwrap();
        let outcome = engine
            .update(&InboundEvent::text(UserId(5), "hi"))
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Idle);
        assert_eq!(engine.current_state(UserId(5)).await.unwrap(), None);
        assert_eq!(channel.sent_count().await, 0);
        assert!(logs_contain("clearing unregistered dialog state"));
    }

    #[tokio::test]
    async fn failure_apologizes_and_resets() {
        let (mut engine, store, channel) = engine();
        let engine_kb = parley_core::Keyboard::RemoveReply;
        engine = engine.with_apology("Oops");
        engine
            .register_one_shot(
                DialogState::new("Pay")
                    .mutator(|_| async {
                        MutatorOutcome::Failure(ParleyError::Internal("card declined".into()))
                    })
                    .exit_keyboard(engine_kb.clone()),
            )
            .unwrap();
        store.set_var(UserId(2), "amount", "10").await.unwrap();
        engine
            .trigger(UserId(2), &StateName::new("Pay"), None)
            .await
            .unwrap();

        let outcome = engine
            .update(&InboundEvent::text(UserId(2), "go"))
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Failed);
        assert_eq!(engine.current_state(UserId(2)).await.unwrap(), None);
        assert!(store.get_all_vars(UserId(2)).await.unwrap().is_empty());

        let last = channel.last_sent().await.unwrap();
        assert_eq!(last.content.text, "Oops");
        assert_eq!(last.content.keyboard, Some(engine_kb));
    }

    #[tokio::test]
    async fn failure_keeps_vars_when_asked() {
        let (mut engine, store, _) = engine();
        engine
            .register_one_shot(
                DialogState::new("Keep")
                    .mutator(|_| async { MutatorOutcome::Failure(ParleyError::Internal("x".into())) })
                    .keep_vars_on_exit(),
            )
            .unwrap();
        store.set_var(UserId(2), "draft", "hello").await.unwrap();
        engine
            .trigger(UserId(2), &StateName::new("Keep"), None)
            .await
            .unwrap();
        engine
            .update(&InboundEvent::text(UserId(2), "x"))
            .await
            .unwrap();
        assert_eq!(
            store.get_var(UserId(2), "draft").await.unwrap().as_deref(),
            Some("hello")
        );
    }

    #[test]
    fn retrigger_only_on_change() {
        let a = StateName::new("A");
        let b = StateName::new("B");
        assert!(should_retrigger(None, &a));
        assert!(should_retrigger(Some(&b), &a));
        assert!(!should_retrigger(Some(&a), &a));
    }

    #[tokio::test]
    async fn non_click_events_are_ignored_by_click_routing() {
        let (engine, _, channel) = engine();
        let outcome = engine
            .handle_click(&InboundEvent::text(UserId(1), "hi"))
            .await
            .unwrap();
        assert_eq!(outcome, ClickOutcome::NotAClick);
        assert!(channel.answered_clicks().await.is_empty());
    }

    #[tokio::test]
    async fn stale_click_is_still_acknowledged() {
        let (engine, _, channel) = engine();
        let outcome = engine
            .handle_click(&InboundEvent::click(UserId(1), None, "x|Gone", "cb-1"))
            .await
            .unwrap();
        assert_eq!(outcome, ClickOutcome::Stale);
        assert_eq!(
            channel.answered_clicks().await,
            vec![("cb-1".to_string(), Some(STALE_CLICK_NOTICE.to_string()))]
        );
    }
}
