// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inline menus: definitions, one-time layout construction, rendering, and
//! in-place refresh of the tracked menu message.
//!
//! A menu renders in one of two modes:
//!
//! - **static content**: a fixed button layout built at registration. An
//!   optional data fetcher yields a flat string map and every dynamic button
//!   text is recomputed from it on each render.
//! - **dynamic buttons**: a button fetcher yields an ordered `(id, label)` list
//!   and the rows are rebuilt from it on each render. Template buttons of a
//!   dynamic menu are appended below as a fixed footer.
//!
//! Click routing lives on [`DialogEngine`](crate::DialogEngine) since string
//! actions enter dialog states.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, warn};

use parley_core::{
    Content, EditOutcome, InlineButton, Keyboard, MenuName, MessageId, ParleyError, StateName,
    StateStore, Transport, UserId,
};

use crate::callback;
use crate::context::DialogContext;
use crate::layout::{ROW_BREAK, pack_rows};

/// Text shown on a dynamic button until its text function runs.
pub const PLACEHOLDER: &str = "-";

/// Flat data produced by a static menu's fetcher.
pub type DataMap = HashMap<String, String>;

pub type DataFetcher =
    Arc<dyn Fn(DialogContext) -> BoxFuture<'static, Result<DataMap, ParleyError>> + Send + Sync>;

pub type ButtonFetcher = Arc<
    dyn Fn(DialogContext) -> BoxFuture<'static, Result<Vec<(String, String)>, ParleyError>>
        + Send
        + Sync,
>;

pub type TextFn = Arc<dyn Fn(&DialogContext, &DataMap) -> Result<String, TextFallback> + Send + Sync>;

pub type ClickHandler =
    Arc<dyn Fn(DialogContext) -> BoxFuture<'static, Result<FollowUp, ParleyError>> + Send + Sync>;

pub type SelectHandler = Arc<
    dyn Fn(DialogContext, String) -> BoxFuture<'static, Result<FollowUp, ParleyError>>
        + Send
        + Sync,
>;

/// A text function failure. `text` is still displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFallback {
    pub text: String,
    pub error: String,
}

impl TextFallback {
    pub fn new(text: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            error: error.into(),
        }
    }

    /// Fallback for a data key missing from the fetched map.
    pub fn missing(key: &str) -> Self {
        Self::new(PLACEHOLDER, format!("no data for `{key}`"))
    }
}

#[derive(Clone)]
pub enum ButtonText {
    Static(String),
    Dynamic(TextFn),
}

impl ButtonText {
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&DialogContext, &DataMap) -> Result<String, TextFallback> + Send + Sync + 'static,
    {
        Self::Dynamic(Arc::new(f))
    }

    /// Shows `data[key]`, or the placeholder when the key is absent.
    pub fn from_data(key: &'static str) -> Self {
        Self::dynamic(move |_, data| data.get(key).cloned().ok_or_else(|| TextFallback::missing(key)))
    }
}

impl From<&str> for ButtonText {
    fn from(s: &str) -> Self {
        Self::Static(s.to_string())
    }
}

impl From<String> for ButtonText {
    fn from(s: String) -> Self {
        Self::Static(s)
    }
}

/// What a click does after being acknowledged.
#[derive(Clone)]
pub enum ClickAction {
    /// Enter a dialog state, remembering this menu as the one to refresh on completion.
    GotoState(StateName),
    /// Run a side effect and apply the returned follow-up.
    Callback(ClickHandler),
}

impl ClickAction {
    pub fn goto(state: impl Into<StateName>) -> Self {
        Self::GotoState(state.into())
    }

    pub fn callback<F, Fut>(f: F) -> Self
    where
        F: Fn(DialogContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<FollowUp, ParleyError>> + Send + 'static,
    {
        Self::Callback(Arc::new(
            move |ctx: DialogContext| -> BoxFuture<'static, Result<FollowUp, ParleyError>> {
                Box::pin(f(ctx))
            },
        ))
    }
}

/// Directive returned by click callbacks, applied by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum FollowUp {
    None,
    /// Re-render the clicked menu in place.
    RefreshMenu,
    /// Enter a dialog state bound to the clicked menu.
    Trigger(StateName),
    /// Send another menu as a new tracked message.
    Show(MenuName),
    /// Leave any running dialog, optionally telling the user.
    Reset {
        keep_vars: bool,
        notice: Option<Content>,
    },
}

#[derive(Clone)]
pub struct ButtonTemplate {
    id: String,
    text: ButtonText,
    action: Option<ClickAction>,
}

impl ButtonTemplate {
    pub fn new(id: impl Into<String>, text: impl Into<ButtonText>, action: ClickAction) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            action: Some(action),
        }
    }

    /// Forces the next button onto a new row.
    pub fn row_break() -> Self {
        Self {
            id: ROW_BREAK.to_string(),
            text: ButtonText::Static(String::new()),
            action: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn is_row_break(&self) -> bool {
        self.id == ROW_BREAK
    }
}

#[derive(Clone)]
pub enum MenuSource {
    Static { data: Option<DataFetcher> },
    Dynamic { buttons: ButtonFetcher },
}

/// A menu as declared by application code.
pub struct MenuDefinition {
    name: MenuName,
    header: Content,
    max_per_row: usize,
    source: MenuSource,
    buttons: Vec<ButtonTemplate>,
    on_select: Option<SelectHandler>,
    empty_notice: Content,
}

impl MenuDefinition {
    pub fn new(name: impl Into<MenuName>) -> Self {
        Self {
            name: name.into(),
            header: Content::default(),
            max_per_row: 1,
            source: MenuSource::Static { data: None },
            buttons: Vec::new(),
            on_select: None,
            empty_notice: Content::text("Nothing here yet."),
        }
    }

    /// Message text above the buttons.
    pub fn header(mut self, header: impl Into<Content>) -> Self {
        self.header = header.into();
        self
    }

    pub fn max_per_row(mut self, max: usize) -> Self {
        self.max_per_row = max;
        self
    }

    /// Static-content mode with a data fetcher feeding dynamic button texts.
    pub fn data<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(DialogContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<DataMap, ParleyError>> + Send + 'static,
    {
        let fetch: DataFetcher = Arc::new(
            move |ctx: DialogContext| -> BoxFuture<'static, Result<DataMap, ParleyError>> {
                Box::pin(f(ctx))
            },
        );
        self.source = MenuSource::Static { data: Some(fetch) };
        self
    }

    /// Dynamic-button mode. Return `Err(NoButtonsAvailable)` (or an empty
    /// list) to show the empty notice instead.
    pub fn dynamic<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(DialogContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<(String, String)>, ParleyError>> + Send + 'static,
    {
        let fetch: ButtonFetcher = Arc::new(
            move |ctx: DialogContext| -> BoxFuture<'static, Result<Vec<(String, String)>, ParleyError>> {
                Box::pin(f(ctx))
            },
        );
        self.source = MenuSource::Dynamic { buttons: fetch };
        self
    }

    pub fn button(mut self, button: ButtonTemplate) -> Self {
        self.buttons.push(button);
        self
    }

    pub fn row_break(self) -> Self {
        self.button(ButtonTemplate::row_break())
    }

    /// Handler for clicks on fetched buttons of a dynamic menu.
    pub fn on_select<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(DialogContext, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<FollowUp, ParleyError>> + Send + 'static,
    {
        self.on_select = Some(Arc::new(
            move |ctx: DialogContext, id: String| -> BoxFuture<'static, Result<FollowUp, ParleyError>> {
                Box::pin(f(ctx, id))
            },
        ));
        self
    }

    /// Sent instead of a dynamic menu with no buttons.
    pub fn empty_notice(mut self, notice: impl Into<Content>) -> Self {
        self.empty_notice = notice.into();
        self
    }

    pub fn name(&self) -> &MenuName {
        &self.name
    }
}

/// A pre-built button: its id and its rendered form with static text baked in.
#[derive(Debug, Clone)]
struct LaidButton {
    id: String,
    button: InlineButton,
}

/// A registered menu with its layout constructed.
pub(crate) struct Menu {
    name: MenuName,
    header: Content,
    max_per_row: usize,
    source: MenuSource,
    layout: Vec<Vec<LaidButton>>,
    dynamic_text: HashMap<String, TextFn>,
    actions: HashMap<String, ClickAction>,
    on_select: Option<SelectHandler>,
    empty_notice: Content,
}

/// Where a click on a menu button goes.
pub(crate) enum ClickTarget {
    Action(ClickAction),
    Select(SelectHandler, String),
}

impl Menu {
    fn build(def: MenuDefinition) -> Result<Self, ParleyError> {
        let invalid = |reason: String| ParleyError::InvalidMenu {
            menu: def.name.clone(),
            reason,
        };
        if def.name.as_str().is_empty() || def.name.as_str().contains(callback::SEPARATOR) {
            return Err(invalid(format!(
                "menu names must be non-empty and must not contain `{}`",
                callback::SEPARATOR
            )));
        }
        if def.max_per_row == 0 {
            return Err(invalid("max_per_row must be at least 1".to_string()));
        }
        let mut seen = HashSet::new();
        for button in def.buttons.iter().filter(|b| !b.is_row_break()) {
            if button.id.is_empty() {
                return Err(invalid("button ids must be non-empty".to_string()));
            }
            if !seen.insert(button.id.as_str()) {
                return Err(invalid(format!("duplicate button id `{}`", button.id)));
            }
        }

        let mut dynamic_text = HashMap::new();
        let mut actions = HashMap::new();
        let rows = pack_rows(def.buttons, def.max_per_row, ButtonTemplate::is_row_break);
        let layout = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|template| {
                        let text = match template.text {
                            ButtonText::Static(text) => text,
                            ButtonText::Dynamic(f) => {
                                dynamic_text.insert(template.id.clone(), f);
                                PLACEHOLDER.to_string()
                            }
                        };
                        if let Some(action) = template.action {
                            actions.insert(template.id.clone(), action);
                        }
                        LaidButton {
                            button: InlineButton {
                                text,
                                payload: callback::encode(&template.id, &def.name),
                            },
                            id: template.id,
                        }
                    })
                    .collect()
            })
            .collect();

        Ok(Self {
            name: def.name,
            header: def.header,
            max_per_row: def.max_per_row,
            source: def.source,
            layout,
            dynamic_text,
            actions,
            on_select: def.on_select,
            empty_notice: def.empty_notice,
        })
    }

    /// Pre-built layout with dynamic texts computed from `data`.
    fn splice_rows(&self, ctx: &DialogContext, data: &DataMap) -> Vec<Vec<InlineButton>> {
        self.layout
            .iter()
            .map(|row| {
                row.iter()
                    .map(|laid| {
                        let mut button = laid.button.clone();
                        if let Some(text_fn) = self.dynamic_text.get(&laid.id) {
                            button.text = match text_fn(ctx, data) {
                                Ok(text) => text,
                                Err(fallback) => {
                                    warn!(
                                        menu = %self.name,
                                        button = %laid.id,
                                        error = %fallback.error,
                                        "button text fell back"
                                    );
                                    fallback.text
                                }
                            };
                        }
                        button
                    })
                    .collect()
            })
            .collect()
    }

    async fn render(&self, ctx: &DialogContext) -> Result<Option<Content>, ParleyError> {
        let rows = match &self.source {
            MenuSource::Static { data } => {
                let data = match data {
                    Some(fetch) => fetch(ctx.clone()).await.unwrap_or_else(|e| {
                        warn!(menu = %self.name, user_id = %ctx.user(), error = %e, "menu data fetch failed");
                        DataMap::new()
                    }),
                    None => DataMap::new(),
                };
                self.splice_rows(ctx, &data)
            }
            MenuSource::Dynamic { buttons } => {
                let pairs = match buttons(ctx.clone()).await {
                    Ok(pairs) if !pairs.is_empty() => pairs,
                    Ok(_) | Err(ParleyError::NoButtonsAvailable) => return Ok(None),
                    Err(e) => return Err(e),
                };
                let fetched = pairs.into_iter().map(|(id, label)| InlineButton {
                    text: label,
                    payload: callback::encode(&id, &self.name),
                });
                let mut rows = pack_rows(fetched, self.max_per_row, |_| false);
                rows.extend(self.splice_rows(ctx, &DataMap::new()));
                rows
            }
        };

        for button in rows.iter().flatten() {
            if button.payload.len() > callback::MAX_PAYLOAD_BYTES {
                warn!(menu = %self.name, payload = %button.payload, "click payload exceeds transport limit");
            }
        }
        Ok(Some(self.header.clone().with_keyboard(Keyboard::Inline(rows))))
    }

    pub(crate) fn click_target(&self, button_id: &str) -> Option<ClickTarget> {
        if let Some(action) = self.actions.get(button_id) {
            return Some(ClickTarget::Action(action.clone()));
        }
        match (&self.source, &self.on_select) {
            (MenuSource::Dynamic { .. }, Some(select)) => {
                Some(ClickTarget::Select(select.clone(), button_id.to_string()))
            }
            _ => None,
        }
    }

    pub(crate) fn goto_targets(&self) -> impl Iterator<Item = &StateName> {
        self.actions.values().filter_map(|action| match action {
            ClickAction::GotoState(state) => Some(state),
            ClickAction::Callback(_) => None,
        })
    }
}

/// Named menus plus the handles needed to send and edit them.
pub struct MenuRegistry {
    menus: HashMap<MenuName, Arc<Menu>>,
    store: Arc<dyn StateStore>,
    transport: Arc<dyn Transport>,
}

impl MenuRegistry {
    pub fn new(store: Arc<dyn StateStore>, transport: Arc<dyn Transport>) -> Self {
        Self {
            menus: HashMap::new(),
            store,
            transport,
        }
    }

    /// Validates the definition and constructs its layout.
    pub fn register(&mut self, def: MenuDefinition) -> Result<(), ParleyError> {
        if self.menus.contains_key(def.name()) {
            return Err(ParleyError::DuplicateMenu(def.name().clone()));
        }
        let menu = Menu::build(def)?;
        debug!(menu = %menu.name, rows = menu.layout.len(), "menu registered");
        self.menus.insert(menu.name.clone(), Arc::new(menu));
        Ok(())
    }

    pub fn contains(&self, name: &MenuName) -> bool {
        self.menus.contains_key(name)
    }

    /// Button ids of the pre-built layout, row by row.
    pub fn layout(&self, name: &MenuName) -> Option<Vec<Vec<String>>> {
        self.menus.get(name).map(|menu| {
            menu.layout
                .iter()
                .map(|row| row.iter().map(|b| b.id.clone()).collect())
                .collect()
        })
    }

    pub(crate) fn get(&self, name: &MenuName) -> Result<&Arc<Menu>, ParleyError> {
        self.menus
            .get(name)
            .ok_or_else(|| ParleyError::UnknownMenu(name.clone()))
    }

    pub(crate) fn menus(&self) -> impl Iterator<Item = &Arc<Menu>> {
        self.menus.values()
    }

    fn context(&self, user: UserId) -> DialogContext {
        DialogContext::new(user, None, self.store.clone(), self.transport.clone())
    }

    /// Fresh content of the menu for `user`; `None` when a dynamic menu is empty.
    pub async fn render(&self, user: UserId, name: &MenuName) -> Result<Option<Content>, ParleyError> {
        let menu = self.get(name)?;
        menu.render(&self.context(user)).await
    }

    /// Sends the menu as a new message and tracks it for later edits.
    ///
    /// An empty dynamic menu sends its empty notice instead and tracks nothing.
    pub async fn show(&self, user: UserId, name: &MenuName) -> Result<Option<MessageId>, ParleyError> {
        let id = self.send_untracked(user, name).await?;
        if let Some(id) = &id {
            self.store.set_tracked_message_id(user, id).await?;
        }
        Ok(id)
    }

    /// Sends the menu without touching the tracked message id.
    pub async fn send_untracked(
        &self,
        user: UserId,
        name: &MenuName,
    ) -> Result<Option<MessageId>, ParleyError> {
        let menu = self.get(name)?;
        match menu.render(&self.context(user)).await? {
            Some(content) => Ok(Some(self.transport.send(user, content).await?)),
            None => {
                self.transport.send(user, menu.empty_notice.clone()).await?;
                Ok(None)
            }
        }
    }

    /// Re-renders the menu into the user's tracked message.
    ///
    /// Identical content counts as success. An empty dynamic menu turns the
    /// message into its empty notice.
    pub async fn update(&self, user: UserId, name: &MenuName) -> Result<EditOutcome, ParleyError> {
        let menu = self.get(name)?;
        let Some(message) = self.store.get_tracked_message_id(user).await? else {
            return Err(ParleyError::MissingTrackedMessage {
                user,
                menu: name.clone(),
            });
        };
        let content = menu
            .render(&self.context(user))
            .await?
            .unwrap_or_else(|| menu.empty_notice.clone());
        let outcome = self.transport.edit(user, &message, content).await?;
        debug!(user_id = %user, menu = %name, ?outcome, "menu refreshed");
        Ok(outcome)
    }
}

impl fmt::Debug for MenuRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuRegistry")
            .field("menus", &self.menus.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_test_utils::{MemoryStateStore, MockChannel};

    fn registry() -> (MenuRegistry, Arc<MemoryStateStore>, Arc<MockChannel>) {
        let store = Arc::new(MemoryStateStore::new());
        let channel = Arc::new(MockChannel::new());
        (
            MenuRegistry::new(store.clone(), channel.clone()),
            store,
            channel,
        )
    }

    fn noop() -> ClickAction {
        ClickAction::callback(|_| async { Ok(FollowUp::None) })
    }

    fn five_buttons(with_break: bool) -> MenuDefinition {
        let mut def = MenuDefinition::new("M").header("Pick").max_per_row(2);
        for i in 1..=5 {
            def = def.button(ButtonTemplate::new(format!("b{i}"), format!("B{i}"), noop()));
            if with_break && i == 2 {
                def = def.row_break();
            }
        }
        def
    }

    fn row_sizes(rows: &[Vec<String>]) -> Vec<usize> {
        rows.iter().map(Vec::len).collect()
    }

    #[test]
    fn layout_packs_rows() {
        let (mut reg, _, _) = registry();
        reg.register(five_buttons(false)).unwrap();
        let rows = reg.layout(&MenuName::new("M")).unwrap();
        assert_eq!(row_sizes(&rows), vec![2, 2, 1]);
    }

    #[test]
    fn row_break_forces_new_row() {
        let (mut reg, _, _) = registry();
        reg.register(five_buttons(true)).unwrap();
        let rows = reg.layout(&MenuName::new("M")).unwrap();
        assert_eq!(row_sizes(&rows), vec![2, 1, 2]);
        assert_eq!(rows[1], vec!["b3".to_string()]);
    }

    #[test]
    fn duplicate_menu_is_rejected() {
        let (mut reg, _, _) = registry();
        reg.register(MenuDefinition::new("M")).unwrap();
        let err = reg.register(MenuDefinition::new("M")).unwrap_err();
        assert!(matches!(err, ParleyError::DuplicateMenu(name) if name.as_str() == "M"));
    }

    #[test]
    fn malformed_menus_are_rejected() {
        let (mut reg, _, _) = registry();
        let bad_name = MenuDefinition::new("a|b");
        assert!(matches!(reg.register(bad_name), Err(ParleyError::InvalidMenu { .. })));

        let dup_ids = MenuDefinition::new("D")
            .button(ButtonTemplate::new("x", "X", noop()))
            .button(ButtonTemplate::new("x", "Y", noop()));
        assert!(matches!(reg.register(dup_ids), Err(ParleyError::InvalidMenu { .. })));

        let zero = MenuDefinition::new("Z").max_per_row(0);
        assert!(matches!(reg.register(zero), Err(ParleyError::InvalidMenu { .. })));
        assert!(!reg.contains(&MenuName::new("D")));
    }

    #[tokio::test]
    async fn static_render_splices_dynamic_text() {
        let (mut reg, _, _) = registry();
        reg.register(
            MenuDefinition::new("Profile")
                .header("Your profile")
                .max_per_row(1)
                .data(|ctx| async move {
                    let mut data = DataMap::new();
                    data.insert("name".into(), format!("user-{}", ctx.user()));
                    Ok(data)
                })
                .button(ButtonTemplate::new("name", ButtonText::from_data("name"), noop()))
                .button(ButtonTemplate::new("city", ButtonText::from_data("city"), noop()))
                .button(ButtonTemplate::new("cancel", "Cancel", noop())),
        )
        .unwrap();

        let content = reg
            .render(UserId(7), &MenuName::new("Profile"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(content.text, "Your profile");
        let Some(Keyboard::Inline(rows)) = content.keyboard else {
            panic!("expected inline keyboard");
        };
        assert_eq!(rows[0][0].text, "user-7");
        assert_eq!(rows[0][0].payload, "name|Profile");
        // Missing key falls back to the placeholder.
        assert_eq!(rows[1][0].text, PLACEHOLDER);
        assert_eq!(rows[2][0].text, "Cancel");
    }

    #[tokio::test]
    async fn failed_data_fetch_still_renders() {
        let (mut reg, _, _) = registry();
        reg.register(
            MenuDefinition::new("Broken")
                .data(|_| async { Err(ParleyError::storage("db down")) })
                .button(ButtonTemplate::new("a", ButtonText::from_data("a"), noop())),
        )
        .unwrap();
        let content = reg
            .render(UserId(1), &MenuName::new("Broken"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            content.keyboard,
            Some(Keyboard::Inline(vec![vec![InlineButton {
                text: PLACEHOLDER.into(),
                payload: "a|Broken".into(),
            }]]))
        );
    }

    #[tokio::test]
    async fn dynamic_render_rebuilds_from_fetcher() {
        let (mut reg, _, _) = registry();
        reg.register(
            MenuDefinition::new("List")
                .header("Items")
                .max_per_row(2)
                .dynamic(|_| async {
                    Ok(vec![
                        ("1".to_string(), "One".to_string()),
                        ("2".to_string(), "Two".to_string()),
                        ("3".to_string(), "Three".to_string()),
                    ])
                })
                .button(ButtonTemplate::new("close", "Close", noop())),
        )
        .unwrap();

        let content = reg
            .render(UserId(1), &MenuName::new("List"))
            .await
            .unwrap()
            .unwrap();
        let Some(Keyboard::Inline(rows)) = content.keyboard else {
            panic!("expected inline keyboard");
        };
        let texts: Vec<Vec<&str>> = rows
            .iter()
            .map(|r| r.iter().map(|b| b.text.as_str()).collect())
            .collect();
        assert_eq!(texts, vec![vec!["One", "Two"], vec!["Three"], vec!["Close"]]);
        assert_eq!(rows[1][0].payload, "3|List");
    }

    #[tokio::test]
    async fn empty_dynamic_menu_shows_notice() {
        let (mut reg, store, channel) = registry();
        reg.register(
            MenuDefinition::new("Empty")
                .dynamic(|_| async { Err(ParleyError::NoButtonsAvailable) })
                .empty_notice("No entries."),
        )
        .unwrap();

        let name = MenuName::new("Empty");
        assert!(reg.render(UserId(1), &name).await.unwrap().is_none());
        assert_eq!(reg.show(UserId(1), &name).await.unwrap(), None);
        assert_eq!(channel.texts_to(UserId(1)).await, vec!["No entries.".to_string()]);
        assert_eq!(store.get_tracked_message_id(UserId(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn show_tracks_and_update_edits_in_place() {
        let (mut reg, store, channel) = registry();
        reg.register(five_buttons(false)).unwrap();
        let name = MenuName::new("M");

        let id = reg.show(UserId(3), &name).await.unwrap().unwrap();
        assert_eq!(
            store.get_tracked_message_id(UserId(3)).await.unwrap(),
            Some(id.clone())
        );

        // Nothing changed, so the edit is a no-op but still a success.
        assert_eq!(
            reg.update(UserId(3), &name).await.unwrap(),
            EditOutcome::Unchanged
        );
        assert_eq!(channel.edits().await.len(), 1);
    }

    #[tokio::test]
    async fn update_without_tracked_message_fails() {
        let (mut reg, _, _) = registry();
        reg.register(five_buttons(false)).unwrap();
        let err = reg.update(UserId(3), &MenuName::new("M")).await.unwrap_err();
        assert!(matches!(err, ParleyError::MissingTrackedMessage { .. }));
    }

    #[tokio::test]
    async fn unknown_menu_fails() {
        let (reg, _, _) = registry();
        let err = reg.show(UserId(1), &MenuName::new("Nope")).await.unwrap_err();
        assert!(matches!(err, ParleyError::UnknownMenu(_)));
    }
}
