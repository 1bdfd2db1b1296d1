// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dialog state templates.
//!
//! A [`DialogState`] is immutable once registered. The engine wires `next`
//! when the state is part of a chain.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use parley_core::{Content, Keyboard, MenuName, ParleyError, StateName};

use crate::context::DialogContext;

/// Checks the input. `Some(message)` rejects it and the message is sent back.
pub type Validator = Arc<dyn Fn(&DialogContext) -> Option<String> + Send + Sync>;

/// Side effect run on accepted input.
pub type Mutator = Arc<dyn Fn(DialogContext) -> BoxFuture<'static, MutatorOutcome> + Send + Sync>;

/// Result of a mutator run.
#[derive(Debug)]
pub enum MutatorOutcome {
    /// Proceed to the success notice and advance.
    Success,
    /// Stay in the current state and wait for more input.
    Continue,
    /// Apologize to the user and reset the dialog.
    Failure(ParleyError),
}

impl From<Result<(), ParleyError>> for MutatorOutcome {
    fn from(result: Result<(), ParleyError>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(e) => Self::Failure(e),
        }
    }
}

/// One step of a dialog.
#[derive(Clone)]
pub struct DialogState {
    pub(crate) name: StateName,
    pub(crate) validator: Option<Validator>,
    pub(crate) mutator: Option<Mutator>,
    pub(crate) on_trigger: Option<Content>,
    pub(crate) on_trigger_menu: Option<MenuName>,
    pub(crate) on_success: Option<Content>,
    pub(crate) exit_keyboard: Option<Keyboard>,
    pub(crate) next: Option<StateName>,
    pub(crate) keep_vars_on_exit: bool,
}

impl DialogState {
    pub fn new(name: impl Into<StateName>) -> Self {
        Self {
            name: name.into(),
            validator: None,
            mutator: None,
            on_trigger: None,
            on_trigger_menu: None,
            on_success: None,
            exit_keyboard: None,
            next: None,
            keep_vars_on_exit: false,
        }
    }

    /// Message sent when the state is entered.
    pub fn on_trigger(mut self, content: impl Into<Content>) -> Self {
        self.on_trigger = Some(content.into());
        self
    }

    /// Menu rendered as a second message when the state is entered.
    pub fn on_trigger_menu(mut self, menu: impl Into<MenuName>) -> Self {
        self.on_trigger_menu = Some(menu.into());
        self
    }

    pub fn validator<F>(mut self, f: F) -> Self
    where
        F: Fn(&DialogContext) -> Option<String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(f));
        self
    }

    pub fn mutator<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(DialogContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = MutatorOutcome> + Send + 'static,
    {
        self.mutator = Some(Arc::new(
            move |ctx: DialogContext| -> BoxFuture<'static, MutatorOutcome> { Box::pin(f(ctx)) },
        ));
        self
    }

    /// Message sent after the mutator succeeded, before advancing.
    pub fn on_success(mut self, content: impl Into<Content>) -> Self {
        self.on_success = Some(content.into());
        self
    }

    /// Keyboard attached to the success notice and to the failure apology.
    pub fn exit_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.exit_keyboard = Some(keyboard);
        self
    }

    pub fn keep_vars_on_exit(mut self) -> Self {
        self.keep_vars_on_exit = true;
        self
    }

    pub fn name(&self) -> &StateName {
        &self.name
    }

    /// Following state; `None` for terminal states.
    pub fn next(&self) -> Option<&StateName> {
        self.next.as_ref()
    }

    pub fn trigger_menu(&self) -> Option<&MenuName> {
        self.on_trigger_menu.as_ref()
    }

    /// States without validator and mutator complete as soon as they are entered.
    pub fn is_passive(&self) -> bool {
        self.validator.is_none() && self.mutator.is_none()
    }
}

impl fmt::Debug for DialogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogState")
            .field("name", &self.name)
            .field("has_validator", &self.validator.is_some())
            .field("has_mutator", &self.mutator.is_some())
            .field("on_trigger_menu", &self.on_trigger_menu)
            .field("next", &self.next)
            .field("keep_vars_on_exit", &self.keep_vars_on_exit)
            .finish()
    }
}
