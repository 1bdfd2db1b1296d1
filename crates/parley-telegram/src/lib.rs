// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram transport for Parley.
//!
//! Implements [`ChannelAdapter`] for the Telegram Bot API via teloxide:
//! long polling for messages, inline button clicks and pre-checkout queries,
//! text and media sends with inline or reply keyboards, invoices, in-place
//! edits of menu messages and click acknowledgement.

pub mod handler;
pub mod keyboard;

use std::sync::Arc;

use async_trait::async_trait;
use parley_config::model::TelegramConfig;
use parley_core::recording;
use parley_core::{
    Adapter, ChannelAdapter, Content, EditOutcome, HealthStatus, InboundEvent, Invoice, Keyboard,
    MediaKind, MessageId, ParleyError, Transport, UserId,
};
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQueryId, ChatId, FileId, InputFile, LabeledPrice, PreCheckoutQueryId,
};
use teloxide::{ApiError, RequestError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub use handler::AccessList;

/// Telegram transport implementing [`ChannelAdapter`].
///
/// Inbound updates pass the DM and access filters before they are queued
/// for [`receive`](ChannelAdapter::receive).
pub struct TelegramChannel {
    bot: Bot,
    access: Arc<AccessList>,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundEvent>>,
    inbound_tx: mpsc::Sender<InboundEvent>,
    polling_handle: Option<tokio::task::JoinHandle<()>>,
    provider_token: Option<String>,
}

impl TelegramChannel {
    /// Creates a new Telegram transport.
    ///
    /// Requires `config.bot_token` to be set.
    pub fn new(config: &TelegramConfig) -> Result<Self, ParleyError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            ParleyError::Config("telegram.bot_token is required for the Telegram transport".into())
        })?;

        if token.is_empty() {
            return Err(ParleyError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        let bot = Bot::new(token);
        let (inbound_tx, inbound_rx) = mpsc::channel(100);

        Ok(Self {
            bot,
            access: Arc::new(AccessList::from_config(config)),
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: None,
            provider_token: config.payment_provider_token.clone(),
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    pub fn access(&self) -> &AccessList {
        &self.access
    }
}

fn send_error(action: &str, e: teloxide::RequestError) -> ParleyError {
    ParleyError::Transport {
        message: format!("failed to {action}: {e}"),
        source: Some(Box::new(e)),
    }
}

fn parse_message_id(message: &MessageId) -> Result<teloxide::types::MessageId, ParleyError> {
    message
        .0
        .parse::<i32>()
        .map(teloxide::types::MessageId)
        .map_err(|e| ParleyError::transport(format!("invalid message_id `{message}`: {e}")))
}

/// Applies caption, parse mode, keyboard and protection to a media request.
macro_rules! captioned {
    ($request:expr, $content:expr) => {{
        let content = $content;
        let mut request = $request.caption(content.text.clone());
        if let Some(mode) = keyboard::parse_mode(content.parse_mode) {
            request = request.parse_mode(mode);
        }
        if let Some(kb) = &content.keyboard {
            request = request.reply_markup(keyboard::reply_markup(kb));
        }
        if content.protected {
            request = request.protect_content(true);
        }
        request.await
    }};
}

/// Forwards an accepted event to the inbound queue.
async fn forward(tx: &mpsc::Sender<InboundEvent>, access: &AccessList, event: InboundEvent) {
    if !access.permits(event.user_id, event.username.as_deref()) {
        debug!(user_id = %event.user_id, "ignoring unauthorized user");
        return;
    }
    if tx.send(event).await.is_err() {
        warn!("inbound channel closed, dropping update");
    }
}

#[async_trait]
impl Adapter for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        // Check if the bot token is valid by calling getMe.
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        debug!("Telegram transport shutting down");
        if let Some(handle) = &self.polling_handle {
            handle.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for TelegramChannel {
    async fn send(&self, user: UserId, content: Content) -> Result<MessageId, ParleyError> {
        let chat = ChatId(user.0);
        let sent = match &content.media {
            None => {
                let mut request = self.bot.send_message(chat, content.text.clone());
                if let Some(mode) = keyboard::parse_mode(content.parse_mode) {
                    request = request.parse_mode(mode);
                }
                if let Some(kb) = &content.keyboard {
                    request = request.reply_markup(keyboard::reply_markup(kb));
                }
                if content.protected {
                    request = request.protect_content(true);
                }
                request.await
            }
            Some(media) => {
                let file = InputFile::file_id(FileId(media.file_id.clone()));
                match media.kind {
                    MediaKind::Photo => captioned!(self.bot.send_photo(chat, file), &content),
                    MediaKind::Video => captioned!(self.bot.send_video(chat, file), &content),
                    MediaKind::Audio => captioned!(self.bot.send_audio(chat, file), &content),
                    MediaKind::Voice => captioned!(self.bot.send_voice(chat, file), &content),
                    MediaKind::Document => {
                        captioned!(self.bot.send_document(chat, file), &content)
                    }
                }
            }
        }
        .map_err(|e| send_error("send message", e))?;
        recording::record_message_sent();
        Ok(MessageId(sent.id.0.to_string()))
    }

    async fn edit(
        &self,
        user: UserId,
        message: &MessageId,
        content: Content,
    ) -> Result<EditOutcome, ParleyError> {
        let msg_id = parse_message_id(message)?;
        let mut request = self
            .bot
            .edit_message_text(ChatId(user.0), msg_id, content.text);
        if let Some(mode) = keyboard::parse_mode(content.parse_mode) {
            request = request.parse_mode(mode);
        }
        match &content.keyboard {
            Some(Keyboard::Inline(rows)) => {
                request = request.reply_markup(keyboard::inline_markup(rows));
            }
            Some(_) => debug!(message = %message, "only inline keyboards survive an edit"),
            None => {}
        }

        match request.await {
            Ok(_) => Ok(EditOutcome::Edited),
            Err(e) if is_unchanged(&e) => Ok(EditOutcome::Unchanged),
            Err(e) => Err(send_error("edit message", e)),
        }
    }

    async fn answer_click(
        &self,
        callback_id: &str,
        notice: Option<&str>,
    ) -> Result<(), ParleyError> {
        let mut request = self
            .bot
            .answer_callback_query(CallbackQueryId(callback_id.to_string()));
        if let Some(text) = notice {
            request = request.text(text);
        }
        request
            .await
            .map_err(|e| send_error("answer callback query", e))?;
        Ok(())
    }

    async fn send_invoice(&self, user: UserId, invoice: &Invoice) -> Result<MessageId, ParleyError> {
        let prices = vec![LabeledPrice::new(invoice.currency.clone(), invoice.amount)];
        let mut request = self.bot.send_invoice(
            ChatId(user.0),
            invoice.title.clone(),
            invoice.description.clone(),
            invoice.payload.clone(),
            invoice.currency.clone(),
            prices,
        );
        if let Some(token) = &self.provider_token {
            request = request.provider_token(token.clone());
        }
        let sent = request.await.map_err(|e| send_error("send invoice", e))?;
        Ok(MessageId(sent.id.0.to_string()))
    }

    async fn answer_checkout(
        &self,
        checkout_id: &str,
        error: Option<&str>,
    ) -> Result<(), ParleyError> {
        let id = PreCheckoutQueryId(checkout_id.to_string());
        let mut request = self.bot.answer_pre_checkout_query(id, error.is_none());
        if let Some(text) = error {
            request = request.error_message(text);
        }
        request
            .await
            .map_err(|e| send_error("answer pre-checkout query", e))?;
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for TelegramChannel {
    async fn connect(&mut self) -> Result<(), ParleyError> {
        if self.polling_handle.is_some() {
            return Ok(()); // Already connected
        }

        let bot = self.bot.clone();
        let msg_tx = self.inbound_tx.clone();
        let msg_access = self.access.clone();
        let click_tx = self.inbound_tx.clone();
        let click_access = self.access.clone();
        let checkout_tx = self.inbound_tx.clone();
        let checkout_access = self.access.clone();

        info!("starting Telegram long polling");

        let handle = tokio::spawn(async move {
            let messages = Update::filter_message().endpoint(move |msg: Message| {
                let tx = msg_tx.clone();
                let access = msg_access.clone();
                async move {
                    if !handler::is_dm(&msg) {
                        debug!(chat_id = msg.chat.id.0, "ignoring non-DM message");
                        return respond(());
                    }
                    if let Some(event) = handler::message_to_event(&msg) {
                        forward(&tx, &access, event).await;
                    }
                    respond(())
                }
            });

            let clicks = Update::filter_callback_query().endpoint(move |q: CallbackQuery| {
                let tx = click_tx.clone();
                let access = click_access.clone();
                async move {
                    if let Some(event) = handler::callback_to_event(&q) {
                        forward(&tx, &access, event).await;
                    }
                    respond(())
                }
            });

            let checkouts =
                Update::filter_pre_checkout_query().endpoint(move |q: PreCheckoutQuery| {
                    let tx = checkout_tx.clone();
                    let access = checkout_access.clone();
                    async move {
                        forward(&tx, &access, handler::checkout_to_event(&q)).await;
                        respond(())
                    }
                });

            let tree = dptree::entry()
                .branch(messages)
                .branch(clicks)
                .branch(checkouts);
            Dispatcher::builder(bot, tree)
                .default_handler(|_| async {}) // Silently ignore other updates
                .build()
                .dispatch()
                .await;
        });

        self.polling_handle = Some(handle);
        Ok(())
    }

    async fn receive(&self) -> Result<InboundEvent, ParleyError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| ParleyError::transport("Telegram inbound channel closed"))
    }
}

/// Telegram refuses edits that would leave a message as it is.
fn is_unchanged(err: &RequestError) -> bool {
    matches!(err, RequestError::Api(ApiError::MessageNotModified))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: Option<&str>) -> TelegramConfig {
        TelegramConfig {
            bot_token: token.map(str::to_string),
            ..TelegramConfig::default()
        }
    }

    #[test]
    fn new_requires_bot_token() {
        assert!(TelegramChannel::new(&config(None)).is_err());
    }

    #[test]
    fn new_rejects_empty_token() {
        let err = TelegramChannel::new(&config(Some(""))).err().unwrap();
        assert!(matches!(err, ParleyError::Config(_)));
    }

    #[test]
    fn new_accepts_valid_token() {
        let mut cfg = config(Some("123456:ABC-DEF1234ghIkl-zyx57W2v1u123ew11"));
        cfg.blocked_users = vec!["666".into()];
        let channel = TelegramChannel::new(&cfg).unwrap();
        assert_eq!(channel.name(), "telegram");
        assert!(!channel.access().permits(UserId(666), None));
        assert!(channel.access().permits(UserId(1), None));
    }

    #[test]
    fn message_ids_must_be_numeric() {
        assert_eq!(
            parse_message_id(&MessageId("42".into())).unwrap(),
            teloxide::types::MessageId(42)
        );
        assert!(parse_message_id(&MessageId("abc".into())).is_err());
    }

    #[test]
    fn identical_edit_is_unchanged_not_an_error() {
        assert!(is_unchanged(&RequestError::Api(ApiError::MessageNotModified)));
        assert!(!is_unchanged(&RequestError::Api(ApiError::MessageToEditNotFound)));
    }

    #[tokio::test]
    async fn blocked_events_are_not_forwarded() {
        let (tx, mut rx) = mpsc::channel(4);
        let access = AccessList::new(vec![], vec!["9".into()], vec![]);
        forward(&tx, &access, InboundEvent::text(UserId(9), "hi")).await;
        forward(&tx, &access, InboundEvent::text(UserId(1), "hi")).await;
        drop(tx);
        assert_eq!(rx.recv().await.unwrap().user_id, UserId(1));
        assert!(rx.recv().await.is_none());
    }
}
