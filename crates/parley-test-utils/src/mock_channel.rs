// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter` with injectable inbound events
//! and captured outbound traffic for assertion in tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use parley_core::{
    Adapter, ChannelAdapter, Content, EditOutcome, HealthStatus, InboundEvent, Invoice, Keyboard,
    MessageId, ParleyError, Transport, UserId,
};

/// One captured `send` call.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub user: UserId,
    pub id: MessageId,
    pub content: Content,
}

impl SentMessage {
    /// Button texts of an inline keyboard, row by row.
    pub fn inline_rows(&self) -> Vec<Vec<String>> {
        match &self.content.keyboard {
            Some(Keyboard::Inline(rows)) => rows
                .iter()
                .map(|row| row.iter().map(|b| b.text.clone()).collect())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// One captured `edit` call.
#[derive(Debug, Clone, PartialEq)]
pub struct EditRecord {
    pub user: UserId,
    pub message: MessageId,
    pub content: Content,
    pub outcome: EditOutcome,
}

/// A mock messaging channel for testing.
///
/// Message ids are sequential decimal strings starting at `"1"`. Editing a
/// message with byte-identical content reports [`EditOutcome::Unchanged`];
/// editing an unknown id is a transport error.
pub struct MockChannel {
    inbound: Arc<Mutex<VecDeque<InboundEvent>>>,
    sent: Arc<Mutex<Vec<SentMessage>>>,
    edits: Arc<Mutex<Vec<EditRecord>>>,
    current: Arc<Mutex<HashMap<MessageId, Content>>>,
    answered: Arc<Mutex<Vec<(String, Option<String>)>>>,
    invoices: Arc<Mutex<Vec<(UserId, Invoice)>>>,
    checkouts: Arc<Mutex<Vec<(String, Option<String>)>>>,
    next_id: AtomicU64,
    fail_sends: AtomicBool,
    notify: Arc<Notify>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            edits: Arc::new(Mutex::new(Vec::new())),
            current: Arc::new(Mutex::new(HashMap::new())),
            answered: Arc::new(Mutex::new(Vec::new())),
            invoices: Arc::new(Mutex::new(Vec::new())),
            checkouts: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
            fail_sends: AtomicBool::new(false),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Queues an event for the next `receive()`.
    pub async fn inject(&self, event: InboundEvent) {
        self.inbound.lock().await.push_back(event);
        self.notify.notify_one();
    }

    /// Makes every following `send` fail until reset.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    /// Texts sent to `user`, in order.
    pub async fn texts_to(&self, user: UserId) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|m| m.user == user)
            .map(|m| m.content.text.clone())
            .collect()
    }

    pub async fn last_sent(&self) -> Option<SentMessage> {
        self.sent.lock().await.last().cloned()
    }

    pub async fn last_sent_to(&self, user: UserId) -> Option<SentMessage> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|m| m.user == user)
            .cloned()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn edits(&self) -> Vec<EditRecord> {
        self.edits.lock().await.clone()
    }

    /// `(callback_id, notice)` pairs passed to `answer_click`.
    pub async fn answered_clicks(&self) -> Vec<(String, Option<String>)> {
        self.answered.lock().await.clone()
    }

    pub async fn invoices(&self) -> Vec<(UserId, Invoice)> {
        self.invoices.lock().await.clone()
    }

    /// `(checkout_id, error)` pairs passed to `answer_checkout`.
    pub async fn answered_checkouts(&self) -> Vec<(String, Option<String>)> {
        self.checkouts.lock().await.clone()
    }

    /// Current content of a message after all edits.
    pub async fn content_of(&self, id: &MessageId) -> Option<Content> {
        self.current.lock().await.get(id).cloned()
    }

    pub async fn clear(&self) {
        self.sent.lock().await.clear();
        self.edits.lock().await.clear();
        self.answered.lock().await.clear();
        self.invoices.lock().await.clear();
        self.checkouts.lock().await.clear();
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl Transport for MockChannel {
    async fn send(&self, user: UserId, content: Content) -> Result<MessageId, ParleyError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(ParleyError::transport("mock send failure"));
        }
        let id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst).to_string());
        self.current.lock().await.insert(id.clone(), content.clone());
        self.sent.lock().await.push(SentMessage {
            user,
            id: id.clone(),
            content,
        });
        Ok(id)
    }

    async fn edit(
        &self,
        user: UserId,
        message: &MessageId,
        content: Content,
    ) -> Result<EditOutcome, ParleyError> {
        let outcome = {
            let mut current = self.current.lock().await;
            let Some(existing) = current.get_mut(message) else {
                return Err(ParleyError::transport(format!(
                    "message {message} not found"
                )));
            };
            if *existing == content {
                EditOutcome::Unchanged
            } else {
                *existing = content.clone();
                EditOutcome::Edited
            }
        };
        self.edits.lock().await.push(EditRecord {
            user,
            message: message.clone(),
            content,
            outcome,
        });
        Ok(outcome)
    }

    async fn answer_click(
        &self,
        callback_id: &str,
        notice: Option<&str>,
    ) -> Result<(), ParleyError> {
        self.answered
            .lock()
            .await
            .push((callback_id.to_string(), notice.map(str::to_string)));
        Ok(())
    }

    async fn send_invoice(&self, user: UserId, invoice: &Invoice) -> Result<MessageId, ParleyError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(ParleyError::transport("mock send failure"));
        }
        let id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst).to_string());
        self.invoices.lock().await.push((user, invoice.clone()));
        Ok(id)
    }

    async fn answer_checkout(
        &self,
        checkout_id: &str,
        error: Option<&str>,
    ) -> Result<(), ParleyError> {
        self.checkouts
            .lock()
            .await
            .push((checkout_id.to_string(), error.map(str::to_string)));
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    async fn connect(&mut self) -> Result<(), ParleyError> {
        Ok(())
    }

    async fn receive(&self) -> Result<InboundEvent, ParleyError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(event) = queue.pop_front() {
                    return Ok(event);
                }
            }
            self.notify.notified().await;
        }
    }
}
