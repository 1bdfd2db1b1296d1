// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Multi-message recordings kept in the dialog variable bag until saved.
//!
//! Part `i` of a recording under `prefix` is stored as JSON in the variable
//! `{prefix}_{i}`; `{prefix}_count` holds the number of parts.

use parley_core::{InboundEvent, ParleyError};
use parley_dialog::DialogContext;
use parley_storage::RecordedPart;

pub const STOP_WORD: &str = "STOP";
pub const CANCEL_WORD: &str = "CANCEL";

/// What the admin sent while a recording was open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Stop,
    Cancel,
    Record,
}

pub fn command(ctx: &DialogContext) -> Command {
    match ctx.text() {
        Some(STOP_WORD) => Command::Stop,
        Some(CANCEL_WORD) => Command::Cancel,
        _ => Command::Record,
    }
}

/// Rejects events that cannot be replayed: contacts, clicks, payments.
pub fn validate(ctx: &DialogContext) -> Option<String> {
    match ctx.event().and_then(InboundEvent::as_content) {
        Some(_) => None,
        None => Some("Only text, photos, video, audio, voice and documents can be recorded.".into()),
    }
}

fn count_key(prefix: &str) -> String {
    format!("{prefix}_count")
}

async fn count(ctx: &DialogContext, prefix: &str) -> Result<usize, ParleyError> {
    Ok(ctx
        .get_var(&count_key(prefix))
        .await?
        .and_then(|c| c.parse().ok())
        .unwrap_or(0))
}

/// Stores the current event as the next part. Returns the new part count.
pub async fn append(ctx: &DialogContext, prefix: &str) -> Result<usize, ParleyError> {
    let content = ctx
        .event()
        .and_then(InboundEvent::as_content)
        .ok_or_else(|| ParleyError::Internal("nothing to record in this event".into()))?;
    let part = RecordedPart::from_content(&content);
    let encoded = serde_json::to_string(&part).map_err(ParleyError::storage)?;
    let n = count(ctx, prefix).await?;
    ctx.set_var(&format!("{prefix}_{n}"), &encoded).await?;
    ctx.set_var(&count_key(prefix), &(n + 1).to_string()).await?;
    Ok(n + 1)
}

/// Starts the recording under `prefix` over. Stale parts are overwritten by later appends.
pub async fn clear(ctx: &DialogContext, prefix: &str) -> Result<(), ParleyError> {
    ctx.set_var(&count_key(prefix), "0").await
}

/// Recorded parts in the order they arrived.
pub async fn parts(ctx: &DialogContext, prefix: &str) -> Result<Vec<RecordedPart>, ParleyError> {
    let vars = ctx.vars().await?;
    let n: usize = vars
        .get(&count_key(prefix))
        .and_then(|c| c.parse().ok())
        .unwrap_or(0);
    (0..n)
        .filter_map(|i| vars.get(&format!("{prefix}_{i}")))
        .map(|raw| serde_json::from_str(raw).map_err(ParleyError::storage))
        .collect()
}
