// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user dialog records: state, variables, tracked menu message, return menu.
//!
//! Rows are created lazily by the first write. Variables are a JSON object of
//! string values; updates read and rewrite it inside one connection call.

use std::collections::HashMap;

use parley_core::{MenuName, MessageId, ParleyError, StateName, UserId};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::DialogRecord;

const ENSURE_ROW: &str = "INSERT INTO dialog_states (user_id) VALUES (?1) ON CONFLICT(user_id) DO NOTHING";

fn decode_vars(raw: &str) -> serde_json::Map<String, serde_json::Value> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => {
            tracing::warn!("dialog variables are not a JSON object, treating as empty");
            serde_json::Map::new()
        }
    }
}

fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Reads one text column of the user's record.
async fn get_column(
    db: &Database,
    user: UserId,
    column: &'static str,
) -> Result<Option<String>, ParleyError> {
    db.connection()
        .call(move |conn| {
            let value: Option<Option<String>> = conn
                .query_row(
                    &format!("SELECT {column} FROM dialog_states WHERE user_id = ?1"),
                    params![user.0],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value.flatten())
        })
        .await
        .map_err(map_tr_err)
}

/// Upserts one text column of the user's record.
async fn set_column(
    db: &Database,
    user: UserId,
    column: &'static str,
    value: Option<String>,
) -> Result<(), ParleyError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO dialog_states (user_id, {column}) VALUES (?1, ?2)
                     ON CONFLICT(user_id) DO UPDATE SET {column} = excluded.{column},
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')"
                ),
                params![user.0, value],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_state(db: &Database, user: UserId) -> Result<Option<StateName>, ParleyError> {
    Ok(get_column(db, user, "state").await?.map(StateName::from))
}

pub async fn set_state(
    db: &Database,
    user: UserId,
    state: Option<&StateName>,
) -> Result<(), ParleyError> {
    set_column(db, user, "state", state.map(|s| s.to_string())).await
}

pub async fn get_tracked_message_id(
    db: &Database,
    user: UserId,
) -> Result<Option<MessageId>, ParleyError> {
    Ok(get_column(db, user, "message_id").await?.map(MessageId))
}

pub async fn set_tracked_message_id(
    db: &Database,
    user: UserId,
    message: &MessageId,
) -> Result<(), ParleyError> {
    set_column(db, user, "message_id", Some(message.0.clone())).await
}

pub async fn get_return_menu(db: &Database, user: UserId) -> Result<Option<MenuName>, ParleyError> {
    Ok(get_column(db, user, "return_menu").await?.map(MenuName::from))
}

pub async fn set_return_menu(
    db: &Database,
    user: UserId,
    menu: Option<&MenuName>,
) -> Result<(), ParleyError> {
    set_column(db, user, "return_menu", menu.map(|m| m.to_string())).await
}

pub async fn get_all_vars(
    db: &Database,
    user: UserId,
) -> Result<HashMap<String, String>, ParleyError> {
    let raw = get_column(db, user, "variables").await?;
    Ok(raw
        .map(|raw| {
            decode_vars(&raw)
                .iter()
                .map(|(k, v)| (k.clone(), value_to_string(v)))
                .collect()
        })
        .unwrap_or_default())
}

pub async fn get_var(db: &Database, user: UserId, key: &str) -> Result<Option<String>, ParleyError> {
    let mut vars = get_all_vars(db, user).await?;
    Ok(vars.remove(key))
}

pub async fn set_var(db: &Database, user: UserId, key: &str, value: &str) -> Result<(), ParleyError> {
    let key = key.to_string();
    let value = value.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(ENSURE_ROW, params![user.0])?;
            let raw: String = tx.query_row(
                "SELECT variables FROM dialog_states WHERE user_id = ?1",
                params![user.0],
                |row| row.get(0),
            )?;
            let mut vars = decode_vars(&raw);
            vars.insert(key, serde_json::Value::String(value));
            let encoded = serde_json::Value::Object(vars).to_string();
            tx.execute(
                "UPDATE dialog_states SET variables = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE user_id = ?2",
                params![encoded, user.0],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn clear_vars(db: &Database, user: UserId) -> Result<(), ParleyError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE dialog_states SET variables = '{}',
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE user_id = ?1",
                params![user.0],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The whole record, or `None` if the user never interacted.
pub async fn get_record(db: &Database, user: UserId) -> Result<Option<DialogRecord>, ParleyError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT state, variables, message_id, return_menu
                 FROM dialog_states WHERE user_id = ?1",
                params![user.0],
                |row| {
                    let state: Option<String> = row.get(0)?;
                    let variables: String = row.get(1)?;
                    let message_id: Option<String> = row.get(2)?;
                    let return_menu: Option<String> = row.get(3)?;
                    Ok(DialogRecord {
                        state: state.map(StateName::from),
                        variables: decode_vars(&variables),
                        message_id: message_id.map(MessageId),
                        return_menu: return_menu.map(MenuName::from),
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Users currently inside a dialog.
pub async fn list_active_users(db: &Database) -> Result<Vec<(UserId, StateName)>, ParleyError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, state FROM dialog_states
                 WHERE state IS NOT NULL ORDER BY user_id",
            )?;
            let rows = stmt.query_map([], |row| {
                let state: String = row.get(1)?;
                Ok((UserId(row.get(0)?), StateName::from(state)))
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
