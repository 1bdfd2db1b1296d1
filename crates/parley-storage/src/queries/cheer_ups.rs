// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cheer-up messages managed by admins and appended to reminders.

use parley_core::ParleyError;
use rand::Rng;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::CheerUp;

/// Stores a new message. Returns its id.
pub async fn add_cheer_up(db: &Database, body: &str) -> Result<i64, ParleyError> {
    let body = body.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute("INSERT INTO cheer_ups (body) VALUES (?1)", params![body])?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// All messages, oldest first.
pub async fn list_cheer_ups(db: &Database) -> Result<Vec<CheerUp>, ParleyError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, body, created_at FROM cheer_ups ORDER BY id ASC")?;
            let rows = stmt.query_map([], |row| {
                Ok(CheerUp {
                    id: row.get(0)?,
                    body: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete_cheer_up(db: &Database, id: i64) -> Result<bool, ParleyError> {
    db.connection()
        .call(move |conn| {
            let n = conn.execute("DELETE FROM cheer_ups WHERE id = ?1", params![id])?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// A uniformly random message, `None` when there are none.
pub async fn random_cheer_up(db: &Database) -> Result<Option<String>, ParleyError> {
    db.connection()
        .call(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM cheer_ups", [], |row| row.get(0))?;
            if count == 0 {
                return Ok(None);
            }
            let offset = rand::thread_rng().gen_range(0..count);
            conn.query_row(
                "SELECT body FROM cheer_ups ORDER BY id LIMIT 1 OFFSET ?1",
                params![offset],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}
