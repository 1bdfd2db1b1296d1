// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Requests for personal lessons, resolved by admins.

use parley_core::{ParleyError, UserId};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::LessonRequest;

fn row_to_request(row: &rusqlite::Row<'_>) -> rusqlite::Result<LessonRequest> {
    Ok(LessonRequest {
        user_id: UserId(row.get(0)?),
        username: row.get(1)?,
        phone: row.get(2)?,
        resolved: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Files a request. Returns `false` if the user already has one, resolved or not.
pub async fn add_request(
    db: &Database,
    user: UserId,
    username: Option<&str>,
    phone: Option<&str>,
) -> Result<bool, ParleyError> {
    let username = username.map(str::to_string);
    let phone = phone.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "INSERT INTO lesson_requests (user_id, username, phone) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id) DO NOTHING",
                params![user.0, username, phone],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_request(db: &Database, user: UserId) -> Result<Option<LessonRequest>, ParleyError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT user_id, username, phone, resolved, created_at
                 FROM lesson_requests WHERE user_id = ?1",
                params![user.0],
                row_to_request,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Unresolved requests, oldest first.
pub async fn open_requests(db: &Database) -> Result<Vec<LessonRequest>, ParleyError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, username, phone, resolved, created_at
                 FROM lesson_requests WHERE resolved = 0 ORDER BY created_at, user_id",
            )?;
            let rows = stmt.query_map([], row_to_request)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Marks a request resolved. Returns `false` if there was no open request.
pub async fn resolve_request(db: &Database, user: UserId) -> Result<bool, ParleyError> {
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "UPDATE lesson_requests SET resolved = 1 WHERE user_id = ?1 AND resolved = 0",
                params![user.0],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}
