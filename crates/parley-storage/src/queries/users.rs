// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User profile operations.

use parley_core::{ParleyError, UserId};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::UserProfile;

fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        user_id: UserId(row.get(0)?),
        username: row.get(1)?,
        display_name: row.get(2)?,
        age: row.get(3)?,
        city: row.get(4)?,
        utc_offset_minutes: row.get(5)?,
        timezone_label: row.get(6)?,
        experience: row.get(7)?,
    })
}

/// Inserts or fully replaces a profile. Notification settings are untouched.
pub async fn upsert_user(db: &Database, profile: &UserProfile) -> Result<(), ParleyError> {
    let p = profile.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO users (user_id, username, display_name, age, city,
                                    utc_offset_minutes, timezone_label, experience)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(user_id) DO UPDATE SET
                    username = excluded.username,
                    display_name = excluded.display_name,
                    age = excluded.age,
                    city = excluded.city,
                    utc_offset_minutes = excluded.utc_offset_minutes,
                    timezone_label = excluded.timezone_label,
                    experience = excluded.experience,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![
                    p.user_id.0,
                    p.username,
                    p.display_name,
                    p.age,
                    p.city,
                    p.utc_offset_minutes,
                    p.timezone_label,
                    p.experience,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_user(db: &Database, user: UserId) -> Result<Option<UserProfile>, ParleyError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT user_id, username, display_name, age, city,
                        utc_offset_minutes, timezone_label, experience
                 FROM users WHERE user_id = ?1",
                params![user.0],
                row_to_profile,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn user_exists(db: &Database, user: UserId) -> Result<bool, ParleyError> {
    Ok(get_user(db, user).await?.is_some())
}

pub async fn list_user_ids(db: &Database) -> Result<Vec<UserId>, ParleyError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT user_id FROM users ORDER BY user_id")?;
            let rows = stmt.query_map([], |row| Ok(UserId(row.get(0)?)))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete_user(db: &Database, user: UserId) -> Result<bool, ParleyError> {
    db.connection()
        .call(move |conn| {
            let n = conn.execute("DELETE FROM users WHERE user_id = ?1", params![user.0])?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}
