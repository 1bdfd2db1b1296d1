// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyed sorted sets of users scored by UNIX timestamp.

use parley_core::{ParleyError, UserId};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// Inserts the member or overwrites its score.
pub async fn zadd(db: &Database, key: &str, member: UserId, score: i64) -> Result<(), ParleyError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sorted_sets (set_key, member, score) VALUES (?1, ?2, ?3)
                 ON CONFLICT(set_key, member) DO UPDATE SET score = excluded.score",
                params![key, member.0, score],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn zscore(db: &Database, key: &str, member: UserId) -> Result<Option<i64>, ParleyError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT score FROM sorted_sets WHERE set_key = ?1 AND member = ?2",
                params![key, member.0],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn zrem(db: &Database, key: &str, member: UserId) -> Result<(), ParleyError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM sorted_sets WHERE set_key = ?1 AND member = ?2",
                params![key, member.0],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Members with `min <= score <= max`, ascending by score then member.
pub async fn zrange_by_score(
    db: &Database,
    key: &str,
    min: i64,
    max: i64,
) -> Result<Vec<UserId>, ParleyError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT member FROM sorted_sets
                 WHERE set_key = ?1 AND score BETWEEN ?2 AND ?3
                 ORDER BY score ASC, member ASC",
            )?;
            let rows = stmt.query_map(params![key, min, max], |row| Ok(UserId(row.get(0)?)))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn zcard(db: &Database, key: &str) -> Result<u64, ParleyError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM sorted_sets WHERE set_key = ?1",
                params![key],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

pub async fn del(db: &Database, key: &str) -> Result<(), ParleyError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM sorted_sets WHERE set_key = ?1", params![key])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
