// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Weekly notification settings: per-weekday switch and local trigger time,
//! plus a global switch per user.
//!
//! Missing rows read as defaults (weekday off at 10:00, global switch on).

use chrono::{NaiveTime, Weekday};
use parley_core::schedule::{self, DaySlot, WeekSchedule, WEEK};
use parley_core::{ParleyError, UserId};
use rusqlite::{Connection, OptionalExtension, params};

use crate::database::{Database, map_tr_err};

fn day_index(day: Weekday) -> i64 {
    i64::from(day.num_days_from_monday())
}

/// Creates the seven weekday rows and the global switch if absent.
pub async fn seed_defaults(db: &Database, user: UserId) -> Result<(), ParleyError> {
    let default_time = schedule::format_hhmm(schedule::default_trigger_time());
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            for day in WEEK {
                tx.execute(
                    "INSERT INTO notification_days (user_id, day_of_week, trigger_switch, trigger_time)
                     VALUES (?1, ?2, 0, ?3)
                     ON CONFLICT(user_id, day_of_week) DO NOTHING",
                    params![user.0, day_index(day), default_time],
                )?;
            }
            tx.execute(
                "INSERT INTO notification_global (user_id, global_switch) VALUES (?1, 1)
                 ON CONFLICT(user_id) DO NOTHING",
                params![user.0],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

fn read_schedule(conn: &Connection, user: UserId) -> rusqlite::Result<Option<WeekSchedule>> {
    let offset: Option<i32> = conn
        .query_row(
            "SELECT utc_offset_minutes FROM users WHERE user_id = ?1",
            params![user.0],
            |row| row.get(0),
        )
        .optional()?;
    let Some(utc_offset_minutes) = offset else {
        return Ok(None);
    };

    let global_enabled: bool = conn
        .query_row(
            "SELECT global_switch FROM notification_global WHERE user_id = ?1",
            params![user.0],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(true);

    let mut days: Vec<DaySlot> = WEEK
        .iter()
        .map(|&weekday| DaySlot {
            weekday,
            enabled: false,
            time: schedule::default_trigger_time(),
        })
        .collect();

    let mut stmt = conn.prepare(
        "SELECT day_of_week, trigger_switch, trigger_time
         FROM notification_days WHERE user_id = ?1",
    )?;
    let rows = stmt.query_map(params![user.0], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, bool>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;
    for row in rows {
        let (idx, enabled, time) = row?;
        let Some(slot) = usize::try_from(idx).ok().and_then(|i| days.get_mut(i)) else {
            continue;
        };
        slot.enabled = enabled;
        match schedule::parse_hhmm(&time) {
            Some(t) => slot.time = t,
            None => tracing::warn!(user = %user, time = %time, "invalid stored trigger time, using default"),
        }
    }

    Ok(Some(WeekSchedule {
        global_enabled,
        utc_offset_minutes,
        days,
    }))
}

/// The user's schedule, or `None` if the user has no profile.
pub async fn load_schedule(db: &Database, user: UserId) -> Result<Option<WeekSchedule>, ParleyError> {
    db.connection()
        .call(move |conn| read_schedule(conn, user))
        .await
        .map_err(map_tr_err)
}

/// Schedules of the given users, or of every registered user.
pub async fn load_schedules(
    db: &Database,
    users: Option<&[UserId]>,
) -> Result<Vec<(UserId, WeekSchedule)>, ParleyError> {
    let users = users.map(<[UserId]>::to_vec);
    db.connection()
        .call(move |conn| {
            let ids = match users {
                Some(ids) => ids,
                None => {
                    let mut stmt = conn.prepare("SELECT user_id FROM users ORDER BY user_id")?;
                    let rows = stmt.query_map([], |row| Ok(UserId(row.get(0)?)))?;
                    rows.collect::<rusqlite::Result<Vec<_>>>()?
                }
            };
            let mut out = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(schedule) = read_schedule(conn, id)? {
                    out.push((id, schedule));
                }
            }
            Ok(out)
        })
        .await
        .map_err(map_tr_err)
}

/// Flips one weekday's switch and returns the new value.
pub async fn toggle_day(db: &Database, user: UserId, day: Weekday) -> Result<bool, ParleyError> {
    let default_time = schedule::format_hhmm(schedule::default_trigger_time());
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "INSERT INTO notification_days (user_id, day_of_week, trigger_switch, trigger_time)
                 VALUES (?1, ?2, 1, ?3)
                 ON CONFLICT(user_id, day_of_week)
                 DO UPDATE SET trigger_switch = 1 - trigger_switch
                 RETURNING trigger_switch",
                params![user.0, day_index(day), default_time],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_day_time(
    db: &Database,
    user: UserId,
    day: Weekday,
    time: NaiveTime,
) -> Result<(), ParleyError> {
    let time = schedule::format_hhmm(time);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO notification_days (user_id, day_of_week, trigger_switch, trigger_time)
                 VALUES (?1, ?2, 0, ?3)
                 ON CONFLICT(user_id, day_of_week) DO UPDATE SET trigger_time = excluded.trigger_time",
                params![user.0, day_index(day), time],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Flips the global switch and returns the new value.
pub async fn toggle_global(db: &Database, user: UserId) -> Result<bool, ParleyError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "INSERT INTO notification_global (user_id, global_switch) VALUES (?1, 0)
                 ON CONFLICT(user_id) DO UPDATE SET global_switch = 1 - global_switch
                 RETURNING global_switch",
                params![user.0],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}
