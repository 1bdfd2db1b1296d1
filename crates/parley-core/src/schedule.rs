// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Weekly notification schedule math.
//!
//! A user enables notifications per weekday, each with a local trigger time,
//! and carries a raw UTC offset in minutes. [`next_occurrence`] picks the
//! nearest future UTC instant across all enabled weekdays.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Timelike, Utc, Weekday};

/// Weekdays in storage order (Monday first).
pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Trigger time used for days the user never configured.
pub fn default_trigger_time() -> NaiveTime {
    NaiveTime::from_hms_opt(10, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// One weekday's notification setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySlot {
    pub weekday: Weekday,
    pub enabled: bool,
    pub time: NaiveTime,
}

/// A user's full notification settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekSchedule {
    pub global_enabled: bool,
    pub utc_offset_minutes: i32,
    pub days: Vec<DaySlot>,
}

impl WeekSchedule {
    /// Global switch on and at least one weekday enabled.
    pub fn is_eligible(&self) -> bool {
        self.global_enabled && self.days.iter().any(|d| d.enabled)
    }

    /// Next fire instant, or `None` when the user is not eligible.
    pub fn next_occurrence(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if !self.global_enabled {
            return None;
        }
        next_occurrence(now, self.utc_offset_minutes, &self.days)
    }
}

/// Nearest future UTC instant among the enabled slots.
///
/// Today's slot counts only while its local time is still ahead; otherwise
/// the same weekday rolls over a full week.
pub fn next_occurrence(
    now: DateTime<Utc>,
    utc_offset_minutes: i32,
    slots: &[DaySlot],
) -> Option<DateTime<Utc>> {
    let offset = Duration::minutes(i64::from(utc_offset_minutes));
    let local = now.naive_utc() + offset;
    let today = i64::from(local.weekday().num_days_from_monday());
    let local_time = local.time();

    slots
        .iter()
        .filter(|slot| slot.enabled)
        .map(|slot| {
            let day = i64::from(slot.weekday.num_days_from_monday());
            let delta = if day == today && local_time < slot.time {
                0
            } else if day > today {
                day - today
            } else {
                7 - today + day
            };
            let fire_local = local.date().and_time(slot.time) + Duration::days(delta);
            (fire_local - offset).and_utc()
        })
        .min()
}

/// Three-letter lowercase weekday code used in menu data keys and button ids.
pub fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

/// Inverse of [`weekday_code`].
pub fn weekday_from_code(code: &str) -> Option<Weekday> {
    WEEK.iter().copied().find(|d| weekday_code(*d) == code)
}

/// Parses `H:MM` or `HH:MM` (hour 0-23, minute 0-59).
pub fn parse_hhmm(input: &str) -> Option<NaiveTime> {
    let (h, m) = input.trim().split_once(':')?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return None;
    }
    if !h.bytes().chain(m.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveTime::from_hms_opt(h.parse().ok()?, m.parse().ok()?, 0)
}

pub fn format_hhmm(time: NaiveTime) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

/// Derives a UTC offset from the user's reported local wall-clock time.
///
/// The raw difference is wrapped into `[-720, 840]` minutes (the range of
/// real-world offsets) and rounded to the nearest half hour.
pub fn offset_from_local_time(now: DateTime<Utc>, local: NaiveTime) -> i32 {
    let user_minutes = (local.hour() * 60 + local.minute()) as i32;
    let utc_minutes = (now.hour() * 60 + now.minute()) as i32;
    let mut delta = user_minutes - utc_minutes;
    if delta < -720 {
        delta += 1440;
    }
    if delta > 840 {
        delta -= 1440;
    }
    ((f64::from(delta) / 30.0).round() as i32) * 30
}

/// Formats an offset as `UTC+HH:MM` / `UTC-HH:MM`.
pub fn format_utc_offset(minutes: i32) -> String {
    let sign = if minutes < 0 { '-' } else { '+' };
    let abs = minutes.unsigned_abs();
    format!("UTC{sign}{:02}:{:02}", abs / 60, abs % 60)
}
