//! Date and time helpers shared by the booking flow and the tables.
//!
//! The backend speaks in naive local dates (`YYYY-MM-DD`) and wall-clock
//! times (`HH:MM`, sometimes with seconds). Everything the client submits
//! back is an absolute UTC instant, so the conversions here are the only
//! place where a time zone is applied.

use chrono::{
    DateTime, Datelike, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;

use crate::errors::{SchedulerError, SchedulerResult};

const WALL_TIME_FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S"];

/// Parses a backend wall-clock time, with or without seconds.
pub fn parse_wall_time(value: &str) -> SchedulerResult<NaiveTime> {
    let trimmed = value.trim();
    WALL_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| SchedulerError::MalformedResponse(format!("invalid time `{value}`")))
}

/// Serde adapter for `HH:MM` wall-clock fields.
pub mod wall_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_wall_time(&raw).map_err(serde::de::Error::custom)
    }
}

/// `14:00` renders as `2:00 PM`.
pub fn format_time(time: NaiveTime) -> String {
    time.format("%-I:%M %p").to_string()
}

/// Formats a start/end pair the way the confirmation view shows it.
pub fn format_time_range(start: NaiveTime, end: NaiveTime) -> String {
    format!("{} - {}", format_time(start), format_time(end))
}

/// Long form date, e.g. `Wednesday, May 1st, 2024`.
pub fn format_long_date(date: NaiveDate) -> String {
    let day = date.day();
    format!(
        "{}, {} {}{}, {}",
        date.format("%A"),
        date.format("%B"),
        day,
        ordinal_suffix(day),
        date.year()
    )
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

pub fn day_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Pins a wall-clock time on a date to an instant in `tz`.
///
/// During a fall-back overlap the earlier instant is used. A time that falls
/// in a spring-forward gap does not exist and is rejected.
pub fn localize(tz: Tz, date: NaiveDate, time: NaiveTime) -> SchedulerResult<DateTime<Tz>> {
    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .ok_or_else(|| {
            SchedulerError::Validation(format!(
                "{date} {} does not exist in {}",
                time.format("%H:%M"),
                tz.name()
            ))
        })
}

/// Resolves a slot's start and end instants.
///
/// An end time before the start time belongs to the next day, so a
/// `23:30`-`00:00` slot spans midnight instead of running backwards. Equal
/// times give an empty slot.
pub fn slot_bounds(
    tz: Tz,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
) -> SchedulerResult<(DateTime<Tz>, DateTime<Tz>)> {
    let start_at = localize(tz, date, start)?;
    let end_date = if end < start {
        date.succ_opt()
            .ok_or_else(|| SchedulerError::Validation(format!("no day after {date}")))?
    } else {
        date
    };
    let end_at = localize(tz, end_date, end)?;
    Ok((start_at, end_at))
}

/// Whole minutes between two instants, floored.
pub fn minutes_between(start: &DateTime<Tz>, end: &DateTime<Tz>) -> i64 {
    end.signed_duration_since(start).num_seconds().div_euclid(60)
}

/// `2024-05-01T21:00:00.000Z`
pub fn to_utc_iso(instant: &DateTime<Tz>) -> String {
    instant
        .with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn from_utc_iso(value: &str, tz: Tz) -> SchedulerResult<DateTime<Tz>> {
    DateTime::parse_from_rfc3339(value)
        .map(|instant| instant.with_timezone(&tz))
        .map_err(|err| SchedulerError::MalformedResponse(format!("invalid timestamp `{value}`: {err}")))
}

/// Zone abbreviation in effect at `instant`, e.g. `PDT`.
pub fn zone_abbreviation(instant: &DateTime<Tz>) -> String {
    instant.format("%Z").to_string()
}
