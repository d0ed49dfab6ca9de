//! The fixed planning window: Monday to Saturday, 07:00 to 20:00, in half-hour slots.

use time::macros::{format_description, time};
use time::{Date, Duration, Time, Weekday};

/// Number of visible day columns (Monday through Saturday).
pub const DAY_COUNT: u8 = 6;
/// First schedulable time of day.
pub const DAY_START: Time = time!(7:00);
/// Last schedulable time of day (exclusive for starts, inclusive for ends).
pub const DAY_END: Time = time!(20:00);
/// Length of one slot in minutes.
pub const SLOT_MINUTES: u16 = 30;
/// Number of slots between [`DAY_START`] and [`DAY_END`].
pub const SLOT_COUNT: i32 = 26;

/// Minutes elapsed since midnight, ignoring seconds.
#[must_use]
pub fn minute_of_day(time: Time) -> u16 {
    u16::from(time.hour()) * 60 + u16::from(time.minute())
}

/// Build a time of day from minutes since midnight.
#[must_use]
pub fn from_minute_of_day(minutes: u16) -> Option<Time> {
    let hour = u8::try_from(minutes / 60).ok()?;
    let minute = u8::try_from(minutes % 60).ok()?;
    Time::from_hms(hour, minute, 0).ok()
}

/// True when the time sits exactly on a half-hour boundary.
#[must_use]
pub fn is_slot_aligned(time: Time) -> bool {
    time.second() == 0 && time.nanosecond() == 0 && minute_of_day(time) % SLOT_MINUTES == 0
}

/// Slot index of a time relative to [`DAY_START`]; partial slots round down.
#[must_use]
pub fn slot_of(time: Time) -> i32 {
    let offset = i32::from(minute_of_day(time)) - i32::from(minute_of_day(DAY_START));
    offset.div_euclid(i32::from(SLOT_MINUTES))
}

/// Time of day at the given slot index, clamped to the planning window.
#[must_use]
pub fn time_at_slot(slot: i32) -> Time {
    let slot = slot.clamp(0, SLOT_COUNT);
    let minutes = i32::from(minute_of_day(DAY_START)) + slot * i32::from(SLOT_MINUTES);
    u16::try_from(minutes)
        .ok()
        .and_then(from_minute_of_day)
        .unwrap_or(DAY_START)
}

/// Whole minutes from `start` to `end` (negative when `end` precedes `start`).
#[must_use]
pub fn minutes_between(start: Time, end: Time) -> i32 {
    i32::from(minute_of_day(end)) - i32::from(minute_of_day(start))
}

/// Format a time as `HH:MM`.
#[must_use]
pub fn format_hhmm(time: Time) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

/// Parse a strict `YYYY-MM-DD` date.
#[must_use]
pub fn parse_iso_date(text: &str) -> Option<Date> {
    let shaped = text.len() == 10
        && text
            .bytes()
            .enumerate()
            .all(|(idx, byte)| if idx == 4 || idx == 7 { byte == b'-' } else { byte.is_ascii_digit() });
    if !shaped {
        return None;
    }
    Date::parse(text, format_description!("[year]-[month]-[day]")).ok()
}

/// Parse a strict 24-hour `HH:MM` time.
#[must_use]
pub fn parse_hhmm(text: &str) -> Option<Time> {
    let shaped = text.len() == 5
        && text
            .bytes()
            .enumerate()
            .all(|(idx, byte)| if idx == 2 { byte == b':' } else { byte.is_ascii_digit() });
    if !shaped {
        return None;
    }
    Time::parse(text, format_description!("[hour]:[minute]")).ok()
}

/// Column index of a date (Monday = 0 .. Saturday = 5); Sunday has no column.
#[must_use]
pub fn day_index(date: Date) -> Option<u8> {
    match date.weekday() {
        Weekday::Sunday => None,
        other => Some(other.number_days_from_monday()),
    }
}

/// Monday on or before `date`.
#[must_use]
pub fn week_start(date: Date) -> Date {
    let back = i64::from(date.weekday().number_days_from_monday());
    date.checked_sub(Duration::days(back)).unwrap_or(date)
}

/// The six visible dates of the week starting at `monday`.
#[must_use]
pub fn week_dates(monday: Date) -> Vec<Date> {
    (0..i64::from(DAY_COUNT))
        .filter_map(|offset| monday.checked_add(Duration::days(offset)))
        .collect()
}
