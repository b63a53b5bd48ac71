// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{Datelike, TimeZone, Weekday};
use yare::parameterized;

use super::*;

fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

#[test]
fn every_minute_is_due_since_epoch() {
    let schedule = CronSchedule::parse("* * * * *", None).unwrap();
    let epoch = Utc.timestamp_opt(0, 0).unwrap();
    assert!(schedule.is_due(epoch, utc(2026, 3, 1, 12, 0, 30)));
}

#[test]
fn yearly_not_due_seconds_after_last_fire() {
    let schedule = CronSchedule::parse("0 0 1 1 *", None).unwrap();
    let last_check = utc(2026, 1, 1, 0, 0, 5);
    let now = utc(2026, 1, 1, 0, 0, 20);
    assert!(!schedule.is_due(last_check, now));
}

#[test]
fn due_window_is_half_open() {
    let schedule = CronSchedule::parse("30 * * * *", None).unwrap();
    // Fire at exactly `now` counts
    assert!(schedule.is_due(utc(2026, 1, 1, 10, 0, 0), utc(2026, 1, 1, 10, 30, 0)));
    // Fire at exactly `last_check` does not
    assert!(!schedule.is_due(utc(2026, 1, 1, 10, 30, 0), utc(2026, 1, 1, 10, 45, 0)));
}

#[test]
fn next_after_honours_timezone() {
    let schedule = CronSchedule::parse("0 9 * * *", Some("America/New_York")).unwrap();
    let next = schedule.next_after(utc(2026, 1, 15, 0, 0, 0)).unwrap();
    assert_eq!(next, utc(2026, 1, 15, 14, 0, 0));
}

#[parameterized(
    sunday_zero = { "0 12 * * 0", Weekday::Sun },
    sunday_seven = { "0 12 * * 7", Weekday::Sun },
    monday = { "0 12 * * 1", Weekday::Mon },
    saturday = { "0 12 * * 6", Weekday::Sat },
    named = { "0 12 * * Wed", Weekday::Wed },
)]
fn day_of_week_uses_standard_numbering(expr: &str, expected: Weekday) {
    let schedule = CronSchedule::parse(expr, None).unwrap();
    // 2026-01-01 is a Thursday
    let next = schedule.next_after(utc(2026, 1, 1, 0, 0, 0)).unwrap();
    assert_eq!(next.weekday(), expected);
}

#[test]
fn weekday_range_skips_weekend() {
    let schedule = CronSchedule::parse("0 9 * * 1-5", None).unwrap();
    // Friday 2026-01-02 10:00 -> next is Monday 2026-01-05 09:00
    let next = schedule.next_after(utc(2026, 1, 2, 10, 0, 0)).unwrap();
    assert_eq!(next, utc(2026, 1, 5, 9, 0, 0));
}

#[test]
fn seconds_form_passes_through() {
    let schedule = CronSchedule::parse("*/10 * * * * *", None).unwrap();
    let next = schedule.next_after(utc(2026, 1, 1, 0, 0, 1)).unwrap();
    assert_eq!(next, utc(2026, 1, 1, 0, 0, 10));
}

#[parameterized(
    too_few = { "* * *" },
    garbage = { "not a cron expr" },
    bad_dow = { "0 0 * * 9" },
    bad_minute = { "61 * * * *" },
)]
fn invalid_expressions_error(expr: &str) {
    assert!(matches!(CronSchedule::parse(expr, None), Err(ScheduleError::Expression { .. })));
}

#[test]
fn unknown_timezone_errors() {
    assert!(matches!(
        CronSchedule::parse("* * * * *", Some("Mars/Olympus")),
        Err(ScheduleError::Timezone(_))
    ));
}
