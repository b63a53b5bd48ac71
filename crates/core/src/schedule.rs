// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron schedules evaluated in a timezone.
//!
//! Accepts standard five-field expressions (`min hour dom month dow`, Sunday
//! is 0 or 7) as well as the six/seven-field form with seconds. Five-field
//! expressions are translated to the seconds form before parsing.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid cron expression '{expr}': {reason}")]
    Expression { expr: String, reason: String },
    #[error("unknown timezone '{0}'")]
    Timezone(String),
}

#[derive(Debug, Clone)]
pub struct CronSchedule {
    schedule: cron::Schedule,
    tz: Tz,
}

impl CronSchedule {
    /// Parse `expr` in `timezone` (UTC when absent).
    pub fn parse(expr: &str, timezone: Option<&str>) -> Result<Self, ScheduleError> {
        let tz = match timezone.map(str::trim).filter(|s| !s.is_empty()) {
            Some(name) => {
                Tz::from_str(name).map_err(|_| ScheduleError::Timezone(name.to_string()))?
            }
            None => Tz::UTC,
        };
        let normalized = normalize(expr)?;
        let schedule = cron::Schedule::from_str(&normalized).map_err(|e| {
            ScheduleError::Expression { expr: expr.to_string(), reason: e.to_string() }
        })?;
        Ok(Self { schedule, tz })
    }

    /// First fire time strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = after.with_timezone(&self.tz);
        self.schedule.after(&local).next().map(|t| t.with_timezone(&Utc))
    }

    /// True iff the schedule fires at least once in `(last_check, now]`.
    pub fn is_due(&self, last_check: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.next_after(last_check).is_some_and(|next| next <= now)
    }
}

fn normalize(expr: &str) -> Result<String, ScheduleError> {
    let trimmed = expr.trim();
    if trimmed.starts_with('@') {
        return Ok(trimmed.to_string());
    }
    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    match fields.len() {
        5 => {
            let dow = convert_day_of_week(fields[4]).ok_or_else(|| ScheduleError::Expression {
                expr: expr.to_string(),
                reason: format!("invalid day-of-week field '{}'", fields[4]),
            })?;
            Ok(format!("0 {} {} {} {} {}", fields[0], fields[1], fields[2], fields[3], dow))
        }
        6 | 7 => Ok(fields.join(" ")),
        n => Err(ScheduleError::Expression {
            expr: expr.to_string(),
            reason: format!("expected 5, 6 or 7 fields, found {n}"),
        }),
    }
}

/// Translate a five-field day-of-week (Sunday = 0 or 7) to the seconds-form
/// numbering (Sunday = 1, Saturday = 7). Names pass through unchanged.
fn convert_day_of_week(field: &str) -> Option<String> {
    let parts = field
        .split(',')
        .map(|part| {
            let (range, step) = match part.split_once('/') {
                Some((range, step)) => (range, Some(step)),
                None => (part, None),
            };
            let converted = convert_dow_range(range, step.is_some())?;
            Some(match step {
                Some(step) => format!("{converted}/{step}"),
                None => converted,
            })
        })
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join(","))
}

fn convert_dow_range(range: &str, stepped: bool) -> Option<String> {
    if range == "*" || range == "?" || range.chars().any(|c| c.is_ascii_alphabetic()) {
        return Some(range.to_string());
    }
    match range.split_once('-') {
        Some((start, end)) => {
            let start: u32 = start.parse().ok().filter(|d| *d <= 7)?;
            let end: u32 = end.parse().ok().filter(|d| *d <= 7)?;
            match (start, end) {
                (0, 7) => Some("1-7".to_string()),
                (s, 7) if !stepped && s > 0 => Some(format!("{}-7,1", s + 1)),
                (s, e) => Some(format!("{}-{}", s + 1, e.min(6) + 1)),
            }
        }
        None => {
            let day: u32 = range.parse().ok().filter(|d| *d <= 7)?;
            Some(((day % 7) + 1).to_string())
        }
    }
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
