// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Recurring schedule definitions.
//!
//! This module provides [`ScheduleSpec`], the recurrence rule behind a
//! schedule timer: a fixed interval, a daily wall-clock time, or a full
//! cron expression.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveTime};

use crate::error::ScheduleError;

/// When a schedule timer fires.
///
/// The next occurrence is always computed from the local clock, so daily and
/// cron schedules follow wall-clock time across DST changes rather than a
/// fixed offset.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use domostate::ScheduleSpec;
///
/// let polling = ScheduleSpec::every(Duration::from_secs(60)).unwrap();
/// let nightly = ScheduleSpec::parse("23:30").unwrap();
/// let weekdays = ScheduleSpec::parse("0 0 7 * * Mon-Fri").unwrap();
/// ```
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleSpec {
    /// Fires at a fixed interval.
    Every {
        /// Interval between firings.
        interval: Duration,
    },
    /// Fires once a day at a local wall-clock time.
    Daily {
        /// Time of day, local timezone.
        time: NaiveTime,
    },
    /// Fires per a cron expression (seconds field first).
    Cron {
        /// Parsed cron schedule.
        #[serde(with = "cron_expression")]
        schedule: Box<cron::Schedule>,
    },
}

impl ScheduleSpec {
    /// Creates a fixed-interval schedule.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::ZeroInterval`] for a zero interval, which
    /// would fire continuously.
    pub fn every(interval: Duration) -> Result<Self, ScheduleError> {
        if interval.is_zero() {
            return Err(ScheduleError::ZeroInterval);
        }
        Ok(Self::Every { interval })
    }

    /// Creates a daily schedule at the given local wall-clock time.
    #[must_use]
    pub const fn daily(time: NaiveTime) -> Self {
        Self::Daily { time }
    }

    /// Creates a schedule from a cron expression.
    ///
    /// The expression uses the seconds-first field order, e.g.
    /// `"0 30 7 * * Mon-Fri"` for 07:30 on weekdays.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidCron`] if the expression does not
    /// parse.
    pub fn cron(expression: &str) -> Result<Self, ScheduleError> {
        cron::Schedule::from_str(expression)
            .map(|schedule| Self::Cron {
                schedule: Box::new(schedule),
            })
            .map_err(|e| ScheduleError::InvalidCron {
                expression: expression.to_string(),
                reason: e.to_string(),
            })
    }

    /// Parses a human time spec into a schedule.
    ///
    /// Accepts `"HH:MM"` and `"HH:MM:SS"` wall-clock specs, which become
    /// daily schedules, and full cron expressions.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidTimeSpec`] if the spec is neither a
    /// wall-clock time nor shaped like a cron expression, and
    /// [`ScheduleError::InvalidCron`] for a malformed cron expression.
    pub fn parse(spec: &str) -> Result<Self, ScheduleError> {
        let trimmed = spec.trim();
        if let Ok(time) = NaiveTime::parse_from_str(trimmed, "%H:%M") {
            return Ok(Self::Daily { time });
        }
        if let Ok(time) = NaiveTime::parse_from_str(trimmed, "%H:%M:%S") {
            return Ok(Self::Daily { time });
        }
        if trimmed.contains(char::is_whitespace) {
            return Self::cron(trimmed);
        }
        Err(ScheduleError::InvalidTimeSpec(trimmed.to_string()))
    }

    /// Returns the next firing strictly after `now`.
    ///
    /// Returns `None` if the schedule has no upcoming occurrence.
    #[must_use]
    pub fn next_occurrence(&self, now: DateTime<Local>) -> Option<DateTime<Local>> {
        match self {
            Self::Every { interval } => {
                let step = chrono::Duration::from_std(*interval).ok()?;
                now.checked_add_signed(step)
            }
            Self::Daily { time } => {
                let mut date = now.date_naive();
                if date.and_time(*time) <= now.naive_local() {
                    date = date.succ_opt()?;
                }
                // a wall-clock time erased by a DST jump moves to the next day
                for _ in 0..2 {
                    if let Some(target) =
                        date.and_time(*time).and_local_timezone(Local).earliest()
                    {
                        return Some(target);
                    }
                    date = date.succ_opt()?;
                }
                None
            }
            Self::Cron { schedule } => schedule.after(&now).next(),
        }
    }
}

impl fmt::Display for ScheduleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Every { interval } => write!(f, "every {interval:?}"),
            Self::Daily { time } => write!(f, "daily at {time}"),
            Self::Cron { schedule } => write!(f, "cron {schedule}"),
        }
    }
}

impl FromStr for ScheduleSpec {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Serde adapter keeping cron schedules as their source expression.
mod cron_expression {
    use std::str::FromStr;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(schedule: &cron::Schedule, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(schedule)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Box<cron::Schedule>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        cron::Schedule::from_str(&raw)
            .map(Box::new)
            .map_err(serde::de::Error::custom)
    }
}
