//! Expression grammars used in job definitions
//!
//! - duration token: ISO-8601 (`PT15M`, `P1D`) or shorthand (`15m`, `2h`,
//!   `1d`); a shorthand token starting with a digit and ending in `d` becomes
//!   `P<token>`, any other becomes `PT<token>`. Signs are ignored.
//! - fixed window: `"<start HH:mm> <end HH:mm>"`, end before start means the
//!   window runs overnight.
//! - successive: `"<initialMaxDelay> <minGap> <maxGap>"`, three duration tokens.
//! - cron: 6-field (seconds enabled) expressions, optionally with a year field.

use chrono::{Duration, NaiveTime};
use cron::Schedule;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SchedulerError};

/// Parse a duration token
pub fn parse_duration(token: &str) -> Result<Duration> {
    let trimmed = token.trim();
    let unsigned = trimmed.trim_start_matches(['-', '+']);
    if unsigned.is_empty() {
        return Err(SchedulerError::expression(token, "empty duration"));
    }

    let iso = if unsigned.starts_with(|c: char| c.is_ascii_digit()) {
        if unsigned.ends_with(['d', 'D']) {
            format!("P{}", unsigned)
        } else {
            format!("PT{}", unsigned)
        }
    } else {
        unsigned.to_string()
    };

    parse_iso8601(&iso)
        .map(|d| d.abs())
        .ok_or_else(|| SchedulerError::expression(token, "not a valid duration"))
}

/// Minimal ISO-8601 duration parser: `P[nW][nD][T[nH][nM][n[.n]S]]`
fn parse_iso8601(input: &str) -> Option<Duration> {
    let upper = input.to_ascii_uppercase();
    let body = upper.trim_start_matches(['-', '+']).strip_prefix('P')?;
    let (date_part, time_part) = match body.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (body, None),
    };

    let mut total = Duration::zero();
    let mut components = 0;

    for (number, unit) in components_of(date_part)? {
        let value: i64 = number.parse().ok()?;
        total += match unit {
            'W' => Duration::try_weeks(value)?,
            'D' => Duration::try_days(value)?,
            _ => return None,
        }
        .abs();
        components += 1;
    }

    if let Some(time) = time_part {
        if time.is_empty() {
            return None;
        }
        for (number, unit) in components_of(time)? {
            total += match unit {
                'H' => Duration::try_hours(number.parse::<i64>().ok()?)?,
                'M' => Duration::try_minutes(number.parse::<i64>().ok()?)?,
                'S' => {
                    let seconds: f64 = number.parse().ok()?;
                    Duration::try_milliseconds((seconds * 1000.0).round() as i64)?
                }
                _ => return None,
            }
            .abs();
            components += 1;
        }
    }

    (components > 0).then_some(total)
}

/// Split `12H30M` into `[("12", 'H'), ("30", 'M')]`
fn components_of(part: &str) -> Option<Vec<(&str, char)>> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, c) in part.char_indices() {
        if c.is_ascii_alphabetic() {
            let number = &part[start..i];
            if number.is_empty() || number == "-" || number == "+" {
                return None;
            }
            out.push((number, c));
            start = i + c.len_utf8();
        }
    }
    (start == part.len()).then_some(out)
}

/// Parse an `HH:mm` time of day
pub fn parse_time_of_day(token: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(token.trim(), "%H:%M")
        .map_err(|e| SchedulerError::expression(token, format!("not a HH:mm time ({})", e)))
}

/// Parse a cron expression (seconds field required)
pub fn parse_cron(expression: &str) -> Result<Schedule> {
    let fields = expression.split_whitespace().count();
    if !(6..=7).contains(&fields) {
        return Err(SchedulerError::expression(
            expression,
            format!("expected 6 cron fields (seconds first), found {}", fields),
        ));
    }
    Schedule::from_str(expression.trim())
        .map_err(|e| SchedulerError::expression(expression, e.to_string()))
}

/// A daily clock-time window such as `05:15 08:15`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedWindowExpr {
    /// Local start time
    pub start: NaiveTime,
    /// Local end time; earlier than `start` for overnight windows
    pub end: NaiveTime,
}

impl FixedWindowExpr {
    /// Whether the window ends on the following day
    #[must_use]
    pub fn is_overnight(&self) -> bool {
        self.end < self.start
    }

    /// Length of the window
    #[must_use]
    pub fn length(&self) -> Duration {
        let length = self.end - self.start;
        if self.is_overnight() {
            length + Duration::days(1)
        } else {
            length
        }
    }
}

impl FromStr for FixedWindowExpr {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        let [start, end] = tokens.as_slice() else {
            return Err(SchedulerError::expression(
                s,
                "expected '<start HH:mm> <end HH:mm>'",
            ));
        };
        Ok(Self {
            start: parse_time_of_day(start)?,
            end: parse_time_of_day(end)?,
        })
    }
}

impl fmt::Display for FixedWindowExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

/// Gap policy between successive runs such as `PT1H 6h 12h`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuccessiveExpr {
    /// Maximum delay of the very first run after registration
    pub initial_maximum_delay: Duration,
    /// Minimum gap between two runs
    pub minimum_gap: Duration,
    /// Maximum gap between two runs
    pub maximum_gap: Duration,
}

impl FromStr for SuccessiveExpr {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        let [delay, min, max] = tokens.as_slice() else {
            return Err(SchedulerError::expression(
                s,
                "expected '<initialMaxDelay> <minGap> <maxGap>'",
            ));
        };
        Ok(Self {
            initial_maximum_delay: parse_duration(delay)?,
            minimum_gap: parse_duration(min)?,
            maximum_gap: parse_duration(max)?,
        })
    }
}
