//! Time parsing for operator input
//!
//! Accepts, in order of preference:
//! - RFC 3339 timestamps: "2026-03-01T12:00:00Z", "2026-03-01T13:00:00+01:00"
//! - "YYYY-MM-DD HH:MM", read as UTC
//! - Relative durations: "30m", "2h", "1d 6h"
//! - Natural language: "tomorrow", "next monday 10am"

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use crate::error::{CadenceError, Result};

/// Parse a schedule string into an instant
pub fn parse_schedule(input: &str) -> Result<DateTime<Utc>> {
    parse_schedule_at(input, Utc::now())
}

/// Like [`parse_schedule`], with relative input measured from `now`
pub fn parse_schedule_at(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CadenceError::Validation(
            "Schedule string cannot be empty".to_string(),
        ));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M") {
        return Ok(naive.and_utc());
    }

    if let Some(duration) = parse_duration(input) {
        return Ok(now + duration);
    }

    chrono_english::parse_date_string(input, now, chrono_english::Dialect::Us)
        .map_err(|_| CadenceError::Validation(format!("Could not parse schedule string: {}", input)))
}

fn parse_duration(input: &str) -> Option<Duration> {
    let std_duration = humantime::parse_duration(input).ok()?;
    Duration::from_std(std_duration).ok()
}
