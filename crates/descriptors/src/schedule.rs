// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The minimal schedule grammar (§6.4): `@every <N>s` or a standard
//! five-field POSIX cron expression, both interpreted in UTC.

use chrono::{DateTime, Utc};
use core_domain::ValidationError;
use std::str::FromStr;

/// Compute the next run time for `schedule` relative to `now`.
///
/// `@every 0s` (and any non-positive interval) is rejected per §8
/// Boundary behaviors.
pub fn next_run_after(schedule: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, ValidationError> {
    if let Some(rest) = schedule.strip_prefix("@every ") {
        let secs = parse_every(rest)
            .ok_or_else(|| ValidationError::InvalidSchedule(schedule.to_string()))?;
        if secs == 0 {
            return Err(ValidationError::InvalidSchedule(schedule.to_string()));
        }
        return Ok(now + chrono::Duration::seconds(secs as i64));
    }

    // §6.4 names the standard five-field POSIX form; the `cron` crate
    // requires a leading seconds field, so a bare five-field expression
    // is promoted to six fields by fixing seconds at `0`.
    let normalized = match schedule.split_whitespace().count() {
        5 => format!("0 {schedule}"),
        _ => schedule.to_string(),
    };

    let parsed = cron::Schedule::from_str(&normalized)
        .map_err(|_| ValidationError::InvalidSchedule(schedule.to_string()))?;
    parsed
        .after(&now)
        .next()
        .ok_or_else(|| ValidationError::InvalidSchedule(schedule.to_string()))
}

fn parse_every(rest: &str) -> Option<u64> {
    let digits = rest.strip_suffix('s')?;
    digits.parse::<u64>().ok()
}
