// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use paylane_core::ValidationError;

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (taken as UTC
/// midnight).
pub fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| ValidationError(format!("invalid date {trimmed:?}")))?;
        return Ok(Utc.from_utc_datetime(&midnight));
    }
    Err(ValidationError(format!(
        "expected RFC 3339 timestamp or YYYY-MM-DD date, got {trimmed:?}"
    )))
}

/// Range-end variant: a bare date means "through the end of that day", so
/// the exclusive bound is the following midnight. Full timestamps are taken
/// as-is.
pub fn parse_range_end(raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    parse_datetime(trimmed).map(|midnight| midnight + Duration::days(1))
}
