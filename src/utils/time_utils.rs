use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

pub struct TimeUtils;

impl TimeUtils {
    pub const STANDARD_TIME_FORMAT: &str = "%Y-%m-%d";
}

// Time Helper functions

/// Formats a millisecond epoch as `YYYY-MM-DD` (UTC). Out-of-range input renders as "n/a".
pub fn epoch_ms_to_date_string(epoch_ms: i64) -> String {
    match DateTime::from_timestamp_millis(epoch_ms) {
        Some(dt) => dt.format(TimeUtils::STANDARD_TIME_FORMAT).to_string(),
        None => "n/a".to_string(),
    }
}

pub fn now_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Midnight UTC of `date`, in epoch milliseconds.
pub fn date_to_epoch_ms(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or(0)
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, RFC 3339, or a unix timestamp
/// (seconds, or milliseconds when the magnitude says so).
pub fn parse_timestamp_ms(raw: &str) -> Result<i64> {
    let s = raw.trim();

    if let Ok(num) = s.parse::<f64>() {
        // Anything past ~2286 in seconds is treated as milliseconds already
        let ms = if num.abs() >= 1e10 { num } else { num * 1000.0 };
        return Ok(ms as i64);
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, TimeUtils::STANDARD_TIME_FORMAT) {
        return Ok(date_to_epoch_ms(date));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.and_utc().timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp_millis());
    }

    Err(anyhow!("Unrecognised timestamp format: '{}'", raw))
}
