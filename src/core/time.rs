use chrono::{DateTime, Utc};

pub const FIXED_TIME_ENV: &str = "CASE_FIXED_TIME";

/// Current time, pinned by `CASE_FIXED_TIME` (RFC 3339) for reproducible runs.
pub fn now_utc() -> DateTime<Utc> {
    if let Ok(value) = std::env::var(FIXED_TIME_ENV) {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&value) {
            return dt.with_timezone(&Utc);
        }
    }
    Utc::now()
}

pub fn display_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}
