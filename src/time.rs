use chrono::{DateTime, Utc};

/// Current wall-clock time as epoch seconds.
pub fn now_ts() -> i64 {
    Utc::now().timestamp()
}

/// Seconds remaining until `end`, clamped to zero.
pub fn secs_left(end: i64, now: i64) -> u64 {
    (end - now).max(0) as u64
}

/// Renders an epoch-seconds timestamp for wire output.
pub fn format_ts(ts: i64) -> String {
    match DateTime::<Utc>::from_timestamp(ts, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ts.to_string(),
    }
}
