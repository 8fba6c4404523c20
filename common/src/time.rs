use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub fn current_time_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Seconds as an `f64`, the way the query API and `time()` report timestamps.
pub fn millis_to_secs(ms: i64) -> f64 {
    ms as f64 / 1e3
}
