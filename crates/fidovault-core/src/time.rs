//! Unix-timestamp helpers.
//!
//! Claim payloads carry `iat` as unix seconds; freshness windows are checked
//! against the current clock rather than an embedded `exp`, matching the
//! short-lived operational tokens this system mints.

use std::time::Duration;

use time::OffsetDateTime;

/// Current unix timestamp in seconds.
#[must_use]
pub fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Returns `true` if `issued_at` (unix seconds) is older than `window`.
///
/// Timestamps from the future are treated as fresh; signature verification,
/// not clock comparison, is the integrity check.
#[must_use]
pub fn is_stale(issued_at: i64, window: Duration) -> bool {
    let age = unix_now().saturating_sub(issued_at);
    age > window.as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_timestamp() {
        assert!(!is_stale(unix_now(), Duration::from_secs(300)));
    }

    #[test]
    fn test_stale_timestamp() {
        assert!(is_stale(unix_now() - 301, Duration::from_secs(300)));
    }

    #[test]
    fn test_boundary_is_fresh() {
        // exactly the window edge still counts as fresh
        assert!(!is_stale(unix_now() - 300, Duration::from_secs(300)));
    }

    #[test]
    fn test_future_timestamp_is_fresh() {
        assert!(!is_stale(unix_now() + 60, Duration::from_secs(300)));
    }
}
