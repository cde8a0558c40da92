//! Fixed-window request counters for the public thought endpoint.

use chrono::{DateTime, Utc};
use rusqlite::params;

use super::super::sqlite::format_timestamp;
use super::super::{Database, DbResult};
use crate::models::RateLimitDecision;

impl Database {
    /// Count one request for `key` in the window containing `now`.
    ///
    /// A single upsert increments the counter inside the current window and
    /// resets it to 1 on rollover, so concurrent callers never lose updates.
    pub fn consume_rate_limit(
        &self,
        key: &str,
        max_requests: u32,
        window_secs: i64,
        now: DateTime<Utc>,
    ) -> DbResult<RateLimitDecision> {
        let window_secs = window_secs.max(1);
        let now_secs = now.timestamp();
        let window_start = now_secs - now_secs.rem_euclid(window_secs);

        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "INSERT INTO thought_rate_limits (key, window_start, count, updated_at)
             VALUES (?1, ?2, 1, ?3)
             ON CONFLICT(key) DO UPDATE SET
                count = CASE
                    WHEN thought_rate_limits.window_start = excluded.window_start
                    THEN thought_rate_limits.count + 1
                    ELSE 1
                END,
                window_start = excluded.window_start,
                updated_at = excluded.updated_at
             RETURNING count",
            params![key, window_start, format_timestamp(&now)],
            |row| row.get(0),
        )?;

        let max = i64::from(max_requests);
        let retry_after_seconds = (window_start + window_secs - now_secs).max(1);

        Ok(RateLimitDecision {
            allowed: count <= max,
            remaining: (max - count).max(0) as u32,
            retry_after_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::db::sqlite::test_support::temp_db;

    #[test]
    fn test_allows_up_to_max_then_rejects() {
        let (_dir, db) = temp_db();
        let now = Utc.timestamp_opt(1_700_000_010, 0).unwrap();

        for expected_remaining in (0..3).rev() {
            let decision = db.consume_rate_limit("thought:1.2.3.4", 3, 60, now).unwrap();
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
        }

        let denied = db.consume_rate_limit("thought:1.2.3.4", 3, 60, now).unwrap();
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        // 1_700_000_010 sits 30s into a 60s window
        assert_eq!(denied.retry_after_seconds, 30);
    }

    #[test]
    fn test_window_rollover_resets_to_one() {
        let (_dir, db) = temp_db();
        let first = Utc.timestamp_opt(1_700_000_010, 0).unwrap();
        let next_window = Utc.timestamp_opt(1_700_000_045, 0).unwrap();

        db.consume_rate_limit("k", 1, 60, first).unwrap();
        assert!(!db.consume_rate_limit("k", 1, 60, first).unwrap().allowed);

        let decision = db.consume_rate_limit("k", 1, 60, next_window).unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn test_keys_are_independent() {
        let (_dir, db) = temp_db();
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        db.consume_rate_limit("a", 1, 60, now).unwrap();
        assert!(db.consume_rate_limit("b", 1, 60, now).unwrap().allowed);
    }
}
