//! Cache key naming. One builder per entry family so formats stay in one
//! place and the TTL table in the docs can be checked against code.

use chrono::{DateTime, Timelike, Utc};

/// Truncate to the containing minute; bucket and snapshot keys are always
/// derived from a minute-floored instant.
pub fn minute_floor(t: DateTime<Utc>) -> DateTime<Utc> {
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

/// Active-session token per account, TTL 24h.
pub fn account_token(account_id: i64) -> String {
    format!("account:{account_id}")
}

/// Serialized ListLatest response, TTL 5s. Anonymous viewers only, so the
/// key carries no identity.
pub fn feed_latest(limit: i64, before: i64) -> String {
    format!("feed:listLatest:limit={limit}:before={before}")
}

/// Serialized ListByFollowing response, TTL 5s. Logged-in viewers only.
pub fn feed_following(limit: i64, account_id: i64, before: i64) -> String {
    format!("feed:listByFollowing:limit={limit}:accountID={account_id}:before={before}")
}

/// Serialized video detail, TTL 5m.
pub fn video_detail(video_id: i64) -> String {
    format!("video:detail:id={video_id}")
}

/// Per-minute popularity bucket (sorted set), TTL 2h.
pub fn hot_bucket(minute: DateTime<Utc>) -> String {
    format!("hot:video:1m:{}", minute.format("%Y%m%d%H%M"))
}

/// Materialized union of the last 60 minute buckets, TTL 2m.
pub fn hot_merge(as_of: DateTime<Utc>) -> String {
    format!("hot:video:merge:1m:{}", as_of.format("%Y%m%d%H%M"))
}

/// Rebuild lease guarding a cache entry.
pub fn lock(cache_key: &str) -> String {
    format!("lock:{cache_key}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn key_formats() {
        assert_eq!(account_token(42), "account:42");
        assert_eq!(feed_latest(10, 0), "feed:listLatest:limit=10:before=0");
        assert_eq!(
            feed_following(10, 123, 1640000000),
            "feed:listByFollowing:limit=10:accountID=123:before=1640000000"
        );
        assert_eq!(video_detail(7), "video:detail:id=7");
        assert_eq!(lock("feed:listLatest:limit=10:before=0"), "lock:feed:listLatest:limit=10:before=0");
    }

    #[test]
    fn hot_keys_are_minute_formatted() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap();
        assert_eq!(hot_bucket(t), "hot:video:1m:202401011500");
        assert_eq!(hot_merge(t), "hot:video:merge:1m:202401011500");
    }

    #[test]
    fn minute_floor_drops_seconds() {
        let t = Utc.with_ymd_and_hms(2024, 6, 3, 9, 41, 37).unwrap();
        let floored = minute_floor(t);
        assert_eq!(floored, Utc.with_ymd_and_hms(2024, 6, 3, 9, 41, 0).unwrap());
        assert_eq!(hot_bucket(floored), "hot:video:1m:202406030941");
    }
}
