//! Redis access layer: string KV with miss discrimination, sorted-set
//! operations for the hot window, and the rebuild lease.
//!
//! Every call is bounded by a short deadline (50ms, 80ms for ZUNIONSTORE).
//! A deadline miss surfaces as an error so callers fall through to the
//! source of truth; the cache is never load-bearing for correctness.

pub mod keys;

use redis::aio::ConnectionManager;
use redis::Script;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use uuid::Uuid;

const OP_DEADLINE: Duration = Duration::from_millis(50);
const UNION_DEADLINE: Duration = Duration::from_millis(80);

#[derive(Debug, Error)]
pub enum CacheError {
    /// Key absent. Not a failure: callers branch on this to rebuild.
    #[error("cache miss")]
    Miss,
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("cache deadline exceeded")]
    Timeout,
}

impl CacheError {
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::Miss)
    }
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Lease held by the single builder of a cache entry. Release only deletes
/// the lock key if it still holds this token.
#[derive(Debug, Clone)]
pub struct Lease {
    pub key: String,
    pub token: String,
}

#[derive(Clone)]
pub struct CacheClient {
    conn: ConnectionManager,
}

impl CacheClient {
    pub async fn connect(redis_url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    pub async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        bounded(OP_DEADLINE, async move {
            redis::cmd("PING").query_async::<_, String>(&mut conn).await
        })
        .await?;
        Ok(())
    }

    pub async fn get_bytes(&self, key: &str) -> CacheResult<Vec<u8>> {
        let mut conn = self.conn.clone();
        let key = key.to_string();
        let value: Option<Vec<u8>> = bounded(OP_DEADLINE, async move {
            redis::cmd("GET").arg(&key).query_async(&mut conn).await
        })
        .await?;
        value.ok_or(CacheError::Miss)
    }

    pub async fn set_bytes(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let key = key.to_string();
        let value = value.to_vec();
        bounded(OP_DEADLINE, async move {
            redis::cmd("SET")
                .arg(&key)
                .arg(value)
                .arg("PX")
                .arg(ttl.as_millis() as u64)
                .query_async::<_, ()>(&mut conn)
                .await
        })
        .await
    }

    pub async fn del(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let key = key.to_string();
        bounded(OP_DEADLINE, async move {
            redis::cmd("DEL").arg(&key).query_async::<_, ()>(&mut conn).await
        })
        .await
    }

    pub async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.conn.clone();
        let key = key.to_string();
        let n: i64 = bounded(OP_DEADLINE, async move {
            redis::cmd("EXISTS").arg(&key).query_async(&mut conn).await
        })
        .await?;
        Ok(n > 0)
    }

    pub async fn zincr_by(&self, key: &str, member: &str, delta: f64) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let key = key.to_string();
        let member = member.to_string();
        bounded(OP_DEADLINE, async move {
            redis::cmd("ZINCRBY")
                .arg(&key)
                .arg(delta)
                .arg(&member)
                .query_async::<_, ()>(&mut conn)
                .await
        })
        .await
    }

    pub async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let key = key.to_string();
        bounded(OP_DEADLINE, async move {
            redis::cmd("EXPIRE")
                .arg(&key)
                .arg(ttl.as_secs() as i64)
                .query_async::<_, ()>(&mut conn)
                .await
        })
        .await
    }

    /// ZUNIONSTORE with SUM aggregation over the given source keys. The wider
    /// deadline accounts for the 60-key merge of the hot window.
    pub async fn zunion_store(&self, dst: &str, src_keys: &[String]) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let dst = dst.to_string();
        let src_keys = src_keys.to_vec();
        bounded(UNION_DEADLINE, async move {
            let mut cmd = redis::cmd("ZUNIONSTORE");
            cmd.arg(&dst).arg(src_keys.len());
            for key in &src_keys {
                cmd.arg(key);
            }
            cmd.arg("AGGREGATE").arg("SUM");
            cmd.query_async::<_, ()>(&mut conn).await
        })
        .await
    }

    pub async fn zrevrange(&self, key: &str, start: i64, stop: i64) -> CacheResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let key = key.to_string();
        bounded(OP_DEADLINE, async move {
            redis::cmd("ZREVRANGE")
                .arg(&key)
                .arg(start)
                .arg(stop)
                .query_async(&mut conn)
                .await
        })
        .await
    }

    /// Set-if-absent with a fresh random token. Returns None when another
    /// builder already holds the lease.
    pub async fn acquire_lease(&self, key: &str, ttl: Duration) -> CacheResult<Option<Lease>> {
        let token = Uuid::new_v4().simple().to_string();
        let mut conn = self.conn.clone();
        let lock_key = key.to_string();
        let lock_token = token.clone();
        let acquired: Option<String> = bounded(OP_DEADLINE, async move {
            redis::cmd("SET")
                .arg(&lock_key)
                .arg(&lock_token)
                .arg("NX")
                .arg("PX")
                .arg(ttl.as_millis() as u64)
                .query_async(&mut conn)
                .await
        })
        .await?;

        Ok(acquired.map(|_| Lease {
            key: key.to_string(),
            token,
        }))
    }

    /// Compare-the-token-then-delete, executed server side so a stale holder
    /// can never delete the current holder's lease. Runs on its own deadline,
    /// detached from the caller's budget: a request timeout must not leak a
    /// held lease.
    pub async fn release_lease(&self, lease: &Lease) {
        static UNLOCK: &str = r#"
            if redis.call("GET", KEYS[1]) == ARGV[1] then
              return redis.call("DEL", KEYS[1])
            else
              return 0
            end
        "#;
        let script = Script::new(UNLOCK);
        let mut conn = self.conn.clone();
        let key = lease.key.clone();
        let token = lease.token.clone();
        let result = timeout(Duration::from_millis(200), async move {
            script
                .key(&key)
                .arg(&token)
                .invoke_async::<_, i64>(&mut conn)
                .await
        })
        .await;
        match result {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, key = %lease.key, "lease release failed"),
            Err(_) => tracing::warn!(key = %lease.key, "lease release timed out"),
        }
    }
}

/// Cache-aside read with single-flight rebuild.
///
/// One caller wins the lease and builds the entry; contenders poll briefly
/// for the winner's write, then degrade to a direct source query so progress
/// never depends on the winner surviving. The lease TTL bounds the stall if
/// the winner crashes before writing.
pub async fn cached_or_build<T, E, F, Fut>(
    cache: &CacheClient,
    key: &str,
    entry_ttl: Duration,
    lease_ttl: Duration,
    build: F,
) -> Result<T, E>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    const CONTENDER_POLLS: usize = 5;
    const POLL_INTERVAL: Duration = Duration::from_millis(20);

    match cache.get_bytes(key).await {
        Ok(bytes) => {
            if let Ok(value) = serde_json::from_slice(&bytes) {
                return Ok(value);
            }
            // Undecodable entry: fall through and rebuild over it.
        }
        Err(CacheError::Miss) => {
            let lock_key = keys::lock(key);
            match cache.acquire_lease(&lock_key, lease_ttl).await {
                Ok(Some(lease)) => {
                    // Double-check after winning: another builder may have
                    // filled the entry between the miss and the acquire.
                    if let Ok(bytes) = cache.get_bytes(key).await {
                        if let Ok(value) = serde_json::from_slice(&bytes) {
                            cache.release_lease(&lease).await;
                            return Ok(value);
                        }
                    }
                    let result = build().await;
                    if let Ok(value) = &result {
                        if let Ok(bytes) = serde_json::to_vec(value) {
                            let _ = cache.set_bytes(key, &bytes, entry_ttl).await;
                        }
                    }
                    cache.release_lease(&lease).await;
                    return result;
                }
                Ok(None) => {
                    for _ in 0..CONTENDER_POLLS {
                        tokio::time::sleep(POLL_INTERVAL).await;
                        if let Ok(bytes) = cache.get_bytes(key).await {
                            if let Ok(value) = serde_json::from_slice(&bytes) {
                                return Ok(value);
                            }
                        }
                    }
                    // Winner never wrote: give up on the cache for this call.
                }
                Err(_) => {}
            }
        }
        Err(_) => {}
    }

    let result = build().await;
    if let Ok(value) = &result {
        if let Ok(bytes) = serde_json::to_vec(value) {
            let _ = cache.set_bytes(key, &bytes, entry_ttl).await;
        }
    }
    result
}

async fn bounded<T, F>(deadline: Duration, fut: F) -> CacheResult<T>
where
    F: std::future::Future<Output = Result<T, redis::RedisError>>,
{
    match timeout(deadline, fut).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(CacheError::Redis(e)),
        Err(_) => Err(CacheError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_is_distinct_from_failure() {
        assert!(CacheError::Miss.is_miss());
        assert!(!CacheError::Timeout.is_miss());
    }
}
