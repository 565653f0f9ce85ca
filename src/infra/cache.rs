//! Redis connection used for cross-instance writer locks.
//!
//! Each lock is a single key set with `SET NX EX` and holding a random
//! token. Only the holder of the token may delete it, so a lock that
//! expired and was re-taken by another instance is never released twice.

use redis::{
    aio::ConnectionManager, AsyncCommands, Client, ExistenceCheck, RedisError, Script, SetExpiry,
    SetOptions,
};
use tokio::time::{sleep, Duration};
use uuid::Uuid;

use crate::config::{
    CACHE_PREFIX_LOCK, DEFAULT_LOCK_RETRIES, DEFAULT_LOCK_RETRY_DELAY_MS,
    DEFAULT_LOCK_TTL_SECONDS,
};
use crate::errors::{AppError, AppResult};

/// Deletes the key only while it still holds our token.
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
end
return 0
"#;

/// How long a lock lives and how hard to try for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LockOptions {
    /// Expiry guarding against a crashed holder
    pub ttl_seconds: u64,
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_LOCK_TTL_SECONDS,
            retries: DEFAULT_LOCK_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_LOCK_RETRY_DELAY_MS),
        }
    }
}

impl LockOptions {
    /// Longest a caller may wait before giving up.
    pub fn max_wait(&self) -> Duration {
        self.retry_delay * self.retries
    }
}

/// Shared Redis connection.
#[derive(Clone)]
pub struct Cache {
    connection: ConnectionManager,
}

impl Cache {
    pub async fn connect(redis_url: &str) -> Result<Self, RedisError> {
        let client = Client::open(redis_url)?;
        let connection = ConnectionManager::new(client).await?;
        tracing::info!("Redis connected");
        Ok(Self { connection })
    }

    /// Round-trip a PING for the health check.
    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(redis_error)
    }

    /// Take the lock named `resource`, polling until it is free.
    pub async fn lock(&self, resource: &str, options: LockOptions) -> AppResult<LockGuard> {
        let key = format!("{}{}", CACHE_PREFIX_LOCK, resource);
        let token = Uuid::new_v4().to_string();
        let set = SetOptions::default()
            .conditional_set(ExistenceCheck::NX)
            .with_expiration(SetExpiry::EX(options.ttl_seconds as _));
        let mut conn = self.connection.clone();

        for attempt in 0..=options.retries {
            let reply: Option<String> = conn
                .set_options(&key, &token, set.clone())
                .await
                .map_err(redis_error)?;

            if reply.is_some() {
                tracing::debug!(%key, attempt, "Lock acquired");
                return Ok(LockGuard {
                    cache: self.clone(),
                    key,
                    token,
                    held: true,
                });
            }
            if attempt < options.retries {
                sleep(options.retry_delay).await;
            }
        }

        tracing::warn!(%key, waited_ms = options.max_wait().as_millis() as u64, "Lock still busy");
        Err(AppError::internal(format!("lock {} is busy", key)))
    }

    async fn unlock(&self, key: &str, token: &str) -> AppResult<bool> {
        let mut conn = self.connection.clone();
        let deleted: i32 = Script::new(RELEASE_SCRIPT)
            .key(key)
            .arg(token)
            .invoke_async(&mut conn)
            .await
            .map_err(redis_error)?;
        Ok(deleted == 1)
    }
}

/// Held Redis lock; released explicitly or, failing that, on drop.
pub struct LockGuard {
    cache: Cache,
    key: String,
    token: String,
    held: bool,
}

impl LockGuard {
    pub async fn release(mut self) -> AppResult<()> {
        self.held = false;
        if !self.cache.unlock(&self.key, &self.token).await? {
            // Expired and possibly re-taken; the write already committed
            tracing::warn!(key = %self.key, "Lock expired before release");
        }
        Ok(())
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if !self.held {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let cache = self.cache.clone();
        let key = std::mem::take(&mut self.key);
        let token = std::mem::take(&mut self.token);
        runtime.spawn(async move {
            if let Err(e) = cache.unlock(&key, &token).await {
                tracing::error!(%key, error = %e, "Failed to release dropped lock");
            }
        });
    }
}

fn redis_error(e: RedisError) -> AppError {
    AppError::internal(format!("Redis error: {}", e))
}
