//! Per-user writer locks.
//!
//! Attendance writers for one user run one at a time; writers for
//! different users never share a lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use super::cache::{Cache, LockGuard, LockOptions};
use crate::config::LOCK_RESOURCE_ATTENDANCE;
use crate::errors::{AppError, AppResult};

/// Held while a user's ledger entries are being written.
pub enum UserLockGuard {
    Local(OwnedMutexGuard<()>),
    Distributed(LockGuard),
}

impl UserLockGuard {
    /// Release now rather than on drop.
    pub async fn release(self) -> AppResult<()> {
        match self {
            UserLockGuard::Local(guard) => {
                drop(guard);
                Ok(())
            }
            UserLockGuard::Distributed(guard) => guard.release().await,
        }
    }
}

#[async_trait]
pub trait UserLocks: Send + Sync {
    async fn lock(&self, user_id: Uuid) -> AppResult<UserLockGuard>;
}

/// In-process locks, one async mutex per user.
#[derive(Default)]
pub struct LocalUserLocks {
    slots: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl LocalUserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, user_id: Uuid) -> AppResult<Arc<AsyncMutex<()>>> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| AppError::internal("user lock table poisoned"))?;
        // Drop slots nobody holds or waits on
        slots.retain(|id, slot| *id == user_id || Arc::strong_count(slot) > 1);
        Ok(slots.entry(user_id).or_default().clone())
    }
}

#[async_trait]
impl UserLocks for LocalUserLocks {
    async fn lock(&self, user_id: Uuid) -> AppResult<UserLockGuard> {
        let slot = self.slot(user_id)?;
        Ok(UserLockGuard::Local(slot.lock_owned().await))
    }
}

/// Redis-backed locks shared by every engine instance.
pub struct RedisUserLocks {
    cache: Cache,
    options: LockOptions,
}

impl RedisUserLocks {
    pub fn new(cache: Cache) -> Self {
        Self::with_options(cache, LockOptions::default())
    }

    pub fn with_options(cache: Cache, options: LockOptions) -> Self {
        Self { cache, options }
    }
}

#[async_trait]
impl UserLocks for RedisUserLocks {
    async fn lock(&self, user_id: Uuid) -> AppResult<UserLockGuard> {
        let resource = format!("{}{}", LOCK_RESOURCE_ATTENDANCE, user_id);
        let guard = self.cache.lock(&resource, self.options).await?;
        Ok(UserLockGuard::Distributed(guard))
    }
}
