//! Infrastructure layer - External systems integration
//!
//! This module handles all external system concerns:
//! - Database connections and repositories
//! - The embedding extractor client
//! - Redis-backed distributed locks
//! - Unit of Work for transaction management

pub mod cache;
pub mod db;
pub mod extractor;
pub mod locks;
pub mod repositories;
pub mod unit_of_work;

pub use cache::{Cache, LockGuard, LockOptions};
pub use db::{Database, Migrator};
pub use extractor::{EmbeddingExtractor, HttpEmbeddingExtractor};
pub use locks::{LocalUserLocks, RedisUserLocks, UserLockGuard, UserLocks};
pub use repositories::{AttendanceRepository, AttendanceStore, DirectoryStore, UserDirectory};
pub use unit_of_work::{Persistence, TransactionContext, TxAttendanceRepository, UnitOfWork};

#[cfg(any(test, feature = "test-utils"))]
pub use extractor::MockEmbeddingExtractor;
#[cfg(any(test, feature = "test-utils"))]
pub use repositories::{MockAttendanceRepository, MockUserDirectory};
