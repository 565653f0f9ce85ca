//! Repository layer - Data access abstraction
//!
//! Repositories provide an abstraction over data persistence,
//! following the Repository pattern for clean separation of concerns.

pub(crate) mod attendance_repository;
pub mod entities;
mod user_directory;

use sea_orm::{DbErr, SqlErr};

use super::db::migrations::{OPEN_SESSION_INDEX, USER_DATE_INDEX};
use crate::domain::ConflictReason;
use crate::errors::AppError;

pub use attendance_repository::{AttendanceRepository, AttendanceStore};
pub use user_directory::{DirectoryStore, UserDirectory};

// Export mocks for tests (both unit and integration)
#[cfg(any(test, feature = "test-utils"))]
pub use attendance_repository::MockAttendanceRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use user_directory::MockUserDirectory;

/// Map a unique-index violation on the ledger to a conflict.
///
/// PostgreSQL names the violated index; SQLite lists the columns
/// (`attendance_records.user_id, attendance_records.date`).
pub(crate) fn conflict_or_db(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) => {
            let reason = if message.contains(OPEN_SESSION_INDEX) {
                ConflictReason::OpenSessionExists
            } else if message.contains(USER_DATE_INDEX) || message.contains(".date") {
                ConflictReason::DuplicateRecord
            } else {
                ConflictReason::OpenSessionExists
            };
            tracing::debug!(%message, ?reason, "Unique constraint violated");
            AppError::Conflict(reason)
        }
        _ => AppError::Database(err),
    }
}
