//! Unit of Work pattern implementation.
//!
//! Centralizes repository access and transaction lifecycle. Every ledger
//! write runs inside `transaction`, so the "find the open record" read and
//! the following insert or update commit together or not at all.

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{
    AccessMode, DatabaseConnection, DatabaseTransaction, IsolationLevel, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

use super::repositories::attendance_repository as queries;
use super::repositories::{AttendanceRepository, AttendanceStore, DirectoryStore, UserDirectory};
use crate::domain::{AttendanceRecord, NewAttendanceRecord};
use crate::errors::{AppError, AppResult};

/// Unit of Work trait for dependency injection.
///
/// Not mockable directly because `transaction` is generic. Tests either
/// run against an in-memory database or wrap mock repositories.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Get attendance repository
    fn attendance(&self) -> Arc<dyn AttendanceRepository>;

    /// Get user directory
    fn directory(&self) -> Arc<dyn UserDirectory>;

    /// Execute a closure within a ReadCommitted transaction.
    ///
    /// Commits on success, rolls back on error.
    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send;
}

/// Transaction context providing repository access within a transaction.
pub struct TransactionContext<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TransactionContext<'a> {
    fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Get attendance repository for this transaction
    pub fn attendance(&self) -> TxAttendanceRepository<'_> {
        TxAttendanceRepository::new(self.txn)
    }
}

/// Concrete implementation of UnitOfWork
pub struct Persistence {
    db: DatabaseConnection,
    attendance_repo: Arc<AttendanceStore>,
    directory: Arc<DirectoryStore>,
}

impl Persistence {
    /// Create new UnitOfWork instance
    pub fn new(db: DatabaseConnection) -> Self {
        let attendance_repo = Arc::new(AttendanceStore::new(db.clone()));
        let directory = Arc::new(DirectoryStore::new(db.clone()));
        Self {
            db,
            attendance_repo,
            directory,
        }
    }
}

#[async_trait]
impl UnitOfWork for Persistence {
    fn attendance(&self) -> Arc<dyn AttendanceRepository> {
        self.attendance_repo.clone()
    }

    fn directory(&self) -> Arc<dyn UserDirectory> {
        self.directory.clone()
    }

    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send,
    {
        let txn = self
            .db
            .begin_with_config(
                Some(IsolationLevel::ReadCommitted),
                Some(AccessMode::ReadWrite),
            )
            .await
            .map_err(AppError::from)?;

        let ctx = TransactionContext::new(&txn);

        match f(ctx).await {
            Ok(result) => {
                txn.commit().await.map_err(AppError::from)?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

/// Transaction-aware attendance repository.
///
/// Borrows the transaction so it cannot outlive it.
pub struct TxAttendanceRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxAttendanceRepository<'a> {
    fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<AttendanceRecord>> {
        queries::find_by_id(self.txn, id).await
    }

    /// Most recent unclosed record for the user, whatever its date
    pub async fn find_open_for_user(&self, user_id: Uuid) -> AppResult<Option<AttendanceRecord>> {
        queries::find_open_for_user(self.txn, user_id).await
    }

    pub async fn find_for_user_on(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> AppResult<Option<AttendanceRecord>> {
        queries::find_for_user_on(self.txn, user_id, date).await
    }

    /// Insert a record; unique-index violations surface as conflicts
    pub async fn insert(&self, new: NewAttendanceRecord) -> AppResult<AttendanceRecord> {
        queries::insert(self.txn, new).await
    }

    /// Write a check-out; `AlreadyCheckedOut` if the record was closed meanwhile
    pub async fn close(&self, record: &AttendanceRecord) -> AppResult<AttendanceRecord> {
        queries::close(self.txn, record).await
    }

    /// Persist every mutable field of an existing record
    pub async fn save(&self, record: &AttendanceRecord) -> AppResult<AttendanceRecord> {
        queries::save(self.txn, record).await
    }
}

/// Simpler API for executing transactional operations.
#[macro_export]
macro_rules! with_transaction {
    ($uow:expr, |$ctx:ident| $body:expr) => {
        $uow.transaction(|$ctx| Box::pin(async move { $body })).await
    };
}
