//! Ledger service - Administrative record maintenance and listings.
//!
//! Admin writes go through the same per-user lock and transaction as
//! events, so an edit can never race a kiosk check-in for that user.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::AttendancePolicy;
use crate::domain::{
    derive_hours, validate_check_times, AttendanceRecord, AttendanceStatus, CheckMethod,
    ConflictReason, NewAttendanceRecord, RecordFilter, RecordPatch,
};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::{TxAttendanceRepository, UnitOfWork, UserLocks};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// A record entered by hand, e.g. leave or a forgotten badge.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualRecord {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    pub method: CheckMethod,
    pub location: Option<String>,
    /// Overrides the hours derived from the check times
    pub total_hours: Option<f64>,
    pub overtime_hours: Option<f64>,
}

impl ManualRecord {
    pub fn new(user_id: Uuid, date: NaiveDate, status: AttendanceStatus) -> Self {
        Self {
            user_id,
            date,
            check_in_time: None,
            check_out_time: None,
            status,
            method: CheckMethod::Manual,
            location: None,
            total_hours: None,
            overtime_hours: None,
        }
    }

    fn into_new_record(self, policy: &AttendancePolicy) -> AppResult<NewAttendanceRecord> {
        validate_check_times(self.check_in_time, self.check_out_time)?;

        let (derived_total, derived_overtime) =
            derive_hours(self.check_in_time, self.check_out_time);
        let total_hours = non_negative("totalHours", self.total_hours)?.unwrap_or(derived_total);
        let overtime_hours =
            non_negative("overtimeHours", self.overtime_hours)?.unwrap_or(derived_overtime);

        Ok(NewAttendanceRecord {
            user_id: self.user_id,
            date: self.date,
            check_in_time: self.check_in_time,
            check_out_time: self.check_out_time,
            status: self.status,
            method: self.method,
            location: self.location,
            total_hours,
            overtime_hours,
            is_late: self.check_in_time.map_or(false, |t| policy.is_late(t)),
        })
    }
}

fn non_negative(field: &str, value: Option<f64>) -> AppResult<Option<f64>> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(AppError::validation(format!(
            "{} must be a non-negative number",
            field
        ))),
        other => Ok(other),
    }
}

/// Ledger service trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait LedgerService: Send + Sync {
    /// Insert a record on behalf of a user
    async fn insert_manual(&self, record: ManualRecord) -> AppResult<AttendanceRecord>;

    /// Edit a record; derived hours are recomputed
    async fn update(&self, id: Uuid, patch: RecordPatch) -> AppResult<AttendanceRecord>;

    /// Remove a record permanently
    async fn delete(&self, id: Uuid) -> AppResult<()>;

    /// One user's records, filtered and sorted
    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: RecordFilter,
    ) -> AppResult<Vec<AttendanceRecord>>;
}

/// Concrete implementation of LedgerService using Unit of Work.
pub struct LedgerManager<U: UnitOfWork> {
    uow: Arc<U>,
    locks: Arc<dyn UserLocks>,
    policy: AttendancePolicy,
}

impl<U: UnitOfWork> LedgerManager<U> {
    pub fn new(uow: Arc<U>, locks: Arc<dyn UserLocks>, policy: AttendancePolicy) -> Self {
        Self { uow, locks, policy }
    }
}

#[async_trait]
impl<U: UnitOfWork> LedgerService for LedgerManager<U> {
    async fn insert_manual(&self, record: ManualRecord) -> AppResult<AttendanceRecord> {
        self.uow
            .directory()
            .find_user(record.user_id)
            .await?
            .ok_or_not_found("User")?;

        let new = record.into_new_record(&self.policy)?;
        let user_id = new.user_id;

        let guard = self.locks.lock(user_id).await?;
        let result = crate::with_transaction!(self.uow, |ctx| {
            insert_checked(&ctx.attendance(), new).await
        });
        if let Err(e) = guard.release().await {
            tracing::warn!(%user_id, error = %e, "Failed to release user lock");
        }

        let record = result?;
        tracing::info!(
            %user_id,
            record_id = %record.id,
            date = %record.date,
            "Manual record inserted"
        );
        Ok(record)
    }

    async fn update(&self, id: Uuid, patch: RecordPatch) -> AppResult<AttendanceRecord> {
        let user_id = self
            .uow
            .attendance()
            .find_by_id(id)
            .await?
            .ok_or_not_found("Attendance record")?
            .user_id;

        let policy = self.policy.clone();
        let guard = self.locks.lock(user_id).await?;
        let result = crate::with_transaction!(self.uow, |ctx| {
            update_checked(&ctx.attendance(), &policy, id, patch).await
        });
        if let Err(e) = guard.release().await {
            tracing::warn!(%user_id, error = %e, "Failed to release user lock");
        }

        let record = result?;
        tracing::info!(%user_id, record_id = %id, "Attendance record updated");
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.uow.attendance().delete(id).await? {
            return Err(AppError::NotFound("Attendance record"));
        }
        tracing::info!(record_id = %id, "Attendance record deleted");
        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: RecordFilter,
    ) -> AppResult<Vec<AttendanceRecord>> {
        if let (Some(start), Some(end)) = (filter.start, filter.end) {
            if start > end {
                return Err(AppError::validation(format!(
                    "start date {} is after end date {}",
                    start, end
                )));
            }
        }

        self.uow
            .directory()
            .find_user(user_id)
            .await?
            .ok_or_not_found("User")?;

        self.uow.attendance().list_for_user(user_id, filter).await
    }
}

async fn insert_checked(
    ledger: &TxAttendanceRepository<'_>,
    new: NewAttendanceRecord,
) -> AppResult<AttendanceRecord> {
    if ledger.find_for_user_on(new.user_id, new.date).await?.is_some() {
        return Err(AppError::Conflict(ConflictReason::DuplicateRecord));
    }
    let opens_session = new.check_in_time.is_some() && new.check_out_time.is_none();
    if opens_session && ledger.find_open_for_user(new.user_id).await?.is_some() {
        return Err(AppError::Conflict(ConflictReason::OpenSessionExists));
    }
    ledger.insert(new).await
}

async fn update_checked(
    ledger: &TxAttendanceRepository<'_>,
    policy: &AttendancePolicy,
    id: Uuid,
    patch: RecordPatch,
) -> AppResult<AttendanceRecord> {
    let mut record = ledger
        .find_by_id(id)
        .await?
        .ok_or_not_found("Attendance record")?;

    let check_in_changed = patch.check_in_time.is_some();
    patch.apply_to(&mut record);
    validate_check_times(record.check_in_time, record.check_out_time)?;
    if check_in_changed {
        record.is_late = record.check_in_time.map_or(false, |t| policy.is_late(t));
    }

    if let Some(other) = ledger.find_for_user_on(record.user_id, record.date).await? {
        if other.id != record.id {
            return Err(AppError::Conflict(ConflictReason::DuplicateRecord));
        }
    }
    if record.is_open() {
        if let Some(other) = ledger.find_open_for_user(record.user_id).await? {
            if other.id != record.id {
                return Err(AppError::Conflict(ConflictReason::OpenSessionExists));
            }
        }
    }

    ledger.save(&record).await
}
