//! Attendance ledger repository.
//!
//! Queries are written once against `ConnectionTrait` and shared by the
//! pooled store and the transaction-scoped repository.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, Order, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use super::conflict_or_db;
use super::entities::attendance_record::{self, ActiveModel, Entity as AttendanceEntity};
use crate::domain::{
    AttendanceRecord, ConflictReason, DateRange, NewAttendanceRecord, RecordFilter, SortBy,
    SortOrder,
};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Read and delete access to the ledger outside a transaction.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    /// Find a record by ID
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<AttendanceRecord>>;

    /// List one user's records, filtered and sorted
    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: RecordFilter,
    ) -> AppResult<Vec<AttendanceRecord>>;

    /// All records dated inside `range`, optionally for one user
    async fn list_in_range(
        &self,
        user_id: Option<Uuid>,
        range: DateRange,
    ) -> AppResult<Vec<AttendanceRecord>>;

    /// Delete by ID; false when nothing was deleted
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

/// Concrete implementation of AttendanceRepository
pub struct AttendanceStore {
    db: DatabaseConnection,
}

impl AttendanceStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AttendanceRepository for AttendanceStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<AttendanceRecord>> {
        find_by_id(&self.db, id).await
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: RecordFilter,
    ) -> AppResult<Vec<AttendanceRecord>> {
        list_for_user(&self.db, user_id, &filter).await
    }

    async fn list_in_range(
        &self,
        user_id: Option<Uuid>,
        range: DateRange,
    ) -> AppResult<Vec<AttendanceRecord>> {
        list_in_range(&self.db, user_id, range).await
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        delete(&self.db, id).await
    }
}

fn to_domain(models: Vec<attendance_record::Model>) -> AppResult<Vec<AttendanceRecord>> {
    models.into_iter().map(AttendanceRecord::try_from).collect()
}

pub(crate) async fn find_by_id<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> AppResult<Option<AttendanceRecord>> {
    AttendanceEntity::find_by_id(id)
        .one(db)
        .await?
        .map(AttendanceRecord::try_from)
        .transpose()
}

/// Most recent unclosed record for a user, whatever its date.
pub(crate) async fn find_open_for_user<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
) -> AppResult<Option<AttendanceRecord>> {
    AttendanceEntity::find()
        .filter(attendance_record::Column::UserId.eq(user_id))
        .filter(attendance_record::Column::CheckInTime.is_not_null())
        .filter(attendance_record::Column::CheckOutTime.is_null())
        .order_by_desc(attendance_record::Column::CheckInTime)
        .one(db)
        .await?
        .map(AttendanceRecord::try_from)
        .transpose()
}

pub(crate) async fn find_for_user_on<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    date: NaiveDate,
) -> AppResult<Option<AttendanceRecord>> {
    AttendanceEntity::find()
        .filter(attendance_record::Column::UserId.eq(user_id))
        .filter(attendance_record::Column::Date.eq(date))
        .one(db)
        .await?
        .map(AttendanceRecord::try_from)
        .transpose()
}

pub(crate) async fn insert<C: ConnectionTrait>(
    db: &C,
    new: NewAttendanceRecord,
) -> AppResult<AttendanceRecord> {
    let model = ActiveModel::from_new(new, Utc::now())
        .insert(db)
        .await
        .map_err(conflict_or_db)?;
    AttendanceRecord::try_from(model)
}

/// Persist every mutable field of an existing record.
pub(crate) async fn save<C: ConnectionTrait>(
    db: &C,
    record: &AttendanceRecord,
) -> AppResult<AttendanceRecord> {
    let existing = AttendanceEntity::find_by_id(record.id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("Attendance record"))?;

    let mut active: ActiveModel = existing.into();
    active.assign(record, Utc::now());

    let model = active.update(db).await.map_err(conflict_or_db)?;
    AttendanceRecord::try_from(model)
}

/// Close an open record. The update only matches while `check_out_time`
/// is still null, so a stale copy cannot overwrite a finished session.
pub(crate) async fn close<C: ConnectionTrait>(
    db: &C,
    record: &AttendanceRecord,
) -> AppResult<AttendanceRecord> {
    let result = AttendanceEntity::update_many()
        .col_expr(
            attendance_record::Column::CheckOutTime,
            Expr::value(record.check_out_time),
        )
        .col_expr(
            attendance_record::Column::Method,
            Expr::value(record.method.as_str()),
        )
        .col_expr(
            attendance_record::Column::Location,
            Expr::value(record.location.clone()),
        )
        .col_expr(
            attendance_record::Column::TotalHours,
            Expr::value(record.total_hours),
        )
        .col_expr(
            attendance_record::Column::OvertimeHours,
            Expr::value(record.overtime_hours),
        )
        .col_expr(attendance_record::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(attendance_record::Column::Id.eq(record.id))
        .filter(attendance_record::Column::CheckOutTime.is_null())
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::Conflict(ConflictReason::AlreadyCheckedOut));
    }

    find_by_id(db, record.id)
        .await?
        .ok_or(AppError::NotFound("Attendance record"))
}

pub(crate) async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<bool> {
    let result = AttendanceEntity::delete_by_id(id).exec(db).await?;
    Ok(result.rows_affected > 0)
}

pub(crate) async fn list_for_user<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    filter: &RecordFilter,
) -> AppResult<Vec<AttendanceRecord>> {
    let mut query =
        AttendanceEntity::find().filter(attendance_record::Column::UserId.eq(user_id));

    if let Some(start) = filter.start {
        query = query.filter(attendance_record::Column::Date.gte(start));
    }
    if let Some(end) = filter.end {
        query = query.filter(attendance_record::Column::Date.lte(end));
    }
    if let Some(status) = filter.status {
        query = query.filter(attendance_record::Column::Status.eq(status.as_str()));
    }

    let column = match filter.sort_by {
        SortBy::Date => attendance_record::Column::Date,
        SortBy::CheckInTime => attendance_record::Column::CheckInTime,
        SortBy::TotalHours => attendance_record::Column::TotalHours,
    };
    let order = match filter.sort_order {
        SortOrder::Asc => Order::Asc,
        SortOrder::Desc => Order::Desc,
    };

    let models = query
        .order_by(column, order.clone())
        .order_by(attendance_record::Column::Id, order)
        .all(db)
        .await?;
    to_domain(models)
}

pub(crate) async fn list_in_range<C: ConnectionTrait>(
    db: &C,
    user_id: Option<Uuid>,
    range: DateRange,
) -> AppResult<Vec<AttendanceRecord>> {
    let mut query = AttendanceEntity::find()
        .filter(attendance_record::Column::Date.gte(range.start))
        .filter(attendance_record::Column::Date.lte(range.end));

    if let Some(user_id) = user_id {
        query = query.filter(attendance_record::Column::UserId.eq(user_id));
    }

    let models = query
        .order_by_asc(attendance_record::Column::Date)
        .order_by_asc(attendance_record::Column::UserId)
        .all(db)
        .await?;
    to_domain(models)
}
