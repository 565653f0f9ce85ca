//! Attendance record entity for SeaORM.

use sea_orm::entity::prelude::*;
use sea_orm::Set;

use crate::domain::{AttendanceRecord, AttendanceStatus, CheckMethod, NewAttendanceRecord};
use crate::errors::{AppError, AppResult};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: Date,
    pub check_in_time: Option<DateTimeUtc>,
    pub check_out_time: Option<DateTimeUtc>,
    pub status: String,
    pub method: String,
    pub location: Option<String>,
    #[sea_orm(column_type = "Double")]
    pub total_hours: f64,
    #[sea_orm(column_type = "Double")]
    pub overtime_hours: f64,
    pub is_late: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Convert database model to domain entity.
///
/// Stored enum text is parsed through the same normalisation as API input,
/// so legacy `on-leave` rows read back as `OnLeave`.
impl TryFrom<Model> for AttendanceRecord {
    type Error = AppError;

    fn try_from(model: Model) -> AppResult<Self> {
        Ok(AttendanceRecord {
            id: model.id,
            user_id: model.user_id,
            date: model.date,
            check_in_time: model.check_in_time,
            check_out_time: model.check_out_time,
            status: model.status.parse::<AttendanceStatus>()?,
            method: model.method.parse::<CheckMethod>()?,
            location: model.location,
            total_hours: model.total_hours,
            overtime_hours: model.overtime_hours,
            is_late: model.is_late,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl ActiveModel {
    pub fn from_new(new: NewAttendanceRecord, now: DateTimeUtc) -> Self {
        ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(new.user_id),
            date: Set(new.date),
            check_in_time: Set(new.check_in_time),
            check_out_time: Set(new.check_out_time),
            status: Set(new.status.as_str().to_string()),
            method: Set(new.method.as_str().to_string()),
            location: Set(new.location),
            total_hours: Set(new.total_hours),
            overtime_hours: Set(new.overtime_hours),
            is_late: Set(new.is_late),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }

    /// Overwrite every mutable column from a domain record.
    pub fn assign(&mut self, record: &AttendanceRecord, now: DateTimeUtc) {
        self.date = Set(record.date);
        self.check_in_time = Set(record.check_in_time);
        self.check_out_time = Set(record.check_out_time);
        self.status = Set(record.status.as_str().to_string());
        self.method = Set(record.method.as_str().to_string());
        self.location = Set(record.location.clone());
        self.total_hours = Set(record.total_hours);
        self.overtime_hours = Set(record.overtime_hours);
        self.is_late = Set(record.is_late);
        self.updated_at = Set(now);
    }
}
