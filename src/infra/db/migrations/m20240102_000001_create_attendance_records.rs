//! Migration: Create the attendance ledger.

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_directory_tables::Users;

/// At most one record per user and calendar day.
pub const USER_DATE_INDEX: &str = "idx_attendance_user_date";

/// At most one open session per user. SeaQuery cannot express partial
/// indexes, so this one is raw SQL understood by PostgreSQL and SQLite.
pub const OPEN_SESSION_INDEX: &str = "idx_attendance_open_session";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AttendanceRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AttendanceRecords::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AttendanceRecords::UserId).uuid().not_null())
                    .col(ColumnDef::new(AttendanceRecords::Date).date().not_null())
                    .col(
                        ColumnDef::new(AttendanceRecords::CheckInTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::CheckOutTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(AttendanceRecords::Status).string().not_null())
                    .col(ColumnDef::new(AttendanceRecords::Method).string().not_null())
                    .col(ColumnDef::new(AttendanceRecords::Location).string().null())
                    .col(
                        ColumnDef::new(AttendanceRecords::TotalHours)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::OvertimeHours)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::IsLate)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attendance_records_user")
                            .from(AttendanceRecords::Table, AttendanceRecords::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(USER_DATE_INDEX)
                    .table(AttendanceRecords::Table)
                    .col(AttendanceRecords::UserId)
                    .col(AttendanceRecords::Date)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Range scans for reports
        manager
            .create_index(
                Index::create()
                    .name("idx_attendance_date")
                    .table(AttendanceRecords::Table)
                    .col(AttendanceRecords::Date)
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(&format!(
                "CREATE UNIQUE INDEX {} ON attendance_records (user_id) \
                 WHERE check_in_time IS NOT NULL AND check_out_time IS NULL",
                OPEN_SESSION_INDEX
            ))
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AttendanceRecords::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AttendanceRecords {
    Table,
    Id,
    UserId,
    Date,
    CheckInTime,
    CheckOutTime,
    Status,
    Method,
    Location,
    TotalHours,
    OvertimeHours,
    IsLate,
    CreatedAt,
    UpdatedAt,
}
