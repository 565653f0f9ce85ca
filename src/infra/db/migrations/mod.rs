//! Ledger schema.
//!
//! The directory tables come first so attendance records can reference
//! users. Index names are exported because unique violations are mapped
//! to conflict reasons by name.

use sea_orm_migration::prelude::*;

mod m20240101_000001_create_directory_tables;
mod m20240102_000001_create_attendance_records;

pub use m20240102_000001_create_attendance_records::{OPEN_SESSION_INDEX, USER_DATE_INDEX};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_directory_tables::Migration),
            Box::new(m20240102_000001_create_attendance_records::Migration),
        ]
    }
}
