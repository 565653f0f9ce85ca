//! Attendance record entity and related types.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::STANDARD_WORK_HOURS;
use crate::errors::AppError;

/// Classification of a day's attendance.
///
/// `on_leave` is the canonical spelling; `on-leave`, `onleave` and `leave`
/// are accepted on input and normalised here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    #[serde(alias = "on-leave", alias = "onleave", alias = "leave")]
    OnLeave,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::OnLeave => "on_leave",
        }
    }

    /// Present and late both count as attended.
    pub fn is_attended(&self) -> bool {
        matches!(self, AttendanceStatus::Present | AttendanceStatus::Late)
    }
}

impl FromStr for AttendanceStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" => Ok(AttendanceStatus::Present),
            "late" => Ok(AttendanceStatus::Late),
            "absent" => Ok(AttendanceStatus::Absent),
            "on_leave" | "on-leave" | "onleave" | "leave" => Ok(AttendanceStatus::OnLeave),
            other => Err(AppError::validation(format!(
                "Unknown attendance status '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an attendance event was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CheckMethod {
    #[default]
    Face,
    Rfid,
    Nfc,
    Manual,
}

impl CheckMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckMethod::Face => "face",
            CheckMethod::Rfid => "rfid",
            CheckMethod::Nfc => "nfc",
            CheckMethod::Manual => "manual",
        }
    }
}

impl FromStr for CheckMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "face" => Ok(CheckMethod::Face),
            "rfid" => Ok(CheckMethod::Rfid),
            "nfc" => Ok(CheckMethod::Nfc),
            "manual" => Ok(CheckMethod::Manual),
            other => Err(AppError::validation(format!("Unknown check method '{}'", other))),
        }
    }
}

/// One check-in/check-out cycle for a user on a calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(value_type = String, format = Date, example = "2024-01-10")]
    pub date: NaiveDate,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    pub method: CheckMethod,
    pub location: Option<String>,
    pub total_hours: f64,
    pub overtime_hours: f64,
    pub is_late: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AttendanceRecord {
    /// A record is open while it has a check-in and no check-out.
    pub fn is_open(&self) -> bool {
        self.check_in_time.is_some() && self.check_out_time.is_none()
    }

    /// Recompute `total_hours` and `overtime_hours` from the check times.
    pub fn recompute_hours(&mut self) {
        let (total, overtime) = derive_hours(self.check_in_time, self.check_out_time);
        self.total_hours = total;
        self.overtime_hours = overtime;
    }
}

/// Hours worked between two instants, zero unless both are present.
pub fn worked_hours(check_in: Option<DateTime<Utc>>, check_out: Option<DateTime<Utc>>) -> f64 {
    match (check_in, check_out) {
        (Some(start), Some(end)) => {
            let seconds = (end - start).num_milliseconds() as f64 / 1000.0;
            (seconds / 3600.0).max(0.0)
        }
        _ => 0.0,
    }
}

pub fn overtime_for(total_hours: f64) -> f64 {
    (total_hours - STANDARD_WORK_HOURS).max(0.0)
}

/// `(total_hours, overtime_hours)` for a pair of check times.
pub fn derive_hours(
    check_in: Option<DateTime<Utc>>,
    check_out: Option<DateTime<Utc>>,
) -> (f64, f64) {
    let total = worked_hours(check_in, check_out);
    (total, overtime_for(total))
}

/// Ensure a check-out never precedes its check-in and never stands alone.
pub fn validate_check_times(
    check_in: Option<DateTime<Utc>>,
    check_out: Option<DateTime<Utc>>,
) -> Result<(), AppError> {
    match (check_in, check_out) {
        (None, Some(_)) => Err(AppError::validation(
            "checkOutTime requires a checkInTime",
        )),
        (Some(start), Some(end)) if end < start => Err(AppError::validation(
            "checkOutTime must not be earlier than checkInTime",
        )),
        _ => Ok(()),
    }
}

/// Fields for a record about to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttendanceRecord {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    pub method: CheckMethod,
    pub location: Option<String>,
    pub total_hours: f64,
    pub overtime_hours: f64,
    pub is_late: bool,
}

/// Sparse admin edit. Absent fields stay untouched; `Some(None)` clears.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub date: Option<NaiveDate>,
    pub check_in_time: Option<Option<DateTime<Utc>>>,
    pub check_out_time: Option<Option<DateTime<Utc>>>,
    pub status: Option<AttendanceStatus>,
    pub method: Option<CheckMethod>,
    pub location: Option<Option<String>>,
}

impl RecordPatch {
    /// Apply the patch and recompute the derived hours.
    pub fn apply_to(self, record: &mut AttendanceRecord) {
        if let Some(date) = self.date {
            record.date = date;
        }
        if let Some(check_in) = self.check_in_time {
            record.check_in_time = check_in;
        }
        if let Some(check_out) = self.check_out_time {
            record.check_out_time = check_out;
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(method) = self.method {
            record.method = method;
        }
        if let Some(location) = self.location {
            record.location = location;
        }
        record.recompute_hours();
    }
}

/// Column a record listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    Date,
    CheckInTime,
    TotalHours,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Filter for per-user record listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub status: Option<AttendanceStatus>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}
