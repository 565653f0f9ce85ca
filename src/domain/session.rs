//! Check-in/check-out state machine.
//!
//! A user is either without an open session or has exactly one open
//! record. `decide` maps an event onto that state without touching storage.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::attendance::AttendanceRecord;
use crate::errors::AppError;

/// Direction requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventIntent {
    /// Infer the direction from the current state (kiosk default).
    #[default]
    Auto,
    CheckIn,
    CheckOut,
}

impl FromStr for EventIntent {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "auto" => Ok(EventIntent::Auto),
            "check_in" | "checkin" | "in" => Ok(EventIntent::CheckIn),
            "check_out" | "checkout" | "out" => Ok(EventIntent::CheckOut),
            other => Err(AppError::validation(format!(
                "Unknown intent '{}', expected auto, check_in or check_out",
                other
            ))),
        }
    }
}

/// Why an event or admin write conflicts with the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictReason {
    AlreadyCheckedIn,
    AlreadyCheckedOut,
    DayAlreadyRecorded,
    DuplicateRecord,
    OpenSessionExists,
}

impl ConflictReason {
    pub fn code(&self) -> &'static str {
        match self {
            ConflictReason::AlreadyCheckedIn => "ALREADY_CHECKED_IN",
            ConflictReason::AlreadyCheckedOut => "ALREADY_CHECKED_OUT",
            ConflictReason::DayAlreadyRecorded => "DAY_ALREADY_RECORDED",
            ConflictReason::DuplicateRecord => "DUPLICATE_RECORD",
            ConflictReason::OpenSessionExists => "OPEN_SESSION_EXISTS",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ConflictReason::AlreadyCheckedIn => "Already checked in",
            ConflictReason::AlreadyCheckedOut => "Already checked out today",
            ConflictReason::DayAlreadyRecorded => "Attendance for today is already recorded",
            ConflictReason::DuplicateRecord => "A record for this user and date already exists",
            ConflictReason::OpenSessionExists => "User already has an open session",
        }
    }
}

/// What the ledger should do with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    CheckIn,
    CheckOut,
}

/// Decide the transition for an event.
///
/// `open` is the user's most recent unclosed record regardless of date.
/// `today` is the record already stored for the event's calendar day, if any.
pub fn decide(
    intent: EventIntent,
    open: Option<&AttendanceRecord>,
    today: Option<&AttendanceRecord>,
) -> Result<Transition, ConflictReason> {
    match (intent, open) {
        (EventIntent::CheckIn, Some(_)) => Err(ConflictReason::AlreadyCheckedIn),
        (EventIntent::Auto | EventIntent::CheckOut, Some(_)) => Ok(Transition::CheckOut),
        (EventIntent::CheckOut, None) => Err(ConflictReason::AlreadyCheckedOut),
        (EventIntent::Auto | EventIntent::CheckIn, None) => match today {
            None => Ok(Transition::CheckIn),
            Some(record) if record.check_in_time.is_some() => {
                Err(ConflictReason::AlreadyCheckedOut)
            }
            Some(_) => Err(ConflictReason::DayAlreadyRecorded),
        },
    }
}
