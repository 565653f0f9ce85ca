//! Domain layer - Core business entities and logic.
//!
//! Contains pure domain models with no infrastructure dependencies.

mod attendance;
mod embedding;
mod employee;
mod period;
mod session;
pub mod summary;

pub use attendance::{
    derive_hours, overtime_for, validate_check_times, worked_hours, AttendanceRecord,
    AttendanceStatus, CheckMethod, NewAttendanceRecord, RecordFilter, RecordPatch, SortBy,
    SortOrder,
};
pub use embedding::{nearest_match, Embedding, MatchOutcome};
pub use employee::{Employee, EmployeeRole, EnrolledEmbedding};
pub use period::{DateRange, Period};
pub use session::{decide, ConflictReason, EventIntent, Transition};
pub use summary::{
    LeaderboardEntry, OvertimeEntry, PayrollEntry, PeriodSummary, StatusBreakdown, TrendPoint,
};
